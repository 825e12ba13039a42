//! Device addressing on the shared serial bus
//!
//! Several nodes share one UART line; each answers only requests carrying its
//! own single-digit address.

use core::fmt;

use embedded_hal::digital::InputPin;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Highest address a node can use (addresses are one ASCII digit).
pub const MAX_ADDRESS: u8 = 9;

/// Bus address of this node, always in `0..=9`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "u8", into = "u8")]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    pub const fn new(value: u8) -> Option<Self> {
        if value <= MAX_ADDRESS {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The address as it appears on the wire (`b'0'..=b'9'`).
    pub const fn ascii_digit(self) -> u8 {
        b'0' + self.0
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = InvalidAddress;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidAddress(value))
    }
}

impl From<DeviceAddress> for u8 {
    fn from(address: DeviceAddress) -> Self {
        address.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("device address {0} is above {}", MAX_ADDRESS)]
pub struct InvalidAddress(pub u8);

/// Source of the node's current bus address.
///
/// Queried on every dispatched line, so a changed switch setting takes effect
/// without a restart.
pub trait AddressProvider {
    fn current_address(&mut self) -> DeviceAddress;
}

impl AddressProvider for DeviceAddress {
    fn current_address(&mut self) -> DeviceAddress {
        *self
    }
}

/// Address read from four switch inputs encoding one BCD digit.
///
/// `pins[0]` is the least significant bit. Switches are wired to ground with
/// pull-ups when `active_low` is set, so a closed switch reads low.
pub struct BcdSwitchAddress<P> {
    pins: [P; 4],
    active_low: bool,
    fallback: DeviceAddress,
}

impl<P: InputPin> BcdSwitchAddress<P> {
    pub fn new(pins: [P; 4], active_low: bool, fallback: DeviceAddress) -> Self {
        Self {
            pins,
            active_low,
            fallback,
        }
    }

    fn read_digit(&mut self) -> Option<u8> {
        let mut value = 0u8;
        for (bit, pin) in self.pins.iter_mut().enumerate() {
            let high = match pin.is_high() {
                Ok(high) => high,
                Err(e) => {
                    warn!("Address switch {} read failed: {:?}", bit, e);
                    return None;
                }
            };
            if high != self.active_low {
                value |= 1 << bit;
            }
        }
        Some(value)
    }
}

impl<P: InputPin> AddressProvider for BcdSwitchAddress<P> {
    fn current_address(&mut self) -> DeviceAddress {
        match self.read_digit() {
            Some(value) => DeviceAddress::new(value).unwrap_or_else(|| {
                warn!(
                    "Address switches encode {}, using fallback {}",
                    value, self.fallback
                );
                self.fallback
            }),
            None => self.fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    struct FakePin(Result<bool, ErrorKind>);

    impl ErrorType for FakePin {
        type Error = ErrorKind;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.0
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.0.map(|high| !high)
        }
    }

    fn pins(bits: [bool; 4]) -> [FakePin; 4] {
        bits.map(|b| FakePin(Ok(b)))
    }

    #[test]
    fn test_address_range() {
        assert!(DeviceAddress::new(9).is_some());
        assert!(DeviceAddress::new(10).is_none());
        assert_eq!(DeviceAddress::try_from(12), Err(InvalidAddress(12)));
        assert_eq!(InvalidAddress(12).to_string(), "device address 12 is above 9");
        assert_eq!(DeviceAddress::new(5).unwrap().ascii_digit(), b'5');
    }

    #[test]
    fn test_bcd_switches_active_high() {
        let fallback = DeviceAddress::new(0).unwrap();
        // 0b0101 = 5
        let mut provider = BcdSwitchAddress::new(pins([true, false, true, false]), false, fallback);
        assert_eq!(provider.current_address().get(), 5);
    }

    #[test]
    fn test_bcd_switches_active_low() {
        let fallback = DeviceAddress::new(0).unwrap();
        // Closed switches read low: bits 0 and 1 closed = 3
        let mut provider = BcdSwitchAddress::new(pins([false, false, true, true]), true, fallback);
        assert_eq!(provider.current_address().get(), 3);
    }

    #[test]
    fn test_bcd_switches_out_of_range_uses_fallback() {
        let fallback = DeviceAddress::new(4).unwrap();
        // 0b1111 = 15
        let mut provider = BcdSwitchAddress::new(pins([true; 4]), false, fallback);
        assert_eq!(provider.current_address(), fallback);
    }

    #[test]
    fn test_bcd_switch_read_error_uses_fallback() {
        let fallback = DeviceAddress::new(2).unwrap();
        let pins = [
            FakePin(Ok(true)),
            FakePin(Err(ErrorKind::Other)),
            FakePin(Ok(false)),
            FakePin(Ok(false)),
        ];
        let mut provider = BcdSwitchAddress::new(pins, false, fallback);
        assert_eq!(provider.current_address(), fallback);
    }
}
