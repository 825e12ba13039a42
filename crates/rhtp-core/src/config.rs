use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;
use crate::sensors::hdc1080::{HumidityResolution, TemperatureResolution};
use crate::sensors::ms5637::Oversampling;

/// Runtime configuration of the node.
///
/// The firmware fills this from compile-time environment variables, the
/// simulator from its process environment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceConfig {
    /// Address used when no address switches are fitted, or they read invalid.
    pub address: DeviceAddress,
    /// Echo received bytes back to the host while a line is being typed.
    pub local_echo: bool,
    pub hdc1080: Hdc1080Settings,
    pub ms5637: Ms5637Settings,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hdc1080Settings {
    pub temperature_resolution: TemperatureResolution,
    pub humidity_resolution: HumidityResolution,
    pub heater: bool,
}

impl Default for Hdc1080Settings {
    fn default() -> Self {
        Self {
            temperature_resolution: TemperatureResolution::Bits14,
            humidity_resolution: HumidityResolution::Bits14,
            heater: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ms5637Settings {
    pub oversampling: Oversampling,
}

impl Default for Ms5637Settings {
    fn default() -> Self {
        Self {
            oversampling: Oversampling::Osr8192,
        }
    }
}

impl DeviceConfig {
    /// Build a configuration from the `RHTP_DEVICE_ADDRESS` / `RHTP_LOCAL_ECHO`
    /// string values, keeping defaults for anything missing or malformed.
    pub fn from_env_values(address: Option<&str>, local_echo: Option<&str>) -> Self {
        let mut config = Self::default();

        if let Some(value) = address {
            match value.trim().parse::<u8>().ok().and_then(DeviceAddress::new) {
                Some(address) => config.address = address,
                None => log::warn!("Ignoring invalid device address {:?}", value),
            }
        }

        if let Some(value) = local_echo {
            config.local_echo = matches!(value.trim(), "1" | "true" | "on" | "yes");
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.address.get(), 0);
        assert!(!config.local_echo);
        assert_eq!(config.ms5637.oversampling, Oversampling::Osr8192);
        assert_eq!(
            config.hdc1080.temperature_resolution,
            TemperatureResolution::Bits14
        );
    }

    #[test]
    fn test_from_env_values() {
        let config = DeviceConfig::from_env_values(Some("7"), Some("true"));
        assert_eq!(config.address.get(), 7);
        assert!(config.local_echo);
    }

    #[test]
    fn test_from_env_values_rejects_out_of_range_address() {
        let config = DeviceConfig::from_env_values(Some("12"), None);
        assert_eq!(config.address.get(), 0);

        let config = DeviceConfig::from_env_values(Some("x"), Some("0"));
        assert_eq!(config.address.get(), 0);
        assert!(!config.local_echo);
    }
}
