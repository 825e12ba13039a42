//! The node's sensor I2C bus
//!
//! The HDC1080 and the MS5637 hang off one I2C bus. [`SharedSensorBus`] owns
//! it behind an embassy mutex and hands out one [`SensorDevice`] per sensor.
//! Each handle is bound to its sensor's 7-bit address and name: a
//! transaction aimed at any other address is refused before the bus is
//! locked, and bus failures are logged under the sensor they belong to.

use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{
    Error as I2cError, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation,
};
use log::warn;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorBusError<E: Debug> {
    #[error("I2C bus error: {0:?}")]
    Bus(E),
    #[error("transaction for {found:#04x} on the handle bound to {bound:#04x}")]
    ForeignAddress { bound: u8, found: u8 },
}

impl<E: I2cError> I2cError for SensorBusError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Bus(e) => e.kind(),
            Self::ForeignAddress { .. } => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
        }
    }
}

pub struct SharedSensorBus<T> {
    bus: Mutex<CriticalSectionRawMutex, T>,
}

impl<T: I2c> SharedSensorBus<T> {
    pub const fn new(bus: T) -> Self {
        Self {
            bus: Mutex::new(bus),
        }
    }

    /// Handle for the sensor `name` answering at `address`.
    pub fn device(&self, name: &'static str, address: u8) -> SensorDevice<'_, T> {
        SensorDevice {
            bus: &self.bus,
            name,
            address,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> T {
        self.bus.into_inner()
    }
}

/// One sensor's view of the shared bus. The lock is held for a single
/// transaction, so the bus stays free while a driver waits for a conversion.
pub struct SensorDevice<'a, T> {
    bus: &'a Mutex<CriticalSectionRawMutex, T>,
    name: &'static str,
    address: u8,
}

impl<T: ErrorType> ErrorType for SensorDevice<'_, T> {
    type Error = SensorBusError<T::Error>;
}

// read, write and write_read use the trait's defaults, which all route
// through `transaction`.
impl<T: I2c> I2c for SensorDevice<'_, T> {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            warn!(
                "{}: refused transaction for {:#04x}, bound to {:#04x}",
                self.name, address, self.address
            );
            return Err(SensorBusError::ForeignAddress {
                bound: self.address,
                found: address,
            });
        }

        let result = self.bus.lock().await.transaction(address, operations).await;
        result.map_err(|e| {
            warn!("{}: I2C transaction failed: {:?}", self.name, e.kind());
            SensorBusError::Bus(e)
        })
    }
}
