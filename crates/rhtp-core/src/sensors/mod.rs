//! Sensor capabilities consumed by the command handlers
//!
//! The handlers only see these traits; the concrete HDC1080 and MS5637
//! drivers implement them over an `embedded-hal-async` I2C bus, the simulator
//! implements them with synthetic data.

pub mod hdc1080;
pub mod ms5637;

use thiserror_no_std::Error;

use crate::config::Hdc1080Settings;

pub use hdc1080::{Hdc1080, Hdc1080Reading};
pub use ms5637::{Calibration, Compensated, Conversion, Ms5637, Oversampling, compensate};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: unexpected identity {found:#06x}, expected {expected:#06x}")]
    WrongDevice {
        sensor: &'static str,
        expected: u16,
        found: u16,
    },
    #[error("{sensor}: invalid argument ({details})")]
    InvalidArgument {
        sensor: &'static str,
        details: &'static str,
    },
}

/// Temperature / humidity sensor (HDC1080).
pub trait HumidityTemperatureSensor {
    /// Take one fresh temperature + humidity measurement.
    fn measure(
        &mut self,
        settings: &Hdc1080Settings,
    ) -> impl Future<Output = Result<Hdc1080Reading, SensorError>>;
}

/// Pressure / temperature sensor (MS5637).
pub trait PressureSensor {
    /// Read one 16-bit PROM calibration word, `index` in `0..8`.
    fn read_calibration(&mut self, index: u8) -> impl Future<Output = Result<u16, SensorError>>;

    /// Run one conversion and return the 24-bit raw ADC value.
    fn read_raw(
        &mut self,
        conversion: Conversion,
        oversampling: Oversampling,
    ) -> impl Future<Output = Result<u32, SensorError>>;
}
