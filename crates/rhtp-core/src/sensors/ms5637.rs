use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::{PressureSensor, SensorError};

/// Fixed 7-bit I2C address of the MS5637.
pub const ADDRESS: u8 = 0x76;

const CMD_RESET: u8 = 0x1E;
const CMD_ADC_READ: u8 = 0x00;
const CMD_PROM_READ: u8 = 0xA0;

const RESET_TIME_US: u32 = 3_000;

/// Number of 16-bit PROM words.
pub const CALIBRATION_WORDS: usize = 8;

/// PROM contents. Word 0 holds the CRC and factory data, words 1..=6 are the
/// coefficients C1..C6 used by [`compensate`].
pub type Calibration = [u16; CALIBRATION_WORDS];

/// Which quantity an ADC conversion samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// D1, raw pressure
    Pressure,
    /// D2, raw temperature
    Temperature,
}

impl Conversion {
    const fn command_base(self) -> u8 {
        match self {
            Self::Pressure => 0x40,
            Self::Temperature => 0x50,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    Osr256,
    Osr512,
    Osr1024,
    Osr2048,
    Osr4096,
    Osr8192,
}

impl Oversampling {
    const fn command_offset(self) -> u8 {
        match self {
            Self::Osr256 => 0x00,
            Self::Osr512 => 0x02,
            Self::Osr1024 => 0x04,
            Self::Osr2048 => 0x06,
            Self::Osr4096 => 0x08,
            Self::Osr8192 => 0x0A,
        }
    }

    /// Maximum conversion time from the datasheet, rounded up.
    const fn conversion_time_us(self) -> u32 {
        match self {
            Self::Osr256 => 560,
            Self::Osr512 => 1_100,
            Self::Osr1024 => 2_170,
            Self::Osr2048 => 4_320,
            Self::Osr4096 => 8_610,
            Self::Osr8192 => 17_200,
        }
    }
}

/// Compensated MS5637 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compensated {
    pub temperature_centi_celsius: i32,
    pub pressure_centi_mbar: i32,
}

/// First and second order temperature compensation from the MS5637
/// datasheet, in 64-bit integer arithmetic.
pub fn compensate(calibration: &Calibration, d1: u32, d2: u32) -> Compensated {
    let c = |i: usize| i64::from(calibration[i]);
    let d1 = i64::from(d1);
    let d2 = i64::from(d2);

    let dt = d2 - c(5) * (1 << 8);
    let mut temp = 2000 + dt * c(6) / (1 << 23);
    let mut off = c(2) * (1 << 17) + c(4) * dt / (1 << 6);
    let mut sens = c(1) * (1 << 16) + c(3) * dt / (1 << 7);

    let (t2, off2, sens2) = if temp < 2000 {
        let low = (temp - 2000) * (temp - 2000);
        let mut off2 = 61 * low / (1 << 4);
        let mut sens2 = 29 * low / (1 << 4);
        if temp < -1500 {
            let very_low = (temp + 1500) * (temp + 1500);
            off2 += 17 * very_low;
            sens2 += 9 * very_low;
        }
        (3 * dt * dt / (1 << 33), off2, sens2)
    } else {
        (5 * dt * dt / (1 << 38), 0, 0)
    };

    temp -= t2;
    off -= off2;
    sens -= sens2;

    let pressure = (d1 * sens / (1 << 21) - off) / (1 << 15);

    Compensated {
        temperature_centi_celsius: temp as i32,
        pressure_centi_mbar: pressure as i32,
    }
}

pub struct Ms5637<I, D> {
    i2c: I,
    delay: D,
}

impl<I: I2c, D: DelayNs> Ms5637<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self { i2c, delay }
    }

    /// Reset the sensor so the PROM is reloaded.
    pub async fn reset(&mut self) -> Result<(), SensorError> {
        self.i2c.write(ADDRESS, &[CMD_RESET]).await.map_err(|e| {
            error!("MS5637 reset failed: {:?}", e);
            SensorError::ReadFailed {
                sensor: "MS5637",
                operation: "reset",
                details: "I2C communication error or sensor not responding",
            }
        })?;
        self.delay.delay_us(RESET_TIME_US).await;
        info!("MS5637: reset complete");
        Ok(())
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> PressureSensor for Ms5637<I, D> {
    async fn read_calibration(&mut self, index: u8) -> Result<u16, SensorError> {
        if usize::from(index) >= CALIBRATION_WORDS {
            return Err(SensorError::InvalidArgument {
                sensor: "MS5637",
                details: "PROM index out of range",
            });
        }

        let mut buf = [0u8; 2];
        self.i2c
            .write_read(ADDRESS, &[CMD_PROM_READ + index * 2], &mut buf)
            .await
            .map_err(|e| {
                error!("MS5637 PROM word {} read failed: {:?}", index, e);
                SensorError::ReadFailed {
                    sensor: "MS5637",
                    operation: "read PROM",
                    details: "I2C communication error or sensor not responding",
                }
            })?;
        Ok(u16::from_be_bytes(buf))
    }

    async fn read_raw(
        &mut self,
        conversion: Conversion,
        oversampling: Oversampling,
    ) -> Result<u32, SensorError> {
        let command = conversion.command_base() + oversampling.command_offset();
        self.i2c.write(ADDRESS, &[command]).await.map_err(|e| {
            error!("MS5637 conversion {:#04x} start failed: {:?}", command, e);
            SensorError::ReadFailed {
                sensor: "MS5637",
                operation: "start conversion",
                details: "I2C communication error",
            }
        })?;

        self.delay.delay_us(oversampling.conversion_time_us()).await;

        let mut buf = [0u8; 3];
        self.i2c
            .write_read(ADDRESS, &[CMD_ADC_READ], &mut buf)
            .await
            .map_err(|e| {
                error!("MS5637 ADC read failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "MS5637",
                    operation: "read ADC",
                    details: "I2C communication error or conversion not finished",
                }
            })?;

        Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NoDelay, ScriptedI2c};
    use embassy_futures::block_on;

    const DATASHEET_CALIBRATION: Calibration = [0, 46372, 43981, 29059, 27842, 31553, 28165, 0];

    #[test]
    fn test_compensate_room_temperature() {
        let result = compensate(&DATASHEET_CALIBRATION, 6_465_444, 8_077_636);
        assert_eq!(result.temperature_centi_celsius, 2000);
        assert_eq!(result.pressure_centi_mbar, 110_002);
    }

    #[test]
    fn test_compensate_second_order_cold() {
        let result = compensate(&DATASHEET_CALIBRATION, 6_465_444, 7_000_000);
        assert_eq!(result.temperature_centi_celsius, -2022);
        assert_eq!(result.pressure_centi_mbar, 100_578);
    }

    #[test]
    fn test_read_calibration() {
        let mut i2c = ScriptedI2c::new();
        i2c.queue_read(&[0xB5, 0x24]);
        let mut sensor = Ms5637::new(i2c, NoDelay::default());

        assert_eq!(block_on(sensor.read_calibration(3)), Ok(0xB524));

        let (i2c, _) = sensor.release();
        assert_eq!(i2c.writes(), vec![(ADDRESS, vec![0xA6])]);
    }

    #[test]
    fn test_read_calibration_rejects_bad_index() {
        let mut sensor = Ms5637::new(ScriptedI2c::new(), NoDelay::default());
        assert!(matches!(
            block_on(sensor.read_calibration(8)),
            Err(SensorError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_read_raw() {
        let mut i2c = ScriptedI2c::new();
        i2c.queue_read(&[0x62, 0xA8, 0xA4]);
        let mut sensor = Ms5637::new(i2c, NoDelay::default());

        let raw = block_on(sensor.read_raw(Conversion::Pressure, Oversampling::Osr8192)).unwrap();
        assert_eq!(raw, 0x62A8A4);

        let (i2c, delay) = sensor.release();
        assert_eq!(
            i2c.writes(),
            vec![(ADDRESS, vec![0x4A]), (ADDRESS, vec![CMD_ADC_READ])]
        );
        assert_eq!(delay.total_us, 17_200);
    }

    #[test]
    fn test_read_raw_temperature_command() {
        let mut i2c = ScriptedI2c::new();
        i2c.queue_read(&[0, 0, 1]);
        let mut sensor = Ms5637::new(i2c, NoDelay::default());

        block_on(sensor.read_raw(Conversion::Temperature, Oversampling::Osr256)).unwrap();

        let (i2c, _) = sensor.release();
        assert_eq!(i2c.writes()[0], (ADDRESS, vec![0x50]));
    }

    #[test]
    fn test_reset() {
        let mut sensor = Ms5637::new(ScriptedI2c::new(), NoDelay::default());
        assert_eq!(block_on(sensor.reset()), Ok(()));
        let (i2c, delay) = sensor.release();
        assert_eq!(i2c.writes(), vec![(ADDRESS, vec![CMD_RESET])]);
        assert_eq!(delay.total_us, RESET_TIME_US);
    }

    #[test]
    fn test_bus_error() {
        let mut sensor = Ms5637::new(ScriptedI2c::failing(), NoDelay::default());
        assert!(matches!(
            block_on(sensor.read_raw(Conversion::Pressure, Oversampling::Osr256)),
            Err(SensorError::ReadFailed {
                sensor: "MS5637",
                operation: "start conversion",
                ..
            })
        ));
    }
}
