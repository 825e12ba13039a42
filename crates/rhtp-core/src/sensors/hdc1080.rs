use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::{HumidityTemperatureSensor, SensorError};
use crate::config::Hdc1080Settings;

/// Fixed 7-bit I2C address of the HDC1080.
pub const ADDRESS: u8 = 0x40;

const REG_TEMPERATURE: u8 = 0x00;
const REG_CONFIGURATION: u8 = 0x02;
const REG_MANUFACTURER_ID: u8 = 0xFE;
const REG_DEVICE_ID: u8 = 0xFF;

const MANUFACTURER_ID: u16 = 0x5449;
const DEVICE_ID: u16 = 0x1050;

const CONFIG_HEATER: u16 = 1 << 13;
/// Temperature and humidity acquired in one sequence.
const CONFIG_MODE_SEQUENCE: u16 = 1 << 12;
/// Supply below 2.8 V.
const CONFIG_BATTERY_LOW: u16 = 1 << 11;

/// Settling margin added to the datasheet conversion times.
const CONVERSION_MARGIN_US: u32 = 500;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureResolution {
    Bits14,
    Bits11,
}

impl TemperatureResolution {
    const fn config_bits(self) -> u16 {
        match self {
            Self::Bits14 => 0,
            Self::Bits11 => 1 << 10,
        }
    }

    const fn conversion_time_us(self) -> u32 {
        match self {
            Self::Bits14 => 6_350,
            Self::Bits11 => 3_650,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumidityResolution {
    Bits14,
    Bits11,
    Bits8,
}

impl HumidityResolution {
    const fn config_bits(self) -> u16 {
        match self {
            Self::Bits14 => 0b00 << 8,
            Self::Bits11 => 0b01 << 8,
            Self::Bits8 => 0b10 << 8,
        }
    }

    const fn conversion_time_us(self) -> u32 {
        match self {
            Self::Bits14 => 6_500,
            Self::Bits11 => 3_850,
            Self::Bits8 => 2_500,
        }
    }
}

/// One HDC1080 acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hdc1080Reading {
    /// Battery status bit: 0 when the supply is above 2.8 V, 1 below.
    pub battery: u8,
    pub temperature_centi_celsius: i32,
    pub humidity_centi_percent: i32,
}

impl Hdc1080Reading {
    /// Convert raw 16-bit register values (datasheet formulas).
    pub fn from_raw(battery: u8, raw_temperature: u16, raw_humidity: u16) -> Self {
        Self {
            battery,
            temperature_centi_celsius: ((raw_temperature as i32 * 16_500) >> 16) - 4_000,
            humidity_centi_percent: ((raw_humidity as u32 * 10_000) >> 16) as i32,
        }
    }
}

pub struct Hdc1080<I, D> {
    i2c: I,
    delay: D,
}

impl<I: I2c, D: DelayNs> Hdc1080<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self { i2c, delay }
    }

    /// Check that an HDC1080 answers on the bus.
    pub async fn probe(&mut self) -> Result<(), SensorError> {
        let manufacturer = self.read_register(REG_MANUFACTURER_ID).await?;
        if manufacturer != MANUFACTURER_ID {
            error!("HDC1080 manufacturer id mismatch: {:#06x}", manufacturer);
            return Err(SensorError::WrongDevice {
                sensor: "HDC1080",
                expected: MANUFACTURER_ID,
                found: manufacturer,
            });
        }

        let device = self.read_register(REG_DEVICE_ID).await?;
        if device != DEVICE_ID {
            error!("HDC1080 device id mismatch: {:#06x}", device);
            return Err(SensorError::WrongDevice {
                sensor: "HDC1080",
                expected: DEVICE_ID,
                found: device,
            });
        }

        info!("HDC1080: detected at {:#04x}", ADDRESS);
        Ok(())
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    async fn read_register(&mut self, register: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(ADDRESS, &[register], &mut buf)
            .await
            .map_err(|e| {
                error!("HDC1080 register {:#04x} read failed: {:?}", register, e);
                SensorError::ReadFailed {
                    sensor: "HDC1080",
                    operation: "read register",
                    details: "I2C communication error or sensor not responding",
                }
            })?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl<I: I2c, D: DelayNs> HumidityTemperatureSensor for Hdc1080<I, D> {
    async fn measure(&mut self, settings: &Hdc1080Settings) -> Result<Hdc1080Reading, SensorError> {
        let mut config = CONFIG_MODE_SEQUENCE
            | settings.temperature_resolution.config_bits()
            | settings.humidity_resolution.config_bits();
        if settings.heater {
            config |= CONFIG_HEATER;
        }

        let [hi, lo] = config.to_be_bytes();
        self.i2c
            .write(ADDRESS, &[REG_CONFIGURATION, hi, lo])
            .await
            .map_err(|e| {
                error!("HDC1080 configuration write failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "HDC1080",
                    operation: "write configuration",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        self.i2c
            .write(ADDRESS, &[REG_TEMPERATURE])
            .await
            .map_err(|e| {
                error!("HDC1080 measurement trigger failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "HDC1080",
                    operation: "trigger measurement",
                    details: "I2C communication error",
                }
            })?;

        self.delay
            .delay_us(
                settings.temperature_resolution.conversion_time_us()
                    + settings.humidity_resolution.conversion_time_us()
                    + CONVERSION_MARGIN_US,
            )
            .await;

        let mut data = [0u8; 4];
        self.i2c.read(ADDRESS, &mut data).await.map_err(|e| {
            error!("HDC1080 measurement read failed: {:?}", e);
            SensorError::ReadFailed {
                sensor: "HDC1080",
                operation: "read temperature/humidity",
                details: "I2C communication error or conversion not finished",
            }
        })?;

        let status = self.read_register(REG_CONFIGURATION).await?;
        let battery = u8::from(status & CONFIG_BATTERY_LOW != 0);

        Ok(Hdc1080Reading::from_raw(
            battery,
            u16::from_be_bytes([data[0], data[1]]),
            u16::from_be_bytes([data[2], data[3]]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NoDelay, ScriptedI2c};
    use embassy_futures::block_on;

    #[test]
    fn test_conversion_formulas() {
        let reading = Hdc1080Reading::from_raw(0, 0x6400, 0x8000);
        assert_eq!(reading.temperature_centi_celsius, 2445);
        assert_eq!(reading.humidity_centi_percent, 5000);

        let extremes = Hdc1080Reading::from_raw(1, 0x0000, 0xFFFF);
        assert_eq!(extremes.temperature_centi_celsius, -4000);
        assert_eq!(extremes.humidity_centi_percent, 9999);
        assert_eq!(extremes.battery, 1);
    }

    #[test]
    fn test_measure_transactions() {
        let mut i2c = ScriptedI2c::new();
        i2c.queue_read(&[0x64, 0x00, 0x80, 0x00]);
        // Configuration read back with the battery-low bit set
        i2c.queue_read(&[0x18, 0x00]);

        let mut sensor = Hdc1080::new(i2c, NoDelay::default());
        let reading = block_on(sensor.measure(&Hdc1080Settings::default())).unwrap();

        assert_eq!(reading.temperature_centi_celsius, 2445);
        assert_eq!(reading.humidity_centi_percent, 5000);
        assert_eq!(reading.battery, 1);

        let (i2c, delay) = sensor.release();
        assert_eq!(
            i2c.writes(),
            vec![
                (ADDRESS, vec![REG_CONFIGURATION, 0x10, 0x00]),
                (ADDRESS, vec![REG_TEMPERATURE]),
                (ADDRESS, vec![REG_CONFIGURATION]),
            ]
        );
        assert_eq!(delay.total_us, 6_350 + 6_500 + CONVERSION_MARGIN_US);
    }

    #[test]
    fn test_measure_config_bits() {
        let mut i2c = ScriptedI2c::new();
        i2c.queue_read(&[0; 4]);
        i2c.queue_read(&[0; 2]);

        let settings = Hdc1080Settings {
            temperature_resolution: TemperatureResolution::Bits11,
            humidity_resolution: HumidityResolution::Bits8,
            heater: true,
        };
        let mut sensor = Hdc1080::new(i2c, NoDelay::default());
        let reading = block_on(sensor.measure(&settings)).unwrap();
        assert_eq!(reading.battery, 0);

        let (i2c, _) = sensor.release();
        // heater | sequence | 11-bit T | 8-bit RH
        assert_eq!(i2c.writes()[0], (ADDRESS, vec![REG_CONFIGURATION, 0x36, 0x00]));
    }

    #[test]
    fn test_measure_bus_error() {
        let mut sensor = Hdc1080::new(ScriptedI2c::failing(), NoDelay::default());
        let result = block_on(sensor.measure(&Hdc1080Settings::default()));
        assert!(matches!(
            result,
            Err(SensorError::ReadFailed {
                sensor: "HDC1080",
                ..
            })
        ));
    }

    #[test]
    fn test_probe() {
        let mut i2c = ScriptedI2c::new();
        i2c.queue_read(&MANUFACTURER_ID.to_be_bytes());
        i2c.queue_read(&DEVICE_ID.to_be_bytes());
        let mut sensor = Hdc1080::new(i2c, NoDelay::default());
        assert_eq!(block_on(sensor.probe()), Ok(()));

        let mut i2c = ScriptedI2c::new();
        i2c.queue_read(&[0x12, 0x34]);
        let mut sensor = Hdc1080::new(i2c, NoDelay::default());
        assert_eq!(
            block_on(sensor.probe()),
            Err(SensorError::WrongDevice {
                sensor: "HDC1080",
                expected: MANUFACTURER_ID,
                found: 0x1234,
            })
        );
    }
}
