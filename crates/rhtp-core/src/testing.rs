//! Host-side fakes shared by the unit tests

use std::collections::VecDeque;
use std::convert::Infallible;
use std::string::String;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind as I2cErrorKind, ErrorType as I2cErrorType, I2c, Operation};
use embedded_io_async::{ErrorKind as IoErrorKind, ErrorType as IoErrorType, Write};

use crate::config::Hdc1080Settings;
use crate::sensors::{
    Calibration, Conversion, Hdc1080Reading, HumidityTemperatureSensor, Oversampling,
    PressureSensor, SensorError,
};

/// I2C bus that records writes and answers reads from a queue.
#[derive(Default)]
pub struct ScriptedI2c {
    writes: Vec<(u8, Vec<u8>)>,
    reads: VecDeque<Vec<u8>>,
    fail: bool,
}

impl ScriptedI2c {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus on which every transaction fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn queue_read(&mut self, data: &[u8]) {
        self.reads.push_back(data.to_vec());
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.writes.clone()
    }
}

impl I2cErrorType for ScriptedI2c {
    type Error = I2cErrorKind;
}

impl I2c for ScriptedI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(I2cErrorKind::Other);
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => {
                    let data = self.reads.pop_front().unwrap_or_default();
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and remembers how long it was asked to wait.
#[derive(Default)]
pub struct NoDelay {
    pub total_us: u32,
}

impl DelayNs for NoDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_us += ns / 1_000;
    }

    async fn delay_us(&mut self, us: u32) {
        self.total_us += us;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_us += ms * 1_000;
    }
}

/// Output channel capturing everything written to it.
#[derive(Default)]
pub struct RecordingWriter {
    pub bytes: Vec<u8>,
    pub flushes: usize,
}

impl RecordingWriter {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(String::from).collect()
    }
}

impl IoErrorType for RecordingWriter {
    type Error = Infallible;
}

impl Write for RecordingWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

/// Output channel whose transmitter never completes.
pub struct FailingWriter;

impl IoErrorType for FailingWriter {
    type Error = IoErrorKind;
}

impl Write for FailingWriter {
    async fn write(&mut self, _buf: &[u8]) -> Result<usize, Self::Error> {
        Err(IoErrorKind::TimedOut)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Err(IoErrorKind::TimedOut)
    }
}

pub struct FakeHdc1080 {
    pub reading: Hdc1080Reading,
    pub measurements: usize,
    pub fail: bool,
}

impl FakeHdc1080 {
    pub fn new(temperature_centi_celsius: i32, humidity_centi_percent: i32, battery: u8) -> Self {
        Self {
            reading: Hdc1080Reading {
                battery,
                temperature_centi_celsius,
                humidity_centi_percent,
            },
            measurements: 0,
            fail: false,
        }
    }
}

impl HumidityTemperatureSensor for FakeHdc1080 {
    async fn measure(&mut self, _settings: &Hdc1080Settings) -> Result<Hdc1080Reading, SensorError> {
        self.measurements += 1;
        if self.fail {
            return Err(SensorError::ReadFailed {
                sensor: "HDC1080",
                operation: "measure",
                details: "simulated failure",
            });
        }
        Ok(self.reading)
    }
}

pub struct FakeMs5637 {
    pub calibration: Calibration,
    pub d1: u32,
    pub d2: u32,
    pub prom_reads: usize,
    pub conversions: Vec<(Conversion, Oversampling)>,
    pub fail_prom: bool,
    pub fail_raw: bool,
}

impl FakeMs5637 {
    pub fn new(calibration: Calibration, d1: u32, d2: u32) -> Self {
        Self {
            calibration,
            d1,
            d2,
            prom_reads: 0,
            conversions: Vec::new(),
            fail_prom: false,
            fail_raw: false,
        }
    }
}

impl PressureSensor for FakeMs5637 {
    async fn read_calibration(&mut self, index: u8) -> Result<u16, SensorError> {
        self.prom_reads += 1;
        if self.fail_prom {
            return Err(SensorError::ReadFailed {
                sensor: "MS5637",
                operation: "read PROM",
                details: "simulated failure",
            });
        }
        Ok(self.calibration[usize::from(index)])
    }

    async fn read_raw(
        &mut self,
        conversion: Conversion,
        oversampling: Oversampling,
    ) -> Result<u32, SensorError> {
        self.conversions.push((conversion, oversampling));
        if self.fail_raw {
            return Err(SensorError::ReadFailed {
                sensor: "MS5637",
                operation: "read ADC",
                details: "simulated failure",
            });
        }
        Ok(match conversion {
            Conversion::Pressure => self.d1,
            Conversion::Temperature => self.d2,
        })
    }
}
