//! Desktop simulator for the RHTP sensor node.
//!
//! Runs the node's line assembler and dispatcher over stdin/stdout, with
//! synthetic HDC1080 and MS5637 readings, so the protocol can be exercised
//! without hardware:
//!
//! ```text
//! $ echo '@0:HDC1080 TH' | cargo run -p rhtp-simulator
//! #0:t=23.12
//! #0:h=51.40
//! ```
//!
//! # Environment
//!
//! | Variable              | Meaning                              |
//! |-----------------------|--------------------------------------|
//! | `RHTP_DEVICE_ADDRESS` | Node address digit (default `0`)     |
//! | `RHTP_LOCAL_ECHO`     | Echo received bytes (`1` / `true`)   |
//! | `RUST_LOG`            | Log filter, logs go to stderr        |

use std::env;
use std::io::{self, Read, Write as _};
use std::time::Instant;

use embassy_futures::block_on;
use embedded_io_async::{ErrorKind, ErrorType, Write};
use log::{error, info};

use rhtp_core::config::Hdc1080Settings;
use rhtp_core::handlers::CommandHandlers;
use rhtp_core::sensors::{
    Calibration, Conversion, Hdc1080Reading, HumidityTemperatureSensor, Oversampling,
    PressureSensor, SensorError,
};
use rhtp_core::{DeviceConfig, Dispatcher, LineAssembler};

// ---------------------------------------------------------------------------
// Mock sensors
// ---------------------------------------------------------------------------

/// PROM contents of the simulated MS5637 (datasheet example part).
const CALIBRATION: Calibration = [0x0000, 46372, 43981, 29059, 27842, 31553, 28165, 0x0000];

/// Seconds since the simulator started, drives the synthetic waveforms.
fn elapsed_secs(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

/// Room temperature in centi-degrees: 20–26 °C sinusoidal with slow drift.
fn ambient_centi_celsius(t: f64) -> i32 {
    let celsius = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
    (celsius * 100.0) as i32
}

struct SimulatedHdc1080 {
    start: Instant,
}

impl HumidityTemperatureSensor for SimulatedHdc1080 {
    async fn measure(&mut self, _settings: &Hdc1080Settings) -> Result<Hdc1080Reading, SensorError> {
        let t = elapsed_secs(self.start);
        // Humidity: 40–60 % with a different period
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();

        Ok(Hdc1080Reading {
            battery: 0,
            temperature_centi_celsius: ambient_centi_celsius(t),
            humidity_centi_percent: (humidity * 100.0) as i32,
        })
    }
}

struct SimulatedMs5637 {
    start: Instant,
}

impl SimulatedMs5637 {
    /// Raw D2 giving `temperature` (centi-°C) under first order compensation.
    fn raw_temperature(temperature: i32) -> i64 {
        let c5 = i64::from(CALIBRATION[5]);
        let c6 = i64::from(CALIBRATION[6]);
        c5 * 256 + (i64::from(temperature) - 2000) * (1 << 23) / c6
    }

    /// Raw D1 giving `pressure` (centi-mbar) at raw temperature `d2`.
    fn raw_pressure(pressure: i32, d2: i64) -> i64 {
        let [_, c1, c2, c3, c4, c5, ..] = CALIBRATION.map(i64::from);
        let dt = d2 - c5 * 256;
        let off = c2 * (1 << 17) + c4 * dt / (1 << 6);
        let sens = c1 * (1 << 16) + c3 * dt / (1 << 7);
        (i64::from(pressure) * (1 << 15) + off) * (1 << 21) / sens
    }
}

impl PressureSensor for SimulatedMs5637 {
    async fn read_calibration(&mut self, index: u8) -> Result<u16, SensorError> {
        CALIBRATION
            .get(usize::from(index))
            .copied()
            .ok_or(SensorError::InvalidArgument {
                sensor: "MS5637",
                details: "PROM index out of range",
            })
    }

    async fn read_raw(
        &mut self,
        conversion: Conversion,
        _oversampling: Oversampling,
    ) -> Result<u32, SensorError> {
        let t = elapsed_secs(self.start);
        // Pressure: 1000–1026 mbar with a long cycle
        let pressure = (101_300.0 + 1300.0 * (t / 300.0).sin()) as i32;
        let d2 = Self::raw_temperature(ambient_centi_celsius(t));

        let raw = match conversion {
            Conversion::Temperature => d2,
            Conversion::Pressure => Self::raw_pressure(pressure, d2),
        };
        Ok(raw.clamp(0, 0x00FF_FFFF) as u32)
    }
}

// ---------------------------------------------------------------------------
// Host link
// ---------------------------------------------------------------------------

/// stdout as the node's transmit channel.
struct StdoutLink(io::Stdout);

impl ErrorType for StdoutLink {
    type Error = ErrorKind;
}

impl Write for StdoutLink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).map_err(|_| ErrorKind::Other)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().map_err(|_| ErrorKind::Other)
    }
}

fn main() {
    env_logger::init();

    let config = DeviceConfig::from_env_values(
        env::var("RHTP_DEVICE_ADDRESS").ok().as_deref(),
        env::var("RHTP_LOCAL_ECHO").ok().as_deref(),
    );
    info!(
        "Simulated node at address {} (local echo {})",
        config.address, config.local_echo
    );

    let start = Instant::now();
    let handlers = CommandHandlers::new(
        SimulatedHdc1080 { start },
        SimulatedMs5637 { start },
        &config,
    );
    let mut dispatcher = Dispatcher::new(config.address, handlers);
    let mut assembler = LineAssembler::new(config.local_echo);
    let mut link = StdoutLink(io::stdout());

    for byte in io::stdin().lock().bytes() {
        let byte = match byte {
            Ok(byte) => byte,
            Err(e) => {
                error!("stdin read failed: {}", e);
                break;
            }
        };

        let echo = assembler.process_received_byte(byte);
        if !echo.as_bytes().is_empty() {
            let sent = block_on(async {
                link.write_all(echo.as_bytes()).await?;
                link.flush().await
            });
            if let Err(e) = sent {
                error!("Echo failed: {:?}", e);
            }
        }

        if let Some(line) = assembler.consume_ready_line() {
            if let Err(e) = block_on(dispatcher.dispatch(line, &mut link)) {
                error!("Response not sent: {}", e);
            }
        }
    }

    info!("stdin closed, exiting");
}
