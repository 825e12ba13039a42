use embedded_io_async::Write;
use log::{debug, warn};

use super::FIELD_FAILED;
use crate::config::Ms5637Settings;
use crate::response::{Hundredths, Responder, ResponseError};
use crate::sensors::{
    Calibration, Compensated, Conversion, PressureSensor, SensorError, compensate,
    ms5637::CALIBRATION_WORDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pressure,
    Temperature,
    /// PROM word 0..=7
    Calibration(usize),
    /// Raw D1
    RawPressure,
    /// Raw D2
    RawTemperature,
}

impl Field {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            b'P' => Some(Self::Pressure),
            b'T' => Some(Self::Temperature),
            b'C'..=b'J' => Some(Self::Calibration(usize::from(code - b'C'))),
            // Requests are uppercased before they reach the handler, so the
            // raw codes arrive as X/Y.
            b'x' | b'X' => Some(Self::RawPressure),
            b'y' | b'Y' => Some(Self::RawTemperature),
            _ => None,
        }
    }

    fn prefix(self) -> char {
        match self {
            Self::Pressure => 'p',
            Self::Temperature => 'T',
            Self::Calibration(index) => char::from(b'c' + index as u8),
            Self::RawPressure => 'x',
            Self::RawTemperature => 'y',
        }
    }
}

/// One raw D1/D2 pair with its compensated values.
struct Sample {
    d1: u32,
    d2: u32,
    compensated: Compensated,
}

async fn read_calibration<S: PressureSensor>(sensor: &mut S) -> Result<Calibration, SensorError> {
    let mut calibration = [0u16; CALIBRATION_WORDS];
    for (index, word) in calibration.iter_mut().enumerate() {
        *word = sensor.read_calibration(index as u8).await?;
    }
    Ok(calibration)
}

async fn acquire<S: PressureSensor>(
    sensor: &mut S,
    settings: &Ms5637Settings,
    calibration: &Calibration,
) -> Result<Sample, SensorError> {
    let d1 = sensor
        .read_raw(Conversion::Pressure, settings.oversampling)
        .await?;
    let d2 = sensor
        .read_raw(Conversion::Temperature, settings.oversampling)
        .await?;
    Ok(Sample {
        d1,
        d2,
        compensated: compensate(calibration, d1, d2),
    })
}

/// `P` pressure, `T` temperature, `C`..`J` PROM words, `x`/`y` raw D1/D2.
///
/// The PROM is read on every call. Each recognized field then takes a fresh
/// D1/D2 acquisition.
pub(super) async fn handle<S, W>(
    sensor: &mut S,
    settings: &Ms5637Settings,
    args: &[u8],
    out: &mut Responder<'_, W>,
) -> Result<(), ResponseError>
where
    S: PressureSensor,
    W: Write,
{
    let prom = read_calibration(sensor).await;
    if let Err(e) = &prom {
        warn!("MS5637: calibration unavailable: {}", e);
    }

    for &code in args {
        let Some(field) = Field::from_code(code) else {
            debug!("MS5637: skipping field code {:?}", code as char);
            continue;
        };

        let Ok(calibration) = &prom else {
            out.respond(format_args!("{}={}", field.prefix(), FIELD_FAILED))
                .await?;
            continue;
        };

        let sample = acquire(sensor, settings, calibration).await;

        match (field, sample) {
            (Field::Calibration(index), _) => {
                out.respond(format_args!("{}={:04X}", field.prefix(), calibration[index]))
                    .await?
            }
            (_, Err(e)) => {
                warn!("MS5637: field '{}' unavailable: {}", field.prefix(), e);
                out.respond(format_args!("{}={}", field.prefix(), FIELD_FAILED))
                    .await?
            }
            (Field::Pressure, Ok(sample)) => {
                out.respond(format_args!(
                    "p={}",
                    Hundredths(sample.compensated.pressure_centi_mbar)
                ))
                .await?
            }
            (Field::Temperature, Ok(sample)) => {
                out.respond(format_args!(
                    "T={}",
                    Hundredths(sample.compensated.temperature_centi_celsius)
                ))
                .await?
            }
            (Field::RawPressure, Ok(sample)) => {
                out.respond(format_args!("x={:08X}", sample.d1)).await?
            }
            (Field::RawTemperature, Ok(sample)) => {
                out.respond(format_args!("y={:08X}", sample.d2)).await?
            }
        }
    }

    Ok(())
}
