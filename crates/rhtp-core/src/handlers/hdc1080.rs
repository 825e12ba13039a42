use embedded_io_async::Write;
use log::{debug, warn};

use super::FIELD_FAILED;
use crate::config::Hdc1080Settings;
use crate::response::{Hundredths, Responder, ResponseError};
use crate::sensors::HumidityTemperatureSensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Temperature,
    Humidity,
    Battery,
}

impl Field {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            b'T' => Some(Self::Temperature),
            b'H' => Some(Self::Humidity),
            b'V' => Some(Self::Battery),
            _ => None,
        }
    }

    fn prefix(self) -> char {
        match self {
            Self::Temperature => 't',
            Self::Humidity => 'h',
            Self::Battery => 'v',
        }
    }
}

/// `T` temperature, `H` humidity, `V` battery status. Each field takes a
/// fresh measurement.
pub(super) async fn handle<S, W>(
    sensor: &mut S,
    settings: &Hdc1080Settings,
    args: &[u8],
    out: &mut Responder<'_, W>,
) -> Result<(), ResponseError>
where
    S: HumidityTemperatureSensor,
    W: Write,
{
    for &code in args {
        let Some(field) = Field::from_code(code) else {
            debug!("HDC1080: skipping field code {:?}", code as char);
            continue;
        };

        let reading = match sensor.measure(settings).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("HDC1080: field '{}' unavailable: {}", field.prefix(), e);
                out.respond(format_args!("{}={}", field.prefix(), FIELD_FAILED))
                    .await?;
                continue;
            }
        };

        match field {
            Field::Temperature => {
                out.respond(format_args!(
                    "t={}",
                    Hundredths(reading.temperature_centi_celsius)
                ))
                .await?
            }
            Field::Humidity => {
                out.respond(format_args!("h={}", Hundredths(reading.humidity_centi_percent)))
                    .await?
            }
            Field::Battery => out.respond(format_args!("v={}", reading.battery)).await?,
        }
    }

    Ok(())
}
