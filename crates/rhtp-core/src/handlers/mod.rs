//! Per-command handlers
//!
//! A handler receives the argument string of its command as a sequence of
//! single-letter field codes. Every recognized code produces exactly one
//! response line, in request order; unrecognized codes are skipped.

mod hdc1080;
mod ms5637;

use embedded_io_async::Write;

use crate::command_table::CommandId;
use crate::config::{DeviceConfig, Hdc1080Settings, Ms5637Settings};
use crate::response::{Responder, ResponseError};
use crate::sensors::{HumidityTemperatureSensor, PressureSensor};

/// Payload of the identification command.
pub const IDENTITY: &str = "RHTP V1.0";

/// Payload sent for an addressed line with an unknown keyword.
pub const UNKNOWN_COMMAND: &str = "?";

/// Value sent in place of a field whose sensor acquisition failed.
pub const FIELD_FAILED: &str = "!";

/// The handler set, one per [`CommandId`].
pub struct CommandHandlers<H, P> {
    hdc1080: H,
    ms5637: P,
    hdc1080_settings: Hdc1080Settings,
    ms5637_settings: Ms5637Settings,
}

impl<H, P> CommandHandlers<H, P>
where
    H: HumidityTemperatureSensor,
    P: PressureSensor,
{
    pub fn new(hdc1080: H, ms5637: P, config: &DeviceConfig) -> Self {
        Self {
            hdc1080,
            ms5637,
            hdc1080_settings: config.hdc1080,
            ms5637_settings: config.ms5637,
        }
    }

    /// Run the handler selected by `id`.
    pub async fn handle<W: Write>(
        &mut self,
        id: CommandId,
        args: &[u8],
        out: &mut Responder<'_, W>,
    ) -> Result<(), ResponseError> {
        match id {
            CommandId::Hdc1080 => {
                hdc1080::handle(&mut self.hdc1080, &self.hdc1080_settings, args, out).await
            }
            CommandId::Ms5637 => {
                ms5637::handle(&mut self.ms5637, &self.ms5637_settings, args, out).await
            }
            CommandId::Id => out.respond(format_args!("{}", IDENTITY)).await,
            CommandId::Unknown => out.respond(format_args!("{}", UNKNOWN_COMMAND)).await,
        }
    }

    #[cfg(test)]
    pub(crate) fn sensors(&mut self) -> (&mut H, &mut P) {
        (&mut self.hdc1080, &mut self.ms5637)
    }
}
