//! Command line dispatch
//!
//! A request line looks like `@<address>:<KEYWORD>[ <fields>]`. Lines for
//! other addresses, or without a well-formed prefix, are dropped without a
//! reply so that several nodes can share one serial line.

use embedded_io_async::Write;
use heapless::Vec;
use log::debug;

use crate::address::AddressProvider;
use crate::command_table::find_command_id;
use crate::handlers::CommandHandlers;
use crate::response::{Responder, ResponseError};
use crate::sensors::{HumidityTemperatureSensor, PressureSensor};

/// Capacity of the keyword and argument working buffers.
pub const MAX_CMD_LEN: usize = 64;

const ADDRESS_MARKER: u8 = b'@';
const ADDRESS_SEPARATOR: u8 = b':';

/// Dispatch session: owns the handler set and the working buffers reused by
/// every dispatched line.
pub struct Dispatcher<A, H, P> {
    address: A,
    handlers: CommandHandlers<H, P>,
    keyword: Vec<u8, MAX_CMD_LEN>,
    arguments: Vec<u8, MAX_CMD_LEN>,
}

impl<A, H, P> Dispatcher<A, H, P>
where
    A: AddressProvider,
    H: HumidityTemperatureSensor,
    P: PressureSensor,
{
    pub fn new(address: A, handlers: CommandHandlers<H, P>) -> Self {
        Self {
            address,
            handlers,
            keyword: Vec::new(),
            arguments: Vec::new(),
        }
    }

    /// Process one complete request line, writing any responses to `out`.
    ///
    /// Only transport failures are reported; protocol mismatches are
    /// silently ignored and unknown keywords answered with `?`.
    pub async fn dispatch<W: Write>(&mut self, line: &[u8], out: &mut W) -> Result<(), ResponseError> {
        let address = self.address.current_address();

        let request = match line {
            [ADDRESS_MARKER, digit, ADDRESS_SEPARATOR, request @ ..]
                if *digit == address.ascii_digit() =>
            {
                request
            }
            _ => {
                debug!("Dropping line not addressed to {}", address);
                return Ok(());
            }
        };

        if !self.tokenize(request) {
            debug!("Dropping empty command");
            return Ok(());
        }

        let id = find_command_id(&self.keyword);
        debug!(
            "Dispatching {:?} with fields {:?}",
            id,
            core::str::from_utf8(&self.arguments).unwrap_or("<binary>")
        );

        let mut responder = Responder::new(out, address);
        self.handlers
            .handle(id, &self.arguments, &mut responder)
            .await
    }

    /// Fill the keyword and argument buffers from the request (the part after
    /// the address prefix). Returns false when nothing is left after trimming.
    fn tokenize(&mut self, request: &[u8]) -> bool {
        self.keyword.clear();
        self.arguments.clear();

        let request = if request.len() > MAX_CMD_LEN {
            debug!("Command truncated to {} bytes", MAX_CMD_LEN);
            &request[..MAX_CMD_LEN]
        } else {
            request
        };

        let request = request.trim_ascii();
        if request.is_empty() {
            return false;
        }

        let (keyword, arguments) = match request.iter().position(|&b| b == b' ') {
            Some(split) => (&request[..split], &request[split + 1..]),
            None => (request, &[][..]),
        };

        // Both halves come from a slice of at most MAX_CMD_LEN bytes.
        let _ = self.keyword.extend_from_slice(keyword);
        let _ = self.arguments.extend_from_slice(arguments);
        self.keyword.make_ascii_uppercase();
        self.arguments.make_ascii_uppercase();

        true
    }

    #[cfg(test)]
    pub(crate) fn handlers(&mut self) -> &mut CommandHandlers<H, P> {
        &mut self.handlers
    }
}
