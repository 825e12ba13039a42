//! Response framing
//!
//! Every response line has the form `#<address>:<payload>\n`. The line is
//! written with `write_all` and flushed, so a response counts as sent only
//! once the output channel reports completion.

use core::fmt::{self, Write as _};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_io_async::{Error as _, ErrorKind, ErrorType, Write};
use heapless::String;
use log::warn;
use thiserror_no_std::Error;

use crate::address::DeviceAddress;

/// Longest payload carried by one response line. Longer payloads are cut.
pub const MAX_PAYLOAD_LEN: usize = 32;

/// `#`, digit, `:`, payload and `\n`.
const MAX_RESPONSE_LEN: usize = MAX_PAYLOAD_LEN + 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Response transmit failed: {0:?}")]
    Transmit(ErrorKind),
}

/// Writes framed response lines for one node address.
pub struct Responder<'a, W> {
    out: &'a mut W,
    address: DeviceAddress,
}

impl<'a, W: Write> Responder<'a, W> {
    pub fn new(out: &'a mut W, address: DeviceAddress) -> Self {
        Self { out, address }
    }

    /// Frame `payload` and transmit it, waiting for the transmit to complete.
    pub async fn respond(&mut self, payload: fmt::Arguments<'_>) -> Result<(), ResponseError> {
        let mut text: String<MAX_PAYLOAD_LEN> = String::new();
        if Truncating(&mut text).write_fmt(payload).is_err() {
            warn!("Response payload truncated to {:?}", text.as_str());
        }

        let mut line: String<MAX_RESPONSE_LEN> = String::new();
        // Sized for the longest payload, cannot fail.
        let _ = writeln!(line, "#{}:{}", self.address, text);

        self.out
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ResponseError::Transmit(e.kind()))?;
        self.out
            .flush()
            .await
            .map_err(|e| ResponseError::Transmit(e.kind()))
    }
}

/// Output channel shared by the echo path and the responses.
pub type SharedWriter<W> = Mutex<CriticalSectionRawMutex, W>;

/// Writes through a [`SharedWriter`], taking the lock once per call.
///
/// A `write` hands the whole buffer to the inner writer under one lock, so a
/// framed response is never interleaved with echo bytes. Between response
/// lines the lock is free, including while a handler waits on a sensor.
pub struct LockedWriter<'a, W> {
    shared: &'a SharedWriter<W>,
}

impl<'a, W> LockedWriter<'a, W> {
    pub const fn new(shared: &'a SharedWriter<W>) -> Self {
        Self { shared }
    }
}

impl<W: ErrorType> ErrorType for LockedWriter<'_, W> {
    type Error = W::Error;
}

impl<W: Write> Write for LockedWriter<'_, W> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut out = self.shared.lock().await;
        out.write_all(buf).await?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.shared.lock().await.flush().await
    }
}

/// Keeps as much of the formatted text as fits, then reports the overflow.
struct Truncating<'a, const N: usize>(&'a mut String<N>);

impl<const N: usize> fmt::Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            self.0.push(c).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

/// Fixed-point value in hundredths, displayed with exactly two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hundredths(pub i32);

impl fmt::Display for Hundredths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
    }
}
