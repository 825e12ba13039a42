//! Line assembly for UART input
//!
//! Received bytes are collected one at a time into a fixed line buffer with
//! minimal line editing. A completed line raises a one-shot ready flag which
//! the dispatch loop reads and clears.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::debug;

/// Maximum number of bytes in one line, terminator excluded.
pub const LINE_CAPACITY: usize = 255;

const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7F;
const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Owned copy of a completed line.
pub type Line = heapless::Vec<u8, LINE_CAPACITY>;

/// Bytes to send back to the terminal for local echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    None,
    /// Echo the received byte as-is.
    Byte([u8; 1]),
    /// Erase the last character on the terminal.
    Erase,
}

impl Echo {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::None => &[],
            Self::Byte(byte) => byte,
            Self::Erase => b"\x08 \x08",
        }
    }
}

/// Byte-at-a-time line editor with a one-shot "line ready" flag.
pub struct LineAssembler {
    buf: [u8; LINE_CAPACITY],
    cursor: usize,
    /// Length of the last completed line.
    completed: usize,
    ready: bool,
    local_echo: bool,
}

impl LineAssembler {
    pub const fn new(local_echo: bool) -> Self {
        Self {
            buf: [0u8; LINE_CAPACITY],
            cursor: 0,
            completed: 0,
            ready: false,
            local_echo,
        }
    }

    /// Process one received byte.
    ///
    /// CR is treated as LF. Backspace and DEL erase the previous byte. A line
    /// completes on LF (the LF itself is not part of the line) or when the
    /// buffer fills up. LF on an empty buffer completes an empty line.
    pub fn process_received_byte(&mut self, byte: u8) -> Echo {
        let byte = if byte == CR { LF } else { byte };

        if byte == BACKSPACE || byte == DEL {
            if self.cursor == 0 {
                return Echo::None;
            }
            self.cursor -= 1;
            return if self.local_echo {
                Echo::Erase
            } else {
                Echo::None
            };
        }

        let echo = if self.local_echo {
            Echo::Byte([byte])
        } else {
            Echo::None
        };

        if byte == LF {
            // An empty line carries nothing to dispatch; never let it replace
            // a line still waiting to be consumed (the LF of a CR LF pair).
            if self.cursor == 0 && self.ready {
                return echo;
            }
            self.complete(self.cursor);
        } else {
            self.buf[self.cursor] = byte;
            self.cursor += 1;
            if self.cursor == LINE_CAPACITY {
                debug!("Line buffer full, forcing end of line");
                // The forced line keeps the byte that filled the buffer.
                self.complete(LINE_CAPACITY);
            }
        }

        echo
    }

    fn complete(&mut self, len: usize) {
        self.completed = len;
        self.cursor = 0;
        self.ready = true;
    }

    /// Read-and-clear access to the completed line.
    ///
    /// Returns the line only once per completion. Bytes processed after a
    /// completion but before this call overwrite the start of the buffer.
    pub fn consume_ready_line(&mut self) -> Option<&[u8]> {
        if !core::mem::take(&mut self.ready) {
            return None;
        }
        Some(&self.buf[..self.completed])
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(false)
    }
}

/// A [`LineAssembler`] shared between the receive path and the dispatch loop.
///
/// Every access runs inside a critical section, so the ready flag is read and
/// cleared atomically with respect to the producer and the line is copied out
/// before new bytes can overwrite it.
///
/// ```rust,ignore
/// static ASSEMBLER: SharedLineAssembler = SharedLineAssembler::new(false);
///
/// // receive task
/// let echo = ASSEMBLER.process_received_byte(byte);
///
/// // dispatch loop
/// let line = ASSEMBLER.wait_line().await;
/// ```
pub struct SharedLineAssembler {
    inner: Mutex<CriticalSectionRawMutex, RefCell<LineAssembler>>,
    line_ready: Signal<CriticalSectionRawMutex, ()>,
}

impl SharedLineAssembler {
    pub const fn new(local_echo: bool) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(LineAssembler::new(local_echo))),
            line_ready: Signal::new(),
        }
    }

    pub fn process_received_byte(&self, byte: u8) -> Echo {
        let (echo, ready) = self.inner.lock(|cell| {
            let mut assembler = cell.borrow_mut();
            let echo = assembler.process_received_byte(byte);
            (echo, assembler.ready)
        });
        if ready {
            self.line_ready.signal(());
        }
        echo
    }

    /// Take the completed line, if any, clearing the ready flag.
    pub fn consume_ready_line(&self) -> Option<Line> {
        self.inner.lock(|cell| {
            cell.borrow_mut().consume_ready_line().map(|bytes| {
                let mut line = Line::new();
                // Cannot fail: a line never exceeds LINE_CAPACITY.
                let _ = line.extend_from_slice(bytes);
                line
            })
        })
    }

    /// Wait until a line completes and take it.
    pub async fn wait_line(&self) -> Line {
        loop {
            if let Some(line) = self.consume_ready_line() {
                return line;
            }
            self.line_ready.wait().await;
        }
    }
}
