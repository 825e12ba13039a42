//! Hardware-independent core library for the RHTP sensor node
//!
//! This crate contains all platform-agnostic logic of the node: the UART line
//! assembler, the command table and dispatcher, the per-command handlers and
//! response framing, and the HDC1080 / MS5637 drivers written against
//! `embedded-hal-async`.
//!
//! It is `#![no_std]` so it compiles on both the ESP32-S3 firmware and desktop
//! hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod address;
pub mod command_table;
pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod line_assembler;
pub mod response;
pub mod sensor_bus;
pub mod sensors;

#[cfg(test)]
mod testing;

pub use address::{AddressProvider, BcdSwitchAddress, DeviceAddress};
pub use command_table::{CommandId, find_command_id};
pub use config::DeviceConfig;
pub use dispatcher::Dispatcher;
pub use line_assembler::{Echo, LINE_CAPACITY, Line, LineAssembler, SharedLineAssembler};
pub use response::{Responder, ResponseError};
