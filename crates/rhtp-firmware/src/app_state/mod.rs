//! Firmware-specific application state
//!
//! Hardware bring-up for the node and the concrete sensor / dispatcher types
//! built on top of `rhtp_core`.

mod hardware;
mod node_config;
mod sensors_state;

pub use hardware::*;
pub use node_config::*;
pub use sensors_state::*;
