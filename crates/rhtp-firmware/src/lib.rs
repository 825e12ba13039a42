//! ESP32-S3 firmware-specific modules for the RHTP sensor node
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: ESP32 peripheral initialization (I2C, UART, address switches),
//! sensor bring-up and the compile-time node configuration.

#![no_std]

pub mod app_state;
