//! Sensor bring-up and the node's dispatcher type

use embassy_time::Delay;
use log::{error, info};
use rhtp_core::DeviceConfig;
use rhtp_core::Dispatcher;
use rhtp_core::handlers::CommandHandlers;
use rhtp_core::sensors::{Hdc1080, Ms5637};

use super::{SensorI2cDevice, SwitchAddress};

pub type NodeHdc1080 = Hdc1080<SensorI2cDevice, Delay>;
pub type NodeMs5637 = Ms5637<SensorI2cDevice, Delay>;
pub type NodeDispatcher = Dispatcher<SwitchAddress, NodeHdc1080, NodeMs5637>;

/// Create both sensor drivers and check that the parts respond.
///
/// A sensor that fails bring-up is kept anyway: every request for its fields
/// then reports the failure instead of the node refusing to start.
pub async fn init_sensors(
    hdc1080_i2c: SensorI2cDevice,
    ms5637_i2c: SensorI2cDevice,
) -> (NodeHdc1080, NodeMs5637) {
    let mut hdc1080 = Hdc1080::new(hdc1080_i2c, Delay);
    match hdc1080.probe().await {
        Ok(()) => info!("HDC1080 ready"),
        Err(e) => error!("HDC1080 bring-up failed: {}", e),
    }

    let mut ms5637 = Ms5637::new(ms5637_i2c, Delay);
    match ms5637.reset().await {
        Ok(()) => info!("MS5637 ready"),
        Err(e) => error!("MS5637 bring-up failed: {}", e),
    }

    (hdc1080, ms5637)
}

pub fn build_dispatcher(
    address: SwitchAddress,
    hdc1080: NodeHdc1080,
    ms5637: NodeMs5637,
    config: &DeviceConfig,
) -> NodeDispatcher {
    Dispatcher::new(address, CommandHandlers::new(hdc1080, ms5637, config))
}
