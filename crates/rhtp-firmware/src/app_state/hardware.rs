//! Hardware initialization for the node
//!
//! This module sets up the peripherals in the order the node needs them:
//! the sensor I2C bus, the host UART and the address switch inputs.

use embassy_sync::mutex::Mutex;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::uart::{Config as UartConfig, Uart, UartRx, UartTx};
use esp_hal::Async;
use embedded_io_async::{ErrorKind, ErrorType, Write};
use log::info;
use rhtp_core::response::SharedWriter;
use rhtp_core::sensor_bus::{SensorDevice, SharedSensorBus};
use rhtp_core::sensors::{hdc1080, ms5637};
use rhtp_core::{BcdSwitchAddress, DeviceAddress};
use static_cell::StaticCell;

/// Host link speed.
pub const UART_BAUD_RATE: u32 = 115_200;

pub type SensorBus = I2c<'static, Async>;
pub type SensorI2cDevice = SensorDevice<'static, SensorBus>;
pub type HostTx = SharedWriter<HostLink>;
pub type SwitchAddress = BcdSwitchAddress<Input<'static>>;

/// Transmit half of the host UART as a byte sink for echo and responses.
pub struct HostLink(UartTx<'static, Async>);

impl ErrorType for HostLink {
    type Error = ErrorKind;
}

impl Write for HostLink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write_async(buf).await.map_err(|_| ErrorKind::Other)
    }

    /// Resolves once the UART FIFO has drained.
    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush_async().await.map_err(|_| ErrorKind::Other)
    }
}

/// Create the sensor I2C bus (400 kHz).
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> SensorBus {
    I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(400)))
        .unwrap()
        .with_sda(sda)
        .with_scl(scl)
        .into_async()
}

/// Share the sensor bus and hand out one device handle per sensor.
///
/// # Returns
/// A tuple of (handle bound to the HDC1080, handle bound to the MS5637)
pub fn share_i2c_bus(bus: SensorBus) -> (SensorI2cDevice, SensorI2cDevice) {
    static I2C0_BUS: StaticCell<SharedSensorBus<SensorBus>> = StaticCell::new();
    let shared: &'static SharedSensorBus<SensorBus> = I2C0_BUS.init(SharedSensorBus::new(bus));

    (
        shared.device("HDC1080", hdc1080::ADDRESS),
        shared.device("MS5637", ms5637::ADDRESS),
    )
}

/// Create the host UART and split it into the receive half and a shared
/// transmit half (used by both the echo path and the responses).
pub fn init_host_uart(
    uart1: esp_hal::peripherals::UART1<'static>,
    rx: esp_hal::peripherals::GPIO18<'static>,
    tx: esp_hal::peripherals::GPIO17<'static>,
) -> (UartRx<'static, Async>, &'static HostTx) {
    static HOST_TX: StaticCell<HostTx> = StaticCell::new();

    let uart = Uart::new(uart1, UartConfig::default().with_baudrate(UART_BAUD_RATE))
        .unwrap()
        .with_rx(rx)
        .with_tx(tx)
        .into_async();
    let (uart_rx, uart_tx) = uart.split();

    info!("Host UART ready at {} baud", UART_BAUD_RATE);

    (uart_rx, HOST_TX.init(Mutex::new(HostLink(uart_tx))))
}

/// Address switch block: four inputs with pull-ups, closed switch = low.
pub fn init_address_switches(
    bit0: esp_hal::peripherals::GPIO4<'static>,
    bit1: esp_hal::peripherals::GPIO5<'static>,
    bit2: esp_hal::peripherals::GPIO6<'static>,
    bit3: esp_hal::peripherals::GPIO7<'static>,
    fallback: DeviceAddress,
) -> SwitchAddress {
    let config = InputConfig::default().with_pull(Pull::Up);
    let pins = [
        Input::new(bit0, config),
        Input::new(bit1, config),
        Input::new(bit2, config),
        Input::new(bit3, config),
    ];

    BcdSwitchAddress::new(pins, true, fallback)
}
