#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embedded_io_async::Write;
use esp_hal::Async;
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::UartRx;
use log::{error, info, warn};
use rhtp_core::SharedLineAssembler;
use rhtp_core::response::LockedWriter;
use rhtp_firmware::app_state::{
    HostTx, build_dispatcher, create_i2c_bus, device_config, init_address_switches,
    init_host_uart, init_sensors, share_i2c_bus,
};
use static_cell::StaticCell;

/// Bytes taken from the UART FIFO per read.
const RX_CHUNK: usize = 32;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Feeds received bytes into the line assembler and echoes them if enabled.
#[embassy_executor::task]
async fn uart_receive(
    mut rx: UartRx<'static, Async>,
    tx: &'static HostTx,
    assembler: &'static SharedLineAssembler,
) {
    let mut link = LockedWriter::new(tx);
    let mut buf = [0u8; RX_CHUNK];
    loop {
        let n = match rx.read_async(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("UART receive error: {:?}", e);
                continue;
            }
        };

        for &byte in &buf[..n] {
            let echo = assembler.process_received_byte(byte);
            if echo.as_bytes().is_empty() {
                continue;
            }
            if let Err(e) = link.write_all(echo.as_bytes()).await {
                warn!("Echo failed: {:?}", e);
            }
        }
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let config = device_config();
    info!(
        "RHTP node starting (default address {}, local echo {})",
        config.address, config.local_echo
    );

    let address = init_address_switches(
        peripherals.GPIO4,
        peripherals.GPIO5,
        peripherals.GPIO6,
        peripherals.GPIO7,
        config.address,
    );

    let i2c = create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11);
    let (hdc1080_i2c, ms5637_i2c) = share_i2c_bus(i2c);
    let (hdc1080, ms5637) = init_sensors(hdc1080_i2c, ms5637_i2c).await;
    let mut dispatcher = build_dispatcher(address, hdc1080, ms5637, &config);

    static ASSEMBLER: StaticCell<SharedLineAssembler> = StaticCell::new();
    let assembler: &'static SharedLineAssembler =
        ASSEMBLER.init(SharedLineAssembler::new(config.local_echo));

    let (rx, tx) = init_host_uart(peripherals.UART1, peripherals.GPIO18, peripherals.GPIO17);
    spawner.spawn(
        uart_receive(rx, tx, assembler).expect("UART receive task is spawned exactly once"),
    );

    info!("Waiting for requests");

    // One lock per response line, echo from the receive task fits in between.
    let mut link = LockedWriter::new(tx);
    loop {
        let line = assembler.wait_line().await;
        if let Err(e) = dispatcher.dispatch(&line, &mut link).await {
            error!("Response not sent: {}", e);
        }
    }
}
