//! Tandem - console/amplifier serial bridge firmware
//!
//! Main firmware binary for RP2040-based bridge boards. The board file
//! (`board.toml`) is compiled in and describes which lines are mirrored
//! between the two sides and which device is powered by which signal.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{UART0, UART1};
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use tandem_core::config::{
    parse_config, BridgeConfig, DeviceConfig, MonitorConfig, ProxyConfig,
};
use tandem_core::relay::{Device, DeviceError};
use tandem_core::{Bridge, DeviceId, LogicValue};
use tandem_hal::{Pull, UartConfig};
use tandem_hal_rp2040::uart::rp_config;
use tandem_hal_rp2040::{gpio_to_uart, PinBank, RpPin, RpSerial, UartId};

use crate::tasks::FwBridge;

/// Embedded board description (compiled into firmware)
/// Edit board.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../board.toml");

/// GPIOs wired to each UART (TX, RX)
const CONSOLE_UART_PINS: (u8, u8) = (0, 1);
const AMPLIFIER_UART_PINS: (u8, u8) = (4, 5);

mod tasks;
mod trace;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

// Static cells for UART buffers (must live forever)
static CONSOLE_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static CONSOLE_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static AMPLIFIER_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static AMPLIFIER_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Tandem firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    trace::set_trace(config.trace);

    let (mut bank, r) = PinBank::from_peripherals(p);

    // Both peers run the same line settings
    let line = UartConfig::BRIDGE;
    let uart_config = match rp_config(&line) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Unsupported bridge line settings: {:?}", e);
            loop {
                embassy_time::Timer::after_secs(60).await;
            }
        }
    };

    let console_uart = BufferedUart::new(
        r.uart0,
        r.uart0_tx,
        r.uart0_rx,
        Irqs,
        CONSOLE_TX_BUF.init([0u8; 256]),
        CONSOLE_RX_BUF.init([0u8; 256]),
        uart_config,
    );
    let amplifier_uart = BufferedUart::new(
        r.uart1,
        r.uart1_tx,
        r.uart1_rx,
        Irqs,
        AMPLIFIER_TX_BUF.init([0u8; 256]),
        AMPLIFIER_RX_BUF.init([0u8; 256]),
        uart_config,
    );
    info!("UARTs initialized");

    let bridge = match build_bridge(
        &config,
        &mut bank,
        RpSerial::new(console_uart, line),
        RpSerial::new(amplifier_uart, line),
    ) {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Failed to build bridge: {:?}", e);
            loop {
                embassy_time::Timer::after_secs(60).await;
            }
        }
    };
    info!(
        "Bridge configured: console {} lines, amplifier {} lines",
        config.console.line_count(),
        config.amplifier.line_count()
    );

    spawner.spawn(tasks::bridge_task(bridge)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Build both devices, claiming their line pins from the bank
fn build_bridge(
    config: &BridgeConfig,
    bank: &mut PinBank,
    console: RpSerial,
    amplifier: RpSerial,
) -> Result<FwBridge, DeviceError> {
    let mut take = |n: u8| -> Option<RpPin> {
        match bank.take_flex(n) {
            Ok(pin) => Some(pin),
            Err(e) => {
                warn!("GPIO{} unavailable: {:?}", n, e);
                None
            }
        }
    };

    let console = Device::from_config(DeviceId::Console, &config.console, console, &mut take)?;
    let amplifier =
        Device::from_config(DeviceId::Amplifier, &config.amplifier, amplifier, &mut take)?;

    Ok(Bridge::new(config, console, amplifier))
}

/// Parse and validate the embedded board file
///
/// Falls back to the compiled-in default board if the file does not parse,
/// fails validation, or puts a device on UART pins this board does not wire.
fn load_config() -> BridgeConfig {
    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to parse board file: {:?}", e);
            return fallback_config();
        }
    };

    if let Err(e) = config.validate() {
        error!("Invalid board file: {:?}", e);
        return fallback_config();
    }

    if !uart_pins_match(&config.console, CONSOLE_UART_PINS, UartId::Uart0)
        || !uart_pins_match(&config.amplifier, AMPLIFIER_UART_PINS, UartId::Uart1)
    {
        error!("Board file UART pins do not match the hardware");
        return fallback_config();
    }

    info!("Parsed embedded board file successfully");
    config
}

fn uart_pins_match(device: &DeviceConfig, wired: (u8, u8), uart: UartId) -> bool {
    (device.tx_pin, device.rx_pin) == wired
        && gpio_to_uart(device.tx_pin) == Some(uart)
        && gpio_to_uart(device.rx_pin) == Some(uart)
}

/// Minimal board used if the embedded board file is broken
///
/// Console DETECT powers the amplifier; the amplifier's announce line is
/// mirrored back to the console.
fn fallback_config() -> BridgeConfig {
    let mut console = DeviceConfig::new(
        DeviceId::Console.as_str(),
        CONSOLE_UART_PINS.0,
        CONSOLE_UART_PINS.1,
    );
    let mut detect = ProxyConfig::new("detect", 2, 6);
    detect.debounce_on_ms = 100;
    detect.hold_off_ms = 500;
    detect.sequences = Some(DeviceId::Amplifier);
    let _ = console.proxies.push(detect);

    let mut power = MonitorConfig::new("power", 8);
    power.pull = Pull::Up;
    let _ = console.monitors.push(power);

    let mut amplifier = DeviceConfig::new(
        DeviceId::Amplifier.as_str(),
        AMPLIFIER_UART_PINS.0,
        AMPLIFIER_UART_PINS.1,
    );
    amplifier.wait_for_peer = true;
    amplifier.powered = false;
    let mut announce = ProxyConfig::new("announce", 7, 3);
    announce.on_state = LogicValue::Low;
    announce.invert = true;
    let _ = amplifier.proxies.push(announce);

    BridgeConfig::new(console, amplifier)
}
