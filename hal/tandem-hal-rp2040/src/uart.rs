//! Buffered UART transports
//!
//! RP2040 has two UART peripherals (UART0 and UART1). Each bridged peer gets
//! one, wrapped so the bridge tick can poll it without blocking: received
//! bytes are staged by [`RpSerial::service`] and transmitted bytes are
//! queued until the next service call.

use core::task::Poll;

use embassy_futures::poll_once;
use embassy_rp::uart::{self, BufferedUart};
use embedded_io::{Read, ReadReady};
use embedded_io_async::Write;
use heapless::Deque;
use tandem_hal::uart::{DataBits, Parity, StopBits};
use tandem_hal::{SerialPort, UartConfig};

/// Bytes staged per direction between service calls
pub const STAGING: usize = 64;

/// UART peripheral identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartId {
    Uart0,
    Uart1,
}

/// Determine which UART can use a given GPIO pin
///
/// RP2040 has specific pin mappings for each UART.
pub fn gpio_to_uart(gpio: u8) -> Option<UartId> {
    // UART0: GPIO 0/1, 12/13, 16/17, 28/29
    // UART1: GPIO 4/5, 8/9, 20/21, 24/25
    match gpio {
        0 | 1 | 12 | 13 | 16 | 17 | 28 | 29 => Some(UartId::Uart0),
        4 | 5 | 8 | 9 | 20 | 21 | 24 | 25 => Some(UartId::Uart1),
        _ => None,
    }
}

/// Transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Line settings the peripheral was not built with
    Unsupported,
    /// Port is closed
    Closed,
    /// Transmit staging is full
    Full,
    /// Driver error
    Uart(uart::Error),
}

impl From<uart::Error> for SerialError {
    fn from(e: uart::Error) -> Self {
        SerialError::Uart(e)
    }
}

/// Convert bridge line settings to the embassy driver configuration
pub fn rp_config(line: &UartConfig) -> Result<uart::Config, SerialError> {
    let mut cfg = uart::Config::default();
    cfg.baudrate = line.baudrate;
    cfg.data_bits = match line.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
        DataBits::Nine => return Err(SerialError::Unsupported),
    };
    cfg.parity = match line.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    cfg.stop_bits = match line.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    Ok(cfg)
}

/// Polled transport over an interrupt-driven buffered UART
pub struct RpSerial {
    uart: BufferedUart,
    /// Settings the peripheral was built with
    line: UartConfig,
    open: bool,
    rx: Deque<u8, STAGING>,
    tx: Deque<u8, STAGING>,
}

impl RpSerial {
    pub fn new(uart: BufferedUart, line: UartConfig) -> Self {
        Self {
            uart,
            line,
            open: false,
            rx: Deque::new(),
            tx: Deque::new(),
        }
    }

    /// Move queued bytes out to the driver and received bytes into staging
    ///
    /// While the port is closed, received bytes are read and dropped. Bytes
    /// the driver's transmit ring cannot take stay staged for the next call.
    pub fn service(&mut self) -> Result<(), SerialError> {
        while !self.tx.is_empty() {
            let (front, _) = self.tx.as_slices();
            let written = match poll_once(self.uart.write(front)) {
                Poll::Ready(result) => result?,
                Poll::Pending => break,
            };
            for _ in 0..written {
                self.tx.pop_front();
            }
        }

        let mut buf = [0u8; 16];
        while self.uart.read_ready()? {
            let room = if self.open {
                (STAGING - self.rx.len()).min(buf.len())
            } else {
                buf.len()
            };
            if room == 0 {
                break;
            }
            let n = self.uart.read(&mut buf[..room])?;
            if self.open {
                for &byte in &buf[..n] {
                    let _ = self.rx.push_back(byte);
                }
            }
        }
        Ok(())
    }

    fn discard_received(&mut self) -> Result<(), SerialError> {
        let mut buf = [0u8; 16];
        while self.uart.read_ready()? {
            self.uart.read(&mut buf)?;
        }
        self.rx.clear();
        Ok(())
    }
}

impl SerialPort for RpSerial {
    type Error = SerialError;

    fn open(&mut self, config: &UartConfig) -> Result<(), SerialError> {
        if *config != self.line {
            return Err(SerialError::Unsupported);
        }
        self.discard_received()?;
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.rx.clear();
        self.tx.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_available(&self) -> usize {
        if self.open {
            self.rx.len()
        } else {
            0
        }
    }

    fn write_available(&self) -> usize {
        if self.open {
            STAGING - self.tx.len()
        } else {
            0
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        if !self.open {
            return None;
        }
        self.rx.pop_front()
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SerialError> {
        if !self.open {
            return Err(SerialError::Closed);
        }
        self.tx.push_back(byte).map_err(|_| SerialError::Full)
    }
}
