//! RP2040-specific HAL for the Tandem serial bridge
//!
//! This crate provides RP2040 implementations of the shared `tandem-hal`
//! traits, plus the RP2040-specific plumbing the firmware needs:
//!
//! - Dynamic pin allocation for config-driven line setup
//! - Flex pins that sample, drive and float at runtime
//! - Buffered UART transports and UART pin mapping

#![no_std]

pub mod pins;
pub mod uart;

pub use pins::{PinBank, PinError, RemainingPeripherals, RpPin};
pub use uart::{gpio_to_uart, RpSerial, SerialError, UartId};

// Re-export shared traits from tandem-hal for convenience
pub use tandem_hal::{FlexPin, SerialPort};
