//! Tandem Hardware Abstraction Layer
//!
//! This crate defines hardware abstraction traits that can be implemented
//! by chip-specific HALs. The bridge core only ever talks to these traits,
//! so the same relay and signal logic runs on the RP2040 and on the host
//! test doubles.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (tandem-firmware)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tandem-core (relay, signal proxies)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tandem-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!         │                       │
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ tandem-hal-   │       │ mock (host    │
//! │    rp2040     │       │   tests)      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`], [`gpio::ModePin`] - Digital I/O
//! - [`uart::SerialPort`] - Non-blocking byte transport

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod gpio;
#[cfg(feature = "mock")]
pub mod mock;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::{FlexPin, InputPin, ModePin, OutputPin, PinMode, Pull};
pub use uart::{SerialPort, UartConfig};
