//! Board-agnostic core logic for the Tandem serial bridge
//!
//! This crate contains all bridge logic that does not depend on specific
//! hardware implementations:
//!
//! - Byte relay between the console and amplifier, with frame-aware
//!   diagnostic flushing
//! - Signal monitors and debounced proxies
//! - Power sequencing between the two devices
//! - Board configuration types and parser

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
pub mod trace;

pub mod bridge;
pub mod config;
pub mod logic;
pub mod relay;
pub mod signal;

pub use bridge::{Bridge, DeviceId};
pub use logic::LogicValue;
pub use trace::{Level, TraceSink};
