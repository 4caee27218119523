//! Embassy async tasks

pub mod bridge;

pub use bridge::{bridge_task, FwBridge, TICK_INTERVAL_MS};
