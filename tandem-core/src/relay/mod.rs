//! Serial relay
//!
//! Bytes received from either peer are forwarded to the other as they
//! arrive. A copy is kept per direction and flushed to the trace sink at
//! likely frame boundaries.

pub mod device;
pub mod frame;
pub mod port;

pub use device::Device;
pub use frame::{FlushReason, IDLE_FLUSH_MS, MAX_MESSAGE_LEN, SYNC_BYTE};
pub use port::{DeviceError, Port, PortStats};
