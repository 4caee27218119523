//! Configuration types
//!
//! Board-agnostic configuration structures, parsed at boot from the board
//! description the firmware embeds.

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::*;
