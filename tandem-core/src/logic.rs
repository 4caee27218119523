//! Tri-state logic level

use core::fmt;
use core::ops::Not;

use tandem_hal::Pull;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Logical level of a signal line
///
/// `Unknown` means the level has never been determined, which is distinct
/// from a line that is known but currently not driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LogicValue {
    #[default]
    Unknown,
    Low,
    High,
}

impl LogicValue {
    /// Electrical level, if known
    pub const fn level(self) -> Option<bool> {
        match self {
            LogicValue::Unknown => None,
            LogicValue::Low => Some(false),
            LogicValue::High => Some(true),
        }
    }

    /// Check if the value has been determined
    pub const fn is_known(self) -> bool {
        !matches!(self, LogicValue::Unknown)
    }

    /// Apply an optional inversion
    pub fn inverted_if(self, invert: bool) -> Self {
        if invert {
            !self
        } else {
            self
        }
    }

    /// Input pull that holds a line away from `self` when it is the "on" level
    ///
    /// An active-high input is pulled down and an active-low input is pulled
    /// up, so a disconnected source reads as "off".
    pub const fn pull_for_on_state(self) -> Pull {
        match self {
            LogicValue::High => Pull::Down,
            LogicValue::Low => Pull::Up,
            LogicValue::Unknown => Pull::None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LogicValue::Unknown => "UNKNOWN",
            LogicValue::Low => "LOW",
            LogicValue::High => "HIGH",
        }
    }
}

impl From<bool> for LogicValue {
    fn from(high: bool) -> Self {
        if high {
            LogicValue::High
        } else {
            LogicValue::Low
        }
    }
}

impl Not for LogicValue {
    type Output = LogicValue;

    fn not(self) -> Self::Output {
        match self {
            LogicValue::Unknown => LogicValue::Unknown,
            LogicValue::Low => LogicValue::High,
            LogicValue::High => LogicValue::Low,
        }
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
