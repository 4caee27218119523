//! Configuration type definitions
//!
//! These types describe one bridge board: which UART pins face each peer,
//! whether that peer starts powered, and the signal lines attached to it.

use heapless::{FnvIndexSet, String, Vec};
use tandem_hal::Pull;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bridge::DeviceId;
use crate::logic::LogicValue;

/// Maximum label length
pub const MAX_LABEL_LEN: usize = 16;

/// Maximum plain monitors per device
pub const MAX_MONITORS: usize = 4;

/// Maximum proxies per device
pub const MAX_PROXIES: usize = 4;

/// Maximum signal lines per device
pub const MAX_LINES: usize = MAX_MONITORS + MAX_PROXIES;

/// Build a label, truncating at [`MAX_LABEL_LEN`]
pub fn label(name: &str) -> String<MAX_LABEL_LEN> {
    let mut label = String::new();
    for c in name.chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

/// Configuration validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// GPIO claimed by more than one function
    PinConflict(u8),
    /// A proxy sequences the device it is attached to, so it could never
    /// power that device back up
    SelfSequencing(DeviceId),
}

/// Plain input monitor
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorConfig {
    pub name: String<MAX_LABEL_LEN>,
    /// GPIO number
    pub pin: u8,
    /// Pull applied while sampling
    pub pull: Pull,
}

impl MonitorConfig {
    pub fn new(name: &str, pin: u8) -> Self {
        Self {
            name: label(name),
            pin,
            pull: Pull::None,
        }
    }
}

/// Signal mirrored from this device's side onto the peer's side
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProxyConfig {
    /// Line name used in diagnostics
    pub name: String<MAX_LABEL_LEN>,
    /// Signal name on the source side (e.g. "DETECT")
    pub source_name: String<MAX_LABEL_LEN>,
    pub source_pin: u8,
    /// Signal name on the destination side
    pub target_name: String<MAX_LABEL_LEN>,
    pub target_pin: u8,
    /// Source level that means "on"
    pub on_state: LogicValue,
    /// How long an "on" level must persist before it is mirrored
    pub debounce_on_ms: u32,
    /// Cooldown after leaving "on" during which "on" is deferred
    pub hold_off_ms: u32,
    /// Drive the destination at the opposite level of the source
    pub invert: bool,
    /// Device powered up and down with this signal
    pub sequences: Option<DeviceId>,
}

impl ProxyConfig {
    /// Active-high proxy without filtering or sequencing
    pub fn new(name: &str, source_pin: u8, target_pin: u8) -> Self {
        Self {
            name: label(name),
            source_name: label(name),
            source_pin,
            target_name: label(name),
            target_pin,
            on_state: LogicValue::High,
            debounce_on_ms: 0,
            hold_off_ms: 0,
            invert: false,
            sequences: None,
        }
    }
}

/// One serial peer and the lines attached to it
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    pub name: String<MAX_LABEL_LEN>,
    /// UART TX GPIO
    pub tx_pin: u8,
    /// UART RX GPIO
    pub rx_pin: u8,
    /// After activation, hold back bytes from this device until the peer
    /// has sent something to it
    pub wait_for_peer: bool,
    /// Activate the device at start instead of waiting for a proxy
    pub powered: bool,
    pub monitors: Vec<MonitorConfig, MAX_MONITORS>,
    pub proxies: Vec<ProxyConfig, MAX_PROXIES>,
}

impl DeviceConfig {
    pub fn new(name: &str, tx_pin: u8, rx_pin: u8) -> Self {
        Self {
            name: label(name),
            tx_pin,
            rx_pin,
            wait_for_peer: false,
            powered: true,
            monitors: Vec::new(),
            proxies: Vec::new(),
        }
    }

    /// Total number of signal lines
    pub fn line_count(&self) -> usize {
        self.monitors.len() + self.proxies.len()
    }
}

/// Complete board configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeConfig {
    /// Start with trace-level diagnostics enabled
    pub trace: bool,
    pub console: DeviceConfig,
    pub amplifier: DeviceConfig,
}

impl BridgeConfig {
    pub fn new(console: DeviceConfig, amplifier: DeviceConfig) -> Self {
        Self {
            trace: false,
            console,
            amplifier,
        }
    }

    pub fn device(&self, id: DeviceId) -> &DeviceConfig {
        match id {
            DeviceId::Console => &self.console,
            DeviceId::Amplifier => &self.amplifier,
        }
    }

    pub fn device_mut(&mut self, id: DeviceId) -> &mut DeviceConfig {
        match id {
            DeviceId::Console => &mut self.console,
            DeviceId::Amplifier => &mut self.amplifier,
        }
    }

    /// Check that every GPIO has one owner and every sequencing link is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut allocated: FnvIndexSet<u8, 64> = FnvIndexSet::new();
        let mut claim = |pin: u8| -> Result<(), ConfigError> {
            match allocated.insert(pin) {
                Ok(true) => Ok(()),
                _ => Err(ConfigError::PinConflict(pin)),
            }
        };

        for id in DeviceId::ALL {
            let device = self.device(id);
            claim(device.tx_pin)?;
            claim(device.rx_pin)?;

            for monitor in &device.monitors {
                claim(monitor.pin)?;
            }

            for proxy in &device.proxies {
                claim(proxy.source_pin)?;
                claim(proxy.target_pin)?;

                if proxy.sequences == Some(id) {
                    return Err(ConfigError::SelfSequencing(id));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BridgeConfig {
        let mut console = DeviceConfig::new("console", 0, 1);
        let mut detect = ProxyConfig::new("detect", 2, 6);
        detect.sequences = Some(DeviceId::Amplifier);
        console.proxies.push(detect).unwrap();
        console.monitors.push(MonitorConfig::new("power", 8)).unwrap();

        let mut amplifier = DeviceConfig::new("amplifier", 4, 5);
        amplifier.powered = false;
        amplifier
            .proxies
            .push(ProxyConfig::new("announce", 7, 3))
            .unwrap();

        BridgeConfig::new(console, amplifier)
    }

    #[test]
    fn test_valid_board() {
        let config = board();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.device(DeviceId::Console).line_count(), 2);
    }

    #[test]
    fn test_pin_conflict() {
        let mut config = board();
        config.amplifier.monitors.push(MonitorConfig::new("dup", 6)).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::PinConflict(6)));
    }

    #[test]
    fn test_uart_pin_conflict() {
        let mut config = board();
        config.amplifier.rx_pin = 0;
        assert_eq!(config.validate(), Err(ConfigError::PinConflict(0)));
    }

    #[test]
    fn test_self_sequencing_rejected() {
        let mut config = board();
        config.console.proxies[0].sequences = Some(DeviceId::Console);
        assert_eq!(
            config.validate(),
            Err(ConfigError::SelfSequencing(DeviceId::Console))
        );
    }

    #[test]
    fn test_label_truncation() {
        assert_eq!(label("short").as_str(), "short");
        assert_eq!(label("abcdefghijklmnopqrstuvwxyz").len(), MAX_LABEL_LEN);
    }
}
