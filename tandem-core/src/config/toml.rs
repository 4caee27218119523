//! Simple TOML parser for board configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! Tandem board files. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - `[console]` / `[amplifier]` device sections
//! - `[<device>.proxy.<name>]` and `[<device>.monitor.<name>]` line sections
//! - Comments (# ...)
//!
//! Pin strings follow the usual `"gpioN"` form with prefix modifiers:
//! `!` inverts a proxy, `^` pulls a monitor up.

use heapless::String as HString;
use tandem_hal::Pull;

use super::types::{
    label, BridgeConfig, DeviceConfig, MonitorConfig, ProxyConfig, MAX_LABEL_LEN,
};
use crate::bridge::DeviceId;
use crate::logic::LogicValue;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Too many items (exceeded heapless capacity)
    TooManyItems,
    /// Invalid pin string
    InvalidPin,
    /// A required pin was not given
    MissingPin,
}

/// Current parsing context
#[derive(Debug, Clone)]
enum Section {
    Root,
    Device(DeviceId),
    Proxy(DeviceId, HString<MAX_LABEL_LEN>),
    Monitor(DeviceId, HString<MAX_LABEL_LEN>),
}

/// Pin reference with modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PinSpec {
    pin: u8,
    inverted: bool,
    pull_up: bool,
}

/// Proxy section being built
struct ProxyDraft {
    config: ProxyConfig,
    source: Option<PinSpec>,
    target: Option<PinSpec>,
}

/// Monitor section being built
struct MonitorDraft {
    config: MonitorConfig,
    pin: Option<PinSpec>,
}

/// UART pins seen for one device
#[derive(Default, Clone, Copy)]
struct UartPins {
    tx: Option<u8>,
    rx: Option<u8>,
}

/// Parse TOML board configuration into a [`BridgeConfig`]
///
/// Both device sections must name their UART pins. The result is not
/// validated; call [`BridgeConfig::validate`] before building a bridge.
pub fn parse_config(input: &str) -> Result<BridgeConfig, ParseError> {
    let mut config = BridgeConfig::new(
        DeviceConfig::new(DeviceId::Console.as_str(), 0, 0),
        DeviceConfig::new(DeviceId::Amplifier.as_str(), 0, 0),
    );
    let mut uart = [UartPins::default(); 2];
    let mut section = Section::Root;

    let mut current_proxy: Option<ProxyDraft> = None;
    let mut current_monitor: Option<MonitorDraft> = None;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            save_section(&section, &mut config, &mut current_proxy, &mut current_monitor)?;

            section = parse_section_header(&line[1..line.len() - 1])?;

            match &section {
                Section::Proxy(_, name) => {
                    current_proxy = Some(ProxyDraft {
                        config: ProxyConfig::new(name, 0, 0),
                        source: None,
                        target: None,
                    });
                }
                Section::Monitor(_, name) => {
                    current_monitor = Some(MonitorDraft {
                        config: MonitorConfig::new(name, 0),
                        pin: None,
                    });
                }
                Section::Device(_) | Section::Root => {}
            }
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(
                &section,
                key,
                value,
                &mut config,
                &mut uart,
                &mut current_proxy,
                &mut current_monitor,
            )?;
        }
    }

    save_section(&section, &mut config, &mut current_proxy, &mut current_monitor)?;

    for id in DeviceId::ALL {
        let pins = uart[id.index()];
        let device = config.device_mut(id);
        device.tx_pin = pins.tx.ok_or(ParseError::MissingPin)?;
        device.rx_pin = pins.rx.ok_or(ParseError::MissingPin)?;
    }

    Ok(config)
}

/// Parse section header like "console", "console.proxy.detect" or
/// "amplifier.monitor.power"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let mut parts = header.trim().split('.');

    let device = parts.next().ok_or(ParseError::InvalidSection)?;
    let device = parse_device(device).map_err(|_| ParseError::InvalidSection)?;

    let kind = match parts.next() {
        Some(kind) => kind,
        None => return Ok(Section::Device(device)),
    };
    let name = parts.next().ok_or(ParseError::InvalidSection)?;
    if name.is_empty() || parts.next().is_some() {
        return Err(ParseError::InvalidSection);
    }
    let name = HString::try_from(name).map_err(|_| ParseError::InvalidSection)?;

    match kind {
        "proxy" => Ok(Section::Proxy(device, name)),
        "monitor" => Ok(Section::Monitor(device, name)),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = if let Some(hash_pos) = value.find('#') {
        // Make sure # is not inside a string
        let quote_count = value[..hash_pos].matches('"').count();
        if quote_count % 2 == 0 {
            value[..hash_pos].trim()
        } else {
            value
        }
    } else {
        value
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

fn parse_label(value: &str) -> HString<MAX_LABEL_LEN> {
    label(parse_string(value))
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a pin string like "gpio11", "!gpio12", "^gpio4"
fn parse_pin(value: &str) -> Result<PinSpec, ParseError> {
    let mut s = parse_string(value);
    let mut inverted = false;
    let mut pull_up = false;

    // Check for modifiers
    loop {
        if let Some(rest) = s.strip_prefix('!') {
            inverted = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('^') {
            pull_up = true;
            s = rest;
        } else {
            break;
        }
    }

    let number = s.strip_prefix("gpio").ok_or(ParseError::InvalidPin)?;
    let pin = number.parse().map_err(|_| ParseError::InvalidPin)?;

    Ok(PinSpec {
        pin,
        inverted,
        pull_up,
    })
}

/// Parse a UART pin, which takes no modifiers
fn parse_plain_pin(value: &str) -> Result<u8, ParseError> {
    let spec = parse_pin(value)?;
    if spec.inverted || spec.pull_up {
        return Err(ParseError::InvalidPin);
    }
    Ok(spec.pin)
}

fn parse_device(value: &str) -> Result<DeviceId, ParseError> {
    match parse_string(value) {
        "console" => Ok(DeviceId::Console),
        "amplifier" => Ok(DeviceId::Amplifier),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_on_state(value: &str) -> Result<LogicValue, ParseError> {
    match parse_string(value) {
        "high" | "HIGH" => Ok(LogicValue::High),
        "low" | "LOW" => Ok(LogicValue::Low),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_sequences(value: &str) -> Result<Option<DeviceId>, ParseError> {
    match parse_string(value) {
        "none" => Ok(None),
        other => parse_device(other).map(Some),
    }
}

fn parse_pull(value: &str) -> Result<Pull, ParseError> {
    match parse_string(value) {
        "up" => Ok(Pull::Up),
        "down" => Ok(Pull::Down),
        "none" => Ok(Pull::None),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Apply a parsed value to the appropriate config field
fn apply_value(
    section: &Section,
    key: &str,
    value: &str,
    config: &mut BridgeConfig,
    uart: &mut [UartPins; 2],
    current_proxy: &mut Option<ProxyDraft>,
    current_monitor: &mut Option<MonitorDraft>,
) -> Result<(), ParseError> {
    match section {
        Section::Root => {
            if key == "trace" {
                config.trace = parse_bool(value)?;
            }
        }
        Section::Device(id) => {
            let device = config.device_mut(*id);
            match key {
                "name" => device.name = parse_label(value),
                "tx" | "tx_pin" => uart[id.index()].tx = Some(parse_plain_pin(value)?),
                "rx" | "rx_pin" => uart[id.index()].rx = Some(parse_plain_pin(value)?),
                "wait_for_peer" => device.wait_for_peer = parse_bool(value)?,
                "powered" => device.powered = parse_bool(value)?,
                _ => {} // Ignore unknown keys
            }
        }
        Section::Proxy(..) => {
            let p = current_proxy.as_mut().ok_or(ParseError::InvalidSection)?;
            match key {
                "source" => p.source = Some(parse_pin(value)?),
                "target" => p.target = Some(parse_pin(value)?),
                "source_name" => p.config.source_name = parse_label(value),
                "target_name" => p.config.target_name = parse_label(value),
                "on_state" => p.config.on_state = parse_on_state(value)?,
                "debounce_on_ms" => p.config.debounce_on_ms = parse_int(value)?,
                "hold_off_ms" => p.config.hold_off_ms = parse_int(value)?,
                "invert" => p.config.invert = parse_bool(value)?,
                "sequences" => p.config.sequences = parse_sequences(value)?,
                _ => {}
            }
        }
        Section::Monitor(..) => {
            let m = current_monitor.as_mut().ok_or(ParseError::InvalidSection)?;
            match key {
                "pin" => m.pin = Some(parse_pin(value)?),
                "pull" => m.config.pull = parse_pull(value)?,
                _ => {}
            }
        }
    }

    Ok(())
}

/// Move a finished line section into its device
fn save_section(
    section: &Section,
    config: &mut BridgeConfig,
    current_proxy: &mut Option<ProxyDraft>,
    current_monitor: &mut Option<MonitorDraft>,
) -> Result<(), ParseError> {
    match section {
        Section::Proxy(id, _) => {
            if let Some(draft) = current_proxy.take() {
                let source = draft.source.ok_or(ParseError::MissingPin)?;
                let target = draft.target.ok_or(ParseError::MissingPin)?;
                if source.pull_up || target.pull_up {
                    // Proxy pulls follow on_state
                    return Err(ParseError::InvalidPin);
                }

                let mut proxy = draft.config;
                proxy.source_pin = source.pin;
                proxy.target_pin = target.pin;
                proxy.invert ^= source.inverted ^ target.inverted;

                config
                    .device_mut(*id)
                    .proxies
                    .push(proxy)
                    .map_err(|_| ParseError::TooManyItems)?;
            }
        }
        Section::Monitor(id, _) => {
            if let Some(draft) = current_monitor.take() {
                let pin = draft.pin.ok_or(ParseError::MissingPin)?;
                if pin.inverted {
                    return Err(ParseError::InvalidPin);
                }

                let mut monitor = draft.config;
                monitor.pin = pin.pin;
                if pin.pull_up {
                    monitor.pull = Pull::Up;
                }

                config
                    .device_mut(*id)
                    .monitors
                    .push(monitor)
                    .map_err(|_| ParseError::TooManyItems)?;
            }
        }
        Section::Device(_) | Section::Root => {}
    }

    Ok(())
}
