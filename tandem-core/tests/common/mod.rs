//! Shared helpers for the integration tests

#![allow(dead_code)]

use core::fmt;

use tandem_core::config::{BridgeConfig, MAX_LINES};
use tandem_core::relay::Device;
use tandem_core::{Bridge, DeviceId, Level, TraceSink};
use tandem_hal::mock::{MockPin, MockSerial};

pub type TestDevice = Device<MockSerial, MockPin, MAX_LINES>;
pub type TestBridge = Bridge<MockSerial, MockPin, MAX_LINES>;

/// Sink that keeps every line
#[derive(Default)]
pub struct LogSink {
    pub lines: Vec<(Level, String, String)>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages attributed to `source`
    pub fn by_source(&self, source: &str) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(_, s, _)| s == source)
            .map(|(_, _, m)| m.as_str())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, _, m)| m.contains(needle))
    }
}

impl TraceSink for LogSink {
    fn enabled(&self, _level: Level) -> bool {
        true
    }

    fn write(&mut self, level: Level, source: &str, args: fmt::Arguments<'_>) {
        self.lines.push((level, source.to_string(), args.to_string()));
    }
}

/// Hex dump lines the relay is expected to produce for one flushed buffer
pub fn dump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(24)
        .map(|chunk| {
            chunk
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Build a device whose pins are fresh mocks
pub fn device(id: DeviceId, config: &BridgeConfig) -> TestDevice {
    Device::from_config(id, config.device(id), MockSerial::new(), |n| {
        Some(MockPin::new(n))
    })
    .expect("device")
}

/// Build a bridge, handing out each GPIO at most once
pub fn bridge(config: &BridgeConfig) -> TestBridge {
    let mut taken = Vec::new();
    let mut take = |n: u8| {
        if taken.contains(&n) {
            None
        } else {
            taken.push(n);
            Some(MockPin::new(n))
        }
    };

    let console = Device::from_config(
        DeviceId::Console,
        &config.console,
        MockSerial::new(),
        &mut take,
    )
    .expect("console");
    let amplifier = Device::from_config(
        DeviceId::Amplifier,
        &config.amplifier,
        MockSerial::new(),
        &mut take,
    )
    .expect("amplifier");

    Bridge::new(config, console, amplifier)
}
