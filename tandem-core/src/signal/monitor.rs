//! Level-change detector for one input pin

use heapless::String;
use tandem_hal::{FlexPin, PinMode, Pull};

use super::LineContext;
use crate::config::{label, MonitorConfig, MAX_LABEL_LEN};
use crate::logic::LogicValue;

/// Samples one input pin per tick and reports level changes
pub struct Monitor<P> {
    name: String<MAX_LABEL_LEN>,
    pin_number: u8,
    pin: P,
    pull: Pull,
    /// Last observed level
    value: LogicValue,
    suspended: bool,
}

impl<P: FlexPin> Monitor<P> {
    /// Create a monitor; it samples with `pull` enabled while active
    pub fn new(name: &str, pin_number: u8, pin: P, pull: Pull) -> Self {
        Self {
            name: label(name),
            pin_number,
            pin,
            pull,
            value: LogicValue::Unknown,
            suspended: false,
        }
    }

    /// Create a plain monitor from board configuration
    pub fn from_config(config: &MonitorConfig, pin: P) -> Self {
        Self::new(&config.name, config.pin, pin, config.pull)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pin_number(&self) -> u8 {
        self.pin_number
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }

    /// Last observed level
    pub fn value(&self) -> LogicValue {
        self.value
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Mode the pin should be in for the current suspension state
    fn sampling_mode(&self) -> PinMode {
        if self.suspended {
            PinMode::FLOATING
        } else {
            PinMode::Input(self.pull)
        }
    }

    /// Configure the pin for first use
    pub fn start(&mut self) {
        let mode = self.sampling_mode();
        self.pin.set_mode(mode);
    }

    /// Sample the pin, returning the new level if it changed
    ///
    /// The observed level is not updated here; callers handle the change
    /// first and then [`commit`](Self::commit) it.
    pub fn poll(&self) -> Option<LogicValue> {
        if self.suspended {
            return None;
        }

        let value = LogicValue::from(self.pin.is_high());
        (value != self.value).then_some(value)
    }

    /// Record `value` as the last observed level
    pub fn commit(&mut self, value: LogicValue) {
        self.value = value;
    }

    /// Default change handling: order against serial traffic, then trace
    pub fn changed<C: LineContext>(&mut self, value: LogicValue, ctx: &mut C) {
        ctx.report_both();
        log_trace!(ctx, &self.name, "Pin {}: {}", self.pin_number, value);
    }

    pub fn tick<C: LineContext>(&mut self, ctx: &mut C) {
        if let Some(value) = self.poll() {
            self.changed(value, ctx);
            self.commit(value);
        }
    }

    /// Resume sampling. Returns false if already active.
    pub fn activate(&mut self) -> bool {
        if !self.suspended {
            return false;
        }

        self.suspended = false;
        let mode = self.sampling_mode();
        self.pin.set_mode(mode);
        true
    }

    /// Float the pin and stop sampling. Returns false if already suspended.
    pub fn deactivate(&mut self) -> bool {
        if self.suspended {
            return false;
        }

        self.suspended = true;
        self.pin.set_mode(PinMode::FLOATING);
        true
    }
}
