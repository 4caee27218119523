//! Debounced signal mirror
//!
//! A proxy samples a source pin on one device and reproduces its level on a
//! destination pin facing the other device.
//!
//! Only the "on" edge is filtered. Entering "on" waits out `debounce_on_ms`
//! and any hold-off still running; leaving "on" is applied immediately and
//! starts a hold-off window during which a new "on" edge is deferred.
//!
//! ```text
//!              on edge, debounce > 0 or holding
//!   Idle ───────────────────────────────────────▶ PendingOn
//!    ▲  ◀──────────────────────────────────────── │
//!    │        timer expired: update(on_state)      │ off edge
//!    │                                             ▼
//!    └──────────── hold_off elapsed ──────────── Holding
//! ```
//!
//! `pending_on` and `holding` are independent flags: an "on" edge during a
//! hold-off is both.
//!
//! While suspended the destination value is still tracked but the pin is
//! floated, so it can be reasserted faithfully when the proxy resumes.

use heapless::String;
use tandem_hal::{FlexPin, PinMode};

use super::monitor::Monitor;
use super::{LineContext, Transition};
use crate::bridge::DeviceId;
use crate::config::{ProxyConfig, MAX_LABEL_LEN};
use crate::logic::LogicValue;

pub struct Proxy<P> {
    monitor: Monitor<P>,
    source_name: String<MAX_LABEL_LEN>,
    target_name: String<MAX_LABEL_LEN>,
    target_pin_number: u8,
    target: P,
    on_state: LogicValue,
    debounce_on_ms: u32,
    hold_off_ms: u32,
    invert: bool,
    sequences: Option<DeviceId>,
    /// Level the destination pin is (or would be, if suspended) driven to
    output: LogicValue,
    pending_on: bool,
    debounce_start_ms: u32,
    holding: bool,
    hold_start_ms: u32,
}

impl<P: FlexPin> Proxy<P> {
    /// Create a proxy from board configuration
    ///
    /// The source pin samples with the pull that reads "off" when
    /// disconnected.
    pub fn new(config: &ProxyConfig, source: P, target: P) -> Self {
        Self {
            monitor: Monitor::new(
                &config.name,
                config.source_pin,
                source,
                config.on_state.pull_for_on_state(),
            ),
            source_name: config.source_name.clone(),
            target_name: config.target_name.clone(),
            target_pin_number: config.target_pin,
            target,
            on_state: config.on_state,
            debounce_on_ms: config.debounce_on_ms,
            hold_off_ms: config.hold_off_ms,
            invert: config.invert,
            sequences: config.sequences,
            output: LogicValue::Unknown,
            pending_on: false,
            debounce_start_ms: 0,
            holding: false,
            hold_start_ms: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.monitor.name()
    }

    pub fn monitor(&self) -> &Monitor<P> {
        &self.monitor
    }

    /// Source pin, for injecting levels in tests and diagnostics
    pub fn source_pin_mut(&mut self) -> &mut P {
        self.monitor.pin_mut()
    }

    pub fn target_pin(&self) -> &P {
        &self.target
    }

    /// Destination value, `Unknown` until first determined
    pub fn output(&self) -> LogicValue {
        self.output
    }

    pub fn is_pending(&self) -> bool {
        self.pending_on
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    /// Level that keeps the downstream device "off"
    fn inactive_level(&self) -> LogicValue {
        (!self.on_state).inverted_if(self.invert)
    }

    /// Source level implied by the current destination value
    fn implied_source(&self) -> LogicValue {
        self.output.inverted_if(self.invert)
    }

    fn on_off(&self, value: LogicValue) -> &'static str {
        if value == self.on_state {
            "on"
        } else {
            "off"
        }
    }

    /// Drive the destination pin to the recorded output value
    fn drive(&mut self) {
        if let Some(high) = self.output.level() {
            self.target.set_state(high);
            self.target.set_mode(PinMode::Output);
        }
    }

    fn emit<C: LineContext>(&self, on: bool, ctx: &mut C) {
        if let Some(target) = self.sequences {
            ctx.emit(Transition { target, on });
        }
    }

    fn hold_inactive(&mut self) {
        let safe = self.inactive_level();
        self.target.set_state(safe == LogicValue::High);
        self.target.set_mode(PinMode::Output);
    }

    /// Hold the destination at its inactive level and prepare the source
    pub fn start(&mut self) {
        self.hold_inactive();
        self.monitor.start();
    }

    pub fn tick<C: LineContext>(&mut self, ctx: &mut C) {
        let now = ctx.now_ms();

        if self.holding && now.wrapping_sub(self.hold_start_ms) >= self.hold_off_ms {
            self.holding = false;
        }

        if self.pending_on
            && !self.holding
            && now.wrapping_sub(self.debounce_start_ms) >= self.debounce_on_ms
        {
            ctx.report_both();
            self.update(self.on_state, ctx);
            self.pending_on = false;
        }

        if let Some(value) = self.monitor.poll() {
            self.changed(value, ctx);
            self.monitor.commit(value);
        }
    }

    /// Handle a level change on the source pin
    pub fn changed<C: LineContext>(&mut self, value: LogicValue, ctx: &mut C) {
        ctx.report_both();

        if value == self.on_state {
            if self.debounce_on_ms > 0 {
                self.debounce_start_ms = ctx.now_ms();
                self.pending_on = true;
            } else if self.holding {
                self.pending_on = true;
            }

            if self.pending_on {
                self.log_state(value, ctx);
            } else {
                self.update(value, ctx);
            }
        } else {
            if self.hold_off_ms > 0 && self.output.is_known() {
                self.holding = true;
                self.hold_start_ms = ctx.now_ms();
            }

            self.pending_on = false;
            self.update(value, ctx);
        }
    }

    /// Mirror source level `value` onto the destination
    pub fn update<C: LineContext>(&mut self, value: LogicValue, ctx: &mut C) {
        let output = value.inverted_if(self.invert);

        if output == self.output {
            self.log_state(value, ctx);
            return;
        }

        let previous = self.output;
        self.output = output;

        if self.monitor.is_suspended() {
            log_trace!(
                ctx,
                self.monitor.name(),
                "Pin {} ({}) -> {} ({}): {} ({}) [suspended]",
                self.monitor.pin_number(),
                self.source_name,
                self.target_pin_number,
                self.target_name,
                self.on_off(value),
                value
            );
            return;
        }

        // The first determination is not driven here; activate() reconciles it
        if previous.is_known() {
            self.drive();
        }

        log_trace!(
            ctx,
            self.monitor.name(),
            "Pin {} ({}) -> {} ({}): {} ({})",
            self.monitor.pin_number(),
            self.source_name,
            self.target_pin_number,
            self.target_name,
            self.on_off(value),
            value
        );

        self.emit(value == self.on_state, ctx);
    }

    fn log_state<C: LineContext>(&self, value: LogicValue, ctx: &mut C) {
        log_trace!(
            ctx,
            self.monitor.name(),
            "Pin {} ({}): {} ({}){}{}",
            self.monitor.pin_number(),
            self.source_name,
            self.on_off(value),
            value,
            if self.pending_on && self.debounce_on_ms > 0 {
                " [debounce]"
            } else {
                ""
            },
            if self.holding { " [hold]" } else { "" }
        );
    }

    /// Resume sampling and reassert the destination recorded while suspended
    ///
    /// A destination that was never determined goes back to its inactive
    /// level. Does nothing if the proxy is already active.
    pub fn activate<C: LineContext>(&mut self, ctx: &mut C) {
        if !self.monitor.activate() {
            return;
        }

        if !self.output.is_known() {
            self.hold_inactive();
            return;
        }

        self.drive();
        if self.implied_source() == self.on_state {
            self.emit(true, ctx);
        }
    }

    /// Release the destination and stop sampling
    pub fn deactivate<C: LineContext>(&mut self, ctx: &mut C) {
        if self.implied_source() == self.on_state {
            self.emit(false, ctx);
        }

        self.target.set_mode(PinMode::FLOATING);
        self.monitor.deactivate();
    }
}
