//! Digital signal lines
//!
//! A line either just watches an input pin ([`Monitor`]) or mirrors it onto
//! an output pin with debounce and hold-off policy ([`Proxy`]). Lines are
//! driven once per tick by the [`Device`](crate::relay::Device) they belong
//! to, through a [`LineContext`] that gives them the tick time, a way to
//! order their diagnostics against in-flight serial traffic, and an outlet
//! for power sequencing transitions.

pub mod monitor;
pub mod proxy;

pub use monitor::Monitor;
pub use proxy::Proxy;

use heapless::Deque;
use tandem_hal::FlexPin;

use crate::bridge::DeviceId;
use crate::config::MAX_LINES;
use crate::trace::TraceSink;

/// Transitions that can be queued between two dispatches
pub const TRANSITION_CAPACITY: usize = 2 * MAX_LINES;

/// Pending power sequencing requests, oldest first
pub type TransitionQueue = Deque<Transition, TRANSITION_CAPACITY>;

/// Power sequencing request raised by a proxy
///
/// Replaces a callback: the proxy records what happened and the
/// [`Bridge`](crate::bridge::Bridge) decides what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    /// Device whose power state follows the proxy
    pub target: DeviceId,
    /// The proxy's source entered (true) or left (false) its "on" state
    pub on: bool,
}

/// Services a line needs from whoever is ticking it
pub trait LineContext: TraceSink {
    /// Monotonic milliseconds sampled at tick entry
    fn now_ms(&self) -> u32;

    /// Flush buffered serial traffic on both sides of the owning device
    fn report_both(&mut self);

    /// Queue a power sequencing transition
    fn emit(&mut self, transition: Transition);
}

/// A monitored line attached to a device
pub enum SignalLine<P> {
    Monitor(Monitor<P>),
    Proxy(Proxy<P>),
}

impl<P: FlexPin> SignalLine<P> {
    /// Name used to attribute diagnostics
    pub fn name(&self) -> &str {
        match self {
            SignalLine::Monitor(monitor) => monitor.name(),
            SignalLine::Proxy(proxy) => proxy.name(),
        }
    }

    /// Configure pins for first use
    pub fn start(&mut self) {
        match self {
            SignalLine::Monitor(monitor) => monitor.start(),
            SignalLine::Proxy(proxy) => proxy.start(),
        }
    }

    /// Run one tick of sampling and timers
    pub fn tick<C: LineContext>(&mut self, ctx: &mut C) {
        match self {
            SignalLine::Monitor(monitor) => monitor.tick(ctx),
            SignalLine::Proxy(proxy) => proxy.tick(ctx),
        }
    }

    /// Resume sampling (and driving, for a proxy)
    pub fn activate<C: LineContext>(&mut self, ctx: &mut C) {
        log_debug!(ctx, self.name(), "Resume");
        match self {
            SignalLine::Monitor(monitor) => {
                monitor.activate();
            }
            SignalLine::Proxy(proxy) => proxy.activate(ctx),
        }
    }

    /// Stop sampling and float any driven output
    pub fn deactivate<C: LineContext>(&mut self, ctx: &mut C) {
        log_debug!(ctx, self.name(), "Suspend");
        match self {
            SignalLine::Monitor(monitor) => {
                monitor.deactivate();
            }
            SignalLine::Proxy(proxy) => proxy.deactivate(ctx),
        }
    }

    pub fn is_suspended(&self) -> bool {
        match self {
            SignalLine::Monitor(monitor) => monitor.is_suspended(),
            SignalLine::Proxy(proxy) => proxy.monitor().is_suspended(),
        }
    }

    pub fn as_monitor(&self) -> Option<&Monitor<P>> {
        match self {
            SignalLine::Monitor(monitor) => Some(monitor),
            SignalLine::Proxy(_) => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy<P>> {
        match self {
            SignalLine::Monitor(_) => None,
            SignalLine::Proxy(proxy) => Some(proxy),
        }
    }

    pub fn as_monitor_mut(&mut self) -> Option<&mut Monitor<P>> {
        match self {
            SignalLine::Monitor(monitor) => Some(monitor),
            SignalLine::Proxy(_) => None,
        }
    }

    pub fn as_proxy_mut(&mut self) -> Option<&mut Proxy<P>> {
        match self {
            SignalLine::Monitor(_) => None,
            SignalLine::Proxy(proxy) => Some(proxy),
        }
    }
}

impl<P> From<Monitor<P>> for SignalLine<P> {
    fn from(monitor: Monitor<P>) -> Self {
        SignalLine::Monitor(monitor)
    }
}

impl<P> From<Proxy<P>> for SignalLine<P> {
    fn from(proxy: Proxy<P>) -> Self {
        SignalLine::Proxy(proxy)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use core::fmt;
    use std::vec::Vec;

    use super::*;
    use crate::trace::testing::RecordingSink;
    use crate::trace::Level;

    /// Line context with a hand-driven clock
    pub struct TestContext {
        pub now_ms: u32,
        pub reports: u32,
        pub transitions: Vec<Transition>,
        pub sink: RecordingSink,
    }

    impl TestContext {
        pub fn new() -> Self {
            Self {
                now_ms: 0,
                reports: 0,
                transitions: Vec::new(),
                sink: RecordingSink::new(),
            }
        }

        pub fn at(&mut self, now_ms: u32) -> &mut Self {
            self.now_ms = now_ms;
            self
        }
    }

    impl TraceSink for TestContext {
        fn enabled(&self, level: Level) -> bool {
            self.sink.enabled(level)
        }

        fn write(&mut self, level: Level, source: &str, args: fmt::Arguments<'_>) {
            self.sink.write(level, source, args)
        }
    }

    impl LineContext for TestContext {
        fn now_ms(&self) -> u32 {
            self.now_ms
        }

        fn report_both(&mut self) {
            self.reports += 1;
        }

        fn emit(&mut self, transition: Transition) {
            self.transitions.push(transition);
        }
    }
}
