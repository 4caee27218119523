//! Relay engine for one peer device
//!
//! Each tick a device first runs its signal lines, then (if active) moves
//! every byte its transport has received to the peer's transport. A copy of
//! the bytes is buffered so diagnostics can show them as whole frames.

use core::fmt;

use heapless::Vec;
use tandem_hal::{FlexPin, SerialPort};

use super::frame::{self, FlushReason, IDLE_FLUSH_MS};
use super::port::{DeviceError, Port, PortStats};
use crate::bridge::DeviceId;
use crate::config::DeviceConfig;
use crate::signal::{LineContext, Monitor, Proxy, SignalLine, Transition, TransitionQueue};
use crate::trace::{Level, TraceSink};

/// One serial peer: its port and the signal lines sampled on its side
pub struct Device<U, P, const N: usize> {
    port: Port<U>,
    lines: Vec<SignalLine<P>, N>,
}

/// What a line sees while its device is being ticked
struct DeviceContext<'a, U, S> {
    now_ms: u32,
    own: &'a mut Port<U>,
    peer: &'a mut Port<U>,
    sink: &'a mut S,
    transitions: &'a mut TransitionQueue,
}

impl<U, S: TraceSink> TraceSink for DeviceContext<'_, U, S> {
    fn enabled(&self, level: Level) -> bool {
        self.sink.enabled(level)
    }

    fn write(&mut self, level: Level, source: &str, args: fmt::Arguments<'_>) {
        self.sink.write(level, source, args)
    }
}

impl<U: SerialPort, S: TraceSink> LineContext for DeviceContext<'_, U, S> {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }

    fn report_both(&mut self) {
        self.peer.report(FlushReason::PinChange, &mut *self.sink);
        self.own.report(FlushReason::PinChange, &mut *self.sink);
    }

    fn emit(&mut self, transition: Transition) {
        if self.transitions.push_back(transition).is_err() {
            log_warn!(
                self.sink,
                self.own.id().as_str(),
                "Transition queue full, dropped {} {}",
                transition.target.as_str(),
                if transition.on { "on" } else { "off" }
            );
        }
    }
}

impl<U: SerialPort, P: FlexPin, const N: usize> Device<U, P, N> {
    pub fn new(
        id: DeviceId,
        config: &DeviceConfig,
        transport: U,
        lines: Vec<SignalLine<P>, N>,
    ) -> Self {
        Self {
            port: Port::new(id, transport, config.wait_for_peer),
            lines,
        }
    }

    /// Build a device and its lines, claiming each GPIO through `take_pin`
    ///
    /// Proxies are ticked before plain monitors, in configuration order.
    pub fn from_config<F>(
        id: DeviceId,
        config: &DeviceConfig,
        transport: U,
        mut take_pin: F,
    ) -> Result<Self, DeviceError>
    where
        F: FnMut(u8) -> Option<P>,
    {
        let mut claim = |pin: u8| take_pin(pin).ok_or(DeviceError::PinUnavailable(pin));
        let mut lines = Vec::new();

        for proxy in &config.proxies {
            let line = Proxy::new(proxy, claim(proxy.source_pin)?, claim(proxy.target_pin)?);
            lines
                .push(SignalLine::from(line))
                .map_err(|_| DeviceError::TooManyLines)?;
        }

        for monitor in &config.monitors {
            let line = Monitor::from_config(monitor, claim(monitor.pin)?);
            lines
                .push(SignalLine::from(line))
                .map_err(|_| DeviceError::TooManyLines)?;
        }

        Ok(Self::new(id, config, transport, lines))
    }

    pub fn id(&self) -> DeviceId {
        self.port.id()
    }

    pub fn port(&self) -> &Port<U> {
        &self.port
    }

    pub fn transport(&self) -> &U {
        self.port.transport()
    }

    pub fn transport_mut(&mut self) -> &mut U {
        self.port.transport_mut()
    }

    pub fn lines(&self) -> &[SignalLine<P>] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [SignalLine<P>] {
        &mut self.lines
    }

    /// Find a line by name
    pub fn line(&self, name: &str) -> Option<&SignalLine<P>> {
        self.lines.iter().find(|line| line.name() == name)
    }

    pub fn line_mut(&mut self, name: &str) -> Option<&mut SignalLine<P>> {
        self.lines.iter_mut().find(|line| line.name() == name)
    }

    pub fn is_active(&self) -> bool {
        self.port.is_active()
    }

    pub fn is_waiting(&self) -> bool {
        self.port.is_waiting()
    }

    pub fn buffer(&self) -> &[u8] {
        self.port.buffer()
    }

    pub fn stats(&self) -> PortStats {
        self.port.stats()
    }

    /// Put every line's pins into their initial state
    pub fn start(&mut self) {
        for line in self.lines.iter_mut() {
            line.start();
        }
    }

    /// Open the transport. Returns Ok(false) if already active.
    pub fn activate<S: TraceSink>(&mut self, sink: &mut S) -> Result<bool, DeviceError> {
        self.port.activate(sink)
    }

    /// Close the transport, dropping buffered bytes unreported. Returns false
    /// if already inactive.
    pub fn deactivate(&mut self) -> bool {
        self.port.deactivate()
    }

    /// Flush the peer's buffer and then this device's
    pub fn report_both<S: TraceSink>(&mut self, peer: &mut Self, sink: &mut S) {
        peer.port.report(FlushReason::PinChange, sink);
        self.port.report(FlushReason::PinChange, sink);
    }

    /// Activate the transport and then every suspended line
    ///
    /// Returns Ok(false) without touching the lines if already active.
    pub fn resume<S: TraceSink>(
        &mut self,
        peer: &mut Self,
        now_ms: u32,
        sink: &mut S,
        transitions: &mut TransitionQueue,
    ) -> Result<bool, DeviceError> {
        if !self.port.activate(sink)? {
            return Ok(false);
        }

        let Device { port, lines } = self;
        let mut ctx = DeviceContext {
            now_ms,
            own: port,
            peer: &mut peer.port,
            sink,
            transitions,
        };

        for line in lines.iter_mut().filter(|line| line.is_suspended()) {
            line.activate(&mut ctx);
        }

        Ok(true)
    }

    /// Suspend every active line and then close the transport
    pub fn suspend<S: TraceSink>(
        &mut self,
        peer: &mut Self,
        now_ms: u32,
        sink: &mut S,
        transitions: &mut TransitionQueue,
    ) {
        let Device { port, lines } = self;
        let mut ctx = DeviceContext {
            now_ms,
            own: port,
            peer: &mut peer.port,
            sink,
            transitions,
        };

        for line in lines.iter_mut().filter(|line| !line.is_suspended()) {
            line.deactivate(&mut ctx);
        }

        ctx.own.deactivate();
    }

    /// Run lines, then relay whatever the transport has received
    pub fn tick<S: TraceSink>(
        &mut self,
        peer: &mut Self,
        now_ms: u32,
        sink: &mut S,
        transitions: &mut TransitionQueue,
    ) {
        let Device { port, lines } = self;
        let mut ctx = DeviceContext {
            now_ms,
            own: port,
            peer: &mut peer.port,
            sink,
            transitions,
        };

        for line in lines.iter_mut() {
            line.tick(&mut ctx);
        }

        if ctx.own.is_active() {
            relay(ctx.own, ctx.peer, now_ms, ctx.sink);
        }
    }
}

/// Move received bytes from `own` to `peer`, flushing on frame boundaries
fn relay<U: SerialPort, S: TraceSink>(
    own: &mut Port<U>,
    peer: &mut Port<U>,
    now_ms: u32,
    sink: &mut S,
) {
    loop {
        // Bytes the peer cannot take yet stay queued in our receiver
        let budget = own
            .transport()
            .read_available()
            .min(peer.transport().write_available());
        if budget == 0 {
            break;
        }

        for _ in 0..budget {
            let Some(byte) = own.transport_mut().read_byte() else {
                break;
            };

            if !peer.buffer().is_empty() {
                peer.report(FlushReason::PeerActivity, sink);
            }

            if frame::is_resync(own.buffer(), byte) {
                own.report(FlushReason::Resync, sink);
            }

            own.push(byte, now_ms, sink);

            if own.is_waiting() {
                own.mark_discarded();
            } else {
                if peer.send(byte, sink) {
                    own.note_relayed();
                }
                peer.release();
            }

            if let Some(reason) = frame::flush_reason(own.buffer()) {
                own.report(reason, sink);
            }
        }
    }

    own.flush_if_idle(now_ms, IDLE_FLUSH_MS, sink);
}
