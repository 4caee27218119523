//! One side of the relay: a transport and the bytes it has received

use heapless::Vec;
use tandem_hal::{SerialPort, UartConfig};

use super::frame::{FlushReason, MAX_MESSAGE_LEN};
use crate::bridge::DeviceId;
use crate::trace::{hex_lines, Level, TraceSink};

/// Relay counters for one port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortStats {
    /// Non-empty buffers reported
    pub flushes: u32,
    /// Bytes forwarded to the peer
    pub relayed: u32,
    /// Bytes held back while waiting for the peer
    pub discarded: u32,
    /// Cause of the most recent flush
    pub last_flush: Option<FlushReason>,
}

/// Error raised while building or powering a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// The transport could not be opened
    TransportOpen,
    /// A configured GPIO could not be claimed
    PinUnavailable(u8),
    /// More lines configured than the device can hold
    TooManyLines,
}

/// Transport plus the diagnostic copy of bytes received from it
pub struct Port<U> {
    id: DeviceId,
    transport: U,
    buffer: Vec<u8, MAX_MESSAGE_LEN>,
    /// Tick time of the last byte received
    last_activity_ms: u32,
    active: bool,
    /// Bytes from this side are held back until the peer speaks
    waiting: bool,
    wait_for_peer: bool,
    /// Some buffered byte was not forwarded
    discarded: bool,
    stats: PortStats,
}

impl<U: SerialPort> Port<U> {
    pub fn new(id: DeviceId, transport: U, wait_for_peer: bool) -> Self {
        Self {
            id,
            transport,
            buffer: Vec::new(),
            last_activity_ms: 0,
            active: false,
            waiting: false,
            wait_for_peer,
            discarded: false,
            stats: PortStats::default(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn transport(&self) -> &U {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut U {
        &mut self.transport
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn stats(&self) -> PortStats {
        self.stats
    }

    /// Open the transport. Returns Ok(false) if already active.
    pub fn activate<S: TraceSink>(&mut self, sink: &mut S) -> Result<bool, DeviceError> {
        if self.active {
            return Ok(false);
        }

        if let Err(e) = self.transport.open(&UartConfig::BRIDGE) {
            log_warn!(sink, self.id.as_str(), "Failed to open transport: {:?}", e);
            return Err(DeviceError::TransportOpen);
        }

        self.waiting = self.wait_for_peer;
        self.active = true;
        Ok(true)
    }

    /// Close the transport and drop anything buffered. Returns false if
    /// already inactive.
    pub fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }

        self.transport.close();
        self.buffer.clear();
        self.discarded = false;
        self.active = false;
        true
    }

    /// Report the buffered bytes as a hex dump and clear the buffer
    pub fn report<S: TraceSink>(&mut self, reason: FlushReason, sink: &mut S) {
        if self.buffer.is_empty() {
            return;
        }

        if sink.enabled(Level::Trace) {
            let lines = self.buffer.len().div_ceil(crate::trace::BYTES_PER_LINE);
            for (i, line) in hex_lines(&self.buffer).enumerate() {
                let marker = if self.discarded && i + 1 == lines {
                    " [discarded]"
                } else {
                    ""
                };
                sink.write(
                    Level::Trace,
                    self.id.as_str(),
                    format_args!("{}{}", line, marker),
                );
            }
        }

        self.stats.flushes += 1;
        self.stats.last_flush = Some(reason);
        self.buffer.clear();
        self.discarded = false;
    }

    /// Append a received byte
    ///
    /// Callers flush before the buffer can overflow; a byte that would not
    /// fit forces a size flush first.
    pub(crate) fn push<S: TraceSink>(&mut self, byte: u8, now_ms: u32, sink: &mut S) {
        if self.buffer.is_full() {
            self.report(FlushReason::SizeLimit, sink);
        }
        let _ = self.buffer.push(byte);
        self.last_activity_ms = now_ms;
    }

    /// Note that the last byte pushed was held back
    pub(crate) fn mark_discarded(&mut self) {
        self.discarded = true;
        self.stats.discarded += 1;
    }

    pub(crate) fn note_relayed(&mut self) {
        self.stats.relayed += 1;
    }

    /// The peer has spoken, so this side may forward again
    pub(crate) fn release(&mut self) {
        self.waiting = false;
    }

    /// Forward one byte out of this port's transport
    pub(crate) fn send<S: TraceSink>(&mut self, byte: u8, sink: &mut S) -> bool {
        match self.transport.write_byte(byte) {
            Ok(()) => true,
            Err(e) => {
                log_debug!(sink, self.id.as_str(), "Write failed: {:?}", e);
                false
            }
        }
    }

    /// Flush if the buffer has been quiet for `idle_ms`
    pub(crate) fn flush_if_idle<S: TraceSink>(&mut self, now_ms: u32, idle_ms: u32, sink: &mut S) {
        if !self.buffer.is_empty() && now_ms.wrapping_sub(self.last_activity_ms) >= idle_ms {
            self.report(FlushReason::Idle, sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::testing::RecordingSink;
    use crate::trace::NullSink;
    use tandem_hal::mock::MockSerial;

    fn port() -> Port<MockSerial> {
        Port::new(DeviceId::Console, MockSerial::new(), true)
    }

    #[test]
    fn test_activate_opens_bridge_line() {
        let mut port = port();
        assert_eq!(port.activate(&mut NullSink), Ok(true));
        assert_eq!(port.activate(&mut NullSink), Ok(false));
        assert!(port.is_waiting());
        assert_eq!(port.transport().config(), Some(UartConfig::BRIDGE));
        assert_eq!(port.transport().open_count(), 1);
    }

    #[test]
    fn test_activate_failure() {
        let mut port = port();
        port.transport_mut().refuse_open(true);
        let mut sink = RecordingSink::new();
        assert_eq!(port.activate(&mut sink), Err(DeviceError::TransportOpen));
        assert!(!port.is_active());
        assert!(sink.contains("Failed to open transport"));
    }

    #[test]
    fn test_deactivate_drops_buffer_silently() {
        let mut port = port();
        let mut sink = RecordingSink::new();
        port.activate(&mut sink).unwrap();
        port.push(1, 0, &mut sink);
        port.push(2, 0, &mut sink);

        assert!(port.deactivate());
        assert!(!port.deactivate());
        assert!(port.buffer().is_empty());
        assert!(sink.lines.is_empty());
        assert_eq!(port.stats().flushes, 0);
        assert_eq!(port.transport().close_count(), 1);
    }

    #[test]
    fn test_report_hex_dump() {
        let mut port = port();
        let mut sink = RecordingSink::new();
        for i in 0..30u8 {
            port.push(i, 0, &mut sink);
        }
        port.mark_discarded();
        port.report(FlushReason::Idle, &mut sink);

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("00 01 02"));
        assert!(!messages[0].contains("[discarded]"));
        assert_eq!(messages[1], "18 19 1A 1B 1C 1D [discarded]");
        assert_eq!(sink.lines[0].1, "console");
        assert!(port.buffer().is_empty());
        assert_eq!(port.stats().last_flush, Some(FlushReason::Idle));
    }

    #[test]
    fn test_report_clears_without_tracing() {
        let mut port = port();
        let mut sink = RecordingSink::quiet();
        port.push(0xAA, 0, &mut sink);
        port.report(FlushReason::PinChange, &mut sink);
        assert!(port.buffer().is_empty());
        assert!(sink.lines.is_empty());
        assert_eq!(port.stats().flushes, 1);
    }

    #[test]
    fn test_empty_report_is_noop() {
        let mut port = port();
        port.report(FlushReason::PeerActivity, &mut NullSink);
        assert_eq!(port.stats().flushes, 0);
    }

    #[test]
    fn test_idle_flush_wraps() {
        let mut port = port();
        port.push(1, u32::MAX - 20, &mut NullSink);
        port.flush_if_idle(u32::MAX, 45, &mut NullSink);
        assert_eq!(port.buffer().len(), 1);
        port.flush_if_idle(24, 45, &mut NullSink);
        assert!(port.buffer().is_empty());
    }
}
