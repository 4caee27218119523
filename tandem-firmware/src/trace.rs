//! defmt-backed diagnostic sink
//!
//! Trace-level output (hex dumps, line states) is switched at runtime from
//! the board file; everything else is always emitted.

use core::fmt;

use defmt::Display2Format;
use portable_atomic::{AtomicBool, Ordering};
use tandem_core::{Level, TraceSink};

static TRACE_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable or disable trace-level diagnostics
pub fn set_trace(enabled: bool) {
    TRACE_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Sink that forwards bridge diagnostics to defmt
#[derive(Debug, Clone, Copy, Default)]
pub struct DefmtSink;

impl TraceSink for DefmtSink {
    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Trace => TRACE_ENABLED.load(Ordering::Relaxed),
            _ => true,
        }
    }

    fn write(&mut self, level: Level, source: &str, args: fmt::Arguments<'_>) {
        let args = Display2Format(&args);
        match level {
            Level::Warn => defmt::warn!("[{=str}] {}", source, args),
            Level::Info => defmt::info!("[{=str}] {}", source, args),
            Level::Debug => defmt::debug!("[{=str}] {}", source, args),
            // Trace lines are gated by the runtime switch, not the defmt filter
            Level::Trace => defmt::info!("[{=str}] {}", source, args),
        }
    }
}
