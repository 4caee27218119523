//! Diagnostic output
//!
//! The core never talks to a logger directly. Everything it has to say goes
//! through a [`TraceSink`], which the firmware backs with defmt and the tests
//! back with a recording buffer.

use core::fmt;

/// Diagnostic verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Warn,
    Info,
    Debug,
    Trace,
}

/// Destination for formatted diagnostic lines
pub trait TraceSink {
    /// Whether lines at `level` would be kept
    fn enabled(&self, level: Level) -> bool;

    /// Emit one line attributed to `source`
    fn write(&mut self, level: Level, source: &str, args: fmt::Arguments<'_>);
}

impl<T: TraceSink + ?Sized> TraceSink for &mut T {
    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }

    fn write(&mut self, level: Level, source: &str, args: fmt::Arguments<'_>) {
        (**self).write(level, source, args)
    }
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn enabled(&self, _level: Level) -> bool {
        false
    }

    fn write(&mut self, _level: Level, _source: &str, _args: fmt::Arguments<'_>) {}
}

macro_rules! log_at {
    ($level:expr, $sink:expr, $source:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::trace::TraceSink::enabled(&*$sink, level) {
            $crate::trace::TraceSink::write(&mut *$sink, level, $source, format_args!($($arg)*));
        }
    }};
}

macro_rules! log_trace {
    ($sink:expr, $source:expr, $($arg:tt)*) => {
        log_at!($crate::trace::Level::Trace, $sink, $source, $($arg)*)
    };
}

macro_rules! log_debug {
    ($sink:expr, $source:expr, $($arg:tt)*) => {
        log_at!($crate::trace::Level::Debug, $sink, $source, $($arg)*)
    };
}

macro_rules! log_info {
    ($sink:expr, $source:expr, $($arg:tt)*) => {
        log_at!($crate::trace::Level::Info, $sink, $source, $($arg)*)
    };
}

macro_rules! log_warn {
    ($sink:expr, $source:expr, $($arg:tt)*) => {
        log_at!($crate::trace::Level::Warn, $sink, $source, $($arg)*)
    };
}

/// Bytes rendered per hex dump line
pub const BYTES_PER_LINE: usize = 24;

/// One line of a hex dump: uppercase byte pairs separated by spaces
#[derive(Debug, Clone, Copy)]
pub struct HexLine<'a>(pub &'a [u8]);

impl fmt::Display for HexLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Split `bytes` into fixed-width hex dump lines
pub fn hex_lines(bytes: &[u8]) -> impl Iterator<Item = HexLine<'_>> {
    bytes.chunks(BYTES_PER_LINE).map(HexLine)
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use std::string::ToString;
    use std::vec::Vec;

    #[test]
    fn test_hex_line_format() {
        assert_eq!(HexLine(&[0xAA, 0x01, 0x0F]).to_string(), "AA 01 0F");
        assert_eq!(HexLine(&[]).to_string(), "");
    }

    #[test]
    fn test_hex_lines_chunking() {
        let bytes = [0u8; 50];
        let lens: Vec<usize> = hex_lines(&bytes).map(|l| l.0.len()).collect();
        assert_eq!(lens, [24, 24, 2]);
    }

    #[test]
    fn test_level_filter() {
        let mut sink = RecordingSink::quiet();
        let s = &mut sink;
        log_trace!(s, "test", "hidden {}", 1);
        log_info!(s, "test", "shown {}", 2);
        assert_eq!(sink.messages(), ["shown 2"]);
    }
}
