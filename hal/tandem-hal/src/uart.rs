//! UART serial communication abstractions
//!
//! The bridge polls its transports from a single cooperative tick, so the
//! transport trait is non-blocking: callers ask how much can be moved and
//! then move it one byte at a time.

/// Non-blocking byte transport to one peer device
pub trait SerialPort {
    /// Error type for open and transmit operations
    type Error: core::fmt::Debug;

    /// (Re)open the port with the given line settings
    ///
    /// Any bytes received while the port was closed are discarded.
    fn open(&mut self, config: &UartConfig) -> Result<(), Self::Error>;

    /// Close the port. Further reads see no data and writes are rejected.
    fn close(&mut self);

    /// Whether the port is currently open
    fn is_open(&self) -> bool;

    /// Number of received bytes that can be read without blocking
    fn read_available(&self) -> usize;

    /// Number of bytes that can be queued for transmit without blocking
    fn write_available(&self) -> usize;

    /// Read one received byte, or `None` if nothing is pending
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue one byte for transmit
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl UartConfig {
    /// Line settings used by both bridged peers (57600 8O1)
    pub const BRIDGE: UartConfig = UartConfig {
        baudrate: 57_600,
        data_bits: DataBits::Eight,
        parity: Parity::Odd,
        stop_bits: StopBits::One,
    };
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
