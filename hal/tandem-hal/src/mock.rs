//! Host-side test doubles
//!
//! Plain owned state, inspected through accessors after the double has been
//! handed to the code under test.

use heapless::{Deque, Vec};

use crate::gpio::{InputPin, ModePin, OutputPin, PinMode};
use crate::uart::{SerialPort, UartConfig};

/// Receive queue depth of [`MockSerial`]
pub const MOCK_RX_CAPACITY: usize = 1024;

/// Transmit log depth of [`MockSerial`]
pub const MOCK_TX_CAPACITY: usize = 2048;

/// Simulated GPIO pin
///
/// The externally applied input level is set with [`MockPin::set_input`];
/// the driven output level and mode are recorded for inspection.
#[derive(Debug, Clone)]
pub struct MockPin {
    number: u8,
    input: bool,
    output: bool,
    mode: PinMode,
    drives: u32,
}

impl MockPin {
    /// Create a floating pin reading low
    pub fn new(number: u8) -> Self {
        Self {
            number,
            input: false,
            output: false,
            mode: PinMode::FLOATING,
            drives: 0,
        }
    }

    /// GPIO number this pin stands in for
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Apply an external level to the pin
    pub fn set_input(&mut self, high: bool) {
        self.input = high;
    }

    /// Level the pin presents to the outside, if it is driving
    pub fn driven_level(&self) -> Option<bool> {
        match self.mode {
            PinMode::Output => Some(self.output),
            PinMode::Input(_) => None,
        }
    }

    /// Number of times the output level has been written
    pub fn drive_count(&self) -> u32 {
        self.drives
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.output = true;
        self.drives += 1;
    }

    fn set_low(&mut self) {
        self.output = false;
        self.drives += 1;
    }

    fn is_set_high(&self) -> bool {
        self.output
    }
}

impl InputPin for MockPin {
    fn is_high(&self) -> bool {
        self.input
    }
}

impl ModePin for MockPin {
    fn set_mode(&mut self, mode: PinMode) {
        self.mode = mode;
    }

    fn mode(&self) -> PinMode {
        self.mode
    }
}

/// Errors reported by [`MockSerial`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSerialError {
    /// Write attempted while closed
    Closed,
    /// Transmit log is full
    Overflow,
    /// Open was configured to fail
    Refused,
}

/// Simulated UART
///
/// Bytes queued with [`MockSerial::inject`] become readable while the port
/// is open; everything written is appended to [`MockSerial::written`].
#[derive(Debug)]
pub struct MockSerial {
    open: bool,
    config: Option<UartConfig>,
    rx: Deque<u8, MOCK_RX_CAPACITY>,
    tx: Vec<u8, MOCK_TX_CAPACITY>,
    write_room: usize,
    refuse_open: bool,
    opens: u32,
    closes: u32,
}

impl Default for MockSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSerial {
    /// Create a closed port with unlimited transmit room
    pub fn new() -> Self {
        Self {
            open: false,
            config: None,
            rx: Deque::new(),
            tx: Vec::new(),
            write_room: usize::MAX,
            refuse_open: false,
            opens: 0,
            closes: 0,
        }
    }

    /// Queue bytes as if received from the peer device
    ///
    /// Bytes beyond the receive capacity are dropped, like a UART overrun.
    pub fn inject(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let _ = self.rx.push_back(byte);
        }
    }

    /// Bytes still waiting to be read
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Every byte written since creation
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Limit the transmit room reported by `write_available`
    pub fn set_write_room(&mut self, room: usize) {
        self.write_room = room;
    }

    /// Make subsequent `open` calls fail
    pub fn refuse_open(&mut self, refuse: bool) {
        self.refuse_open = refuse;
    }

    /// Line settings of the last successful open
    pub fn config(&self) -> Option<UartConfig> {
        self.config
    }

    /// Number of successful opens
    pub fn open_count(&self) -> u32 {
        self.opens
    }

    /// Number of closes
    pub fn close_count(&self) -> u32 {
        self.closes
    }
}

impl SerialPort for MockSerial {
    type Error = MockSerialError;

    fn open(&mut self, config: &UartConfig) -> Result<(), Self::Error> {
        if self.refuse_open {
            return Err(MockSerialError::Refused);
        }
        self.rx.clear();
        self.config = Some(*config);
        self.open = true;
        self.opens += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.closes += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read_available(&self) -> usize {
        if self.open {
            self.rx.len()
        } else {
            0
        }
    }

    fn write_available(&self) -> usize {
        if self.open {
            self.write_room.min(MOCK_TX_CAPACITY - self.tx.len())
        } else {
            0
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.open {
            self.rx.pop_front()
        } else {
            None
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        if !self.open {
            return Err(MockSerialError::Closed);
        }
        self.tx.push(byte).map_err(|_| MockSerialError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_port_hides_data() {
        let mut port = MockSerial::new();
        port.inject(&[1, 2, 3]);
        assert_eq!(port.read_available(), 0);
        assert_eq!(port.read_byte(), None);
        assert_eq!(port.write_byte(9), Err(MockSerialError::Closed));
    }

    #[test]
    fn test_open_discards_stale_bytes() {
        let mut port = MockSerial::new();
        port.inject(&[1, 2, 3]);
        port.open(&UartConfig::BRIDGE).unwrap();
        assert_eq!(port.read_available(), 0);

        port.inject(&[4]);
        assert_eq!(port.read_byte(), Some(4));
        assert_eq!(port.config(), Some(UartConfig::BRIDGE));
    }

    #[test]
    fn test_pin_records_drive() {
        let mut pin = MockPin::new(3);
        assert_eq!(pin.driven_level(), None);

        pin.set_high();
        pin.set_mode(PinMode::Output);
        assert_eq!(pin.driven_level(), Some(true));
        assert_eq!(pin.drive_count(), 1);

        pin.set_mode(PinMode::FLOATING);
        assert_eq!(pin.driven_level(), None);
    }
}
