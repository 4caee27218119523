//! Dynamic pin allocation for config-driven line setup
//!
//! Monitor and proxy pins come from the board TOML, so they are handed out
//! by number at runtime. The UART pins are fixed by the peripheral mux and
//! stay typed so they can be passed to the UART drivers.

use embassy_rp::gpio::{AnyPin, Flex, Pull as RpPull};
use embassy_rp::peripherals::{PIN_0, PIN_1, PIN_4, PIN_5, UART0, UART1};
use embassy_rp::{Peri, Peripherals};
use tandem_hal::{InputPin, ModePin, OutputPin, PinMode, Pull};

/// Number of user GPIOs on the RP2040
pub const GPIO_COUNT: usize = 30;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin already taken
    AlreadyTaken,
    /// Pin reserved for a UART
    Reserved,
}

/// Pin bank that holds the free GPIO pins and allows taking them by number
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
}

/// Peripherals that stay typed after the bank is built
pub struct RemainingPeripherals {
    pub uart0: Peri<'static, UART0>,
    pub uart0_tx: Peri<'static, PIN_0>,
    pub uart0_rx: Peri<'static, PIN_1>,
    pub uart1: Peri<'static, UART1>,
    pub uart1_tx: Peri<'static, PIN_4>,
    pub uart1_rx: Peri<'static, PIN_5>,
}

/// GPIOs held back for the UARTs
const RESERVED: [u8; 4] = [0, 1, 4, 5];

impl PinBank {
    /// Split the peripherals into a pin bank and the UART resources
    pub fn from_peripherals(p: Peripherals) -> (Self, RemainingPeripherals) {
        let bank = Self {
            pins: [
                None,
                None,
                Some(p.PIN_2.into()),
                Some(p.PIN_3.into()),
                None,
                None,
                Some(p.PIN_6.into()),
                Some(p.PIN_7.into()),
                Some(p.PIN_8.into()),
                Some(p.PIN_9.into()),
                Some(p.PIN_10.into()),
                Some(p.PIN_11.into()),
                Some(p.PIN_12.into()),
                Some(p.PIN_13.into()),
                Some(p.PIN_14.into()),
                Some(p.PIN_15.into()),
                Some(p.PIN_16.into()),
                Some(p.PIN_17.into()),
                Some(p.PIN_18.into()),
                Some(p.PIN_19.into()),
                Some(p.PIN_20.into()),
                Some(p.PIN_21.into()),
                Some(p.PIN_22.into()),
                Some(p.PIN_23.into()),
                Some(p.PIN_24.into()),
                Some(p.PIN_25.into()),
                Some(p.PIN_26.into()),
                Some(p.PIN_27.into()),
                Some(p.PIN_28.into()),
                Some(p.PIN_29.into()),
            ],
        };
        let remaining = RemainingPeripherals {
            uart0: p.UART0,
            uart0_tx: p.PIN_0,
            uart0_rx: p.PIN_1,
            uart1: p.UART1,
            uart1_tx: p.PIN_4,
            uart1_rx: p.PIN_5,
        };
        (bank, remaining)
    }

    /// Take a pin by number
    pub fn take(&mut self, pin_num: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        if pin_num as usize >= GPIO_COUNT {
            return Err(PinError::InvalidPin);
        }
        if RESERVED.contains(&pin_num) {
            return Err(PinError::Reserved);
        }
        self.pins[pin_num as usize]
            .take()
            .ok_or(PinError::AlreadyTaken)
    }

    /// Take a pin by number and wrap it as a bridge line pin
    pub fn take_flex(&mut self, pin_num: u8) -> Result<RpPin, PinError> {
        self.take(pin_num).map(|pin| RpPin::new(pin_num, pin))
    }
}

/// GPIO that can be sampled, driven and floated
pub struct RpPin {
    number: u8,
    flex: Flex<'static>,
    mode: PinMode,
}

impl RpPin {
    /// Wrap a pin, leaving it floating
    pub fn new(number: u8, pin: Peri<'static, AnyPin>) -> Self {
        let mut flex = Flex::new(pin);
        flex.set_pull(RpPull::None);
        flex.set_as_input();
        Self {
            number,
            flex,
            mode: PinMode::FLOATING,
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }
}

fn rp_pull(pull: Pull) -> RpPull {
    match pull {
        Pull::None => RpPull::None,
        Pull::Up => RpPull::Up,
        Pull::Down => RpPull::Down,
    }
}

impl OutputPin for RpPin {
    fn set_high(&mut self) {
        self.flex.set_high();
    }

    fn set_low(&mut self) {
        self.flex.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.flex.is_set_high()
    }
}

impl InputPin for RpPin {
    fn is_high(&self) -> bool {
        self.flex.is_high()
    }
}

impl ModePin for RpPin {
    fn set_mode(&mut self, mode: PinMode) {
        match mode {
            PinMode::Input(pull) => {
                self.flex.set_as_input();
                self.flex.set_pull(rp_pull(pull));
            }
            PinMode::Output => {
                self.flex.set_pull(RpPull::None);
                self.flex.set_as_output();
            }
        }
        self.mode = mode;
    }

    fn mode(&self) -> PinMode {
        self.mode
    }
}
