//! GPIO pin abstractions
//!
//! Provides traits for digital input and output pins that can be implemented
//! by chip-specific HALs. Bridge pins switch between sampling, driving and
//! floating at runtime, so pin mode is part of the abstraction.

/// Internal pull resistor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pull {
    /// No pull resistor (floating)
    #[default]
    None,
    /// Pull up to the supply rail
    Up,
    /// Pull down to ground
    Down,
}

/// Electrical mode of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// High-impedance input with the given pull
    Input(Pull),
    /// Push-pull output
    Output,
}

impl PinMode {
    /// Safe high-impedance state used while a peer is unpowered
    pub const FLOATING: PinMode = PinMode::Input(Pull::None);
}

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip. Setting the level of a pin that is not in
/// [`PinMode::Output`] latches the level for when it next becomes an output.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Pin whose direction and pull can be changed at runtime
pub trait ModePin {
    /// Reconfigure the pin
    fn set_mode(&mut self, mode: PinMode);

    /// Current pin configuration
    fn mode(&self) -> PinMode;
}

/// Pin that can be sampled, driven and floated
///
/// Every line in the bridge is built from pins of this kind so a single
/// pin type can serve as monitor input or proxy output.
pub trait FlexPin: OutputPin + InputPin + ModePin {}

// Blanket implementation for types that implement all three traits
impl<T: OutputPin + InputPin + ModePin> FlexPin for T {}
