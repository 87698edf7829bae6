//! GPIO Abstractions
//!
//! Type-safe wrappers for the RFM12 control lines and the status LED.
//! The chip's reset and interrupt lines are active low; these wrappers
//! expose them as logical, active-high values.

use embassy_stm32::gpio::{Input, Output};

/// Status LED state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LedState {
    /// LED is off
    #[default]
    Off,
    /// LED is on
    On,
}

impl defmt::Format for LedState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "OFF"),
            Self::On => defmt::write!(f, "ON"),
        }
    }
}

/// Status LED driver
pub struct StatusLed<'d> {
    pin: Output<'d>,
    state: LedState,
}

impl<'d> StatusLed<'d> {
    /// Create a new status LED (initially off)
    #[must_use]
    pub fn new(pin: Output<'d>) -> Self {
        Self {
            pin,
            state: LedState::Off,
        }
    }

    /// Drive the LED
    pub fn set(&mut self, state: LedState) {
        match state {
            LedState::On => self.pin.set_high(),
            LedState::Off => self.pin.set_low(),
        }
        self.state = state;
    }

    /// Toggle LED state
    pub fn toggle(&mut self) {
        self.set(match self.state {
            LedState::Off => LedState::On,
            LedState::On => LedState::Off,
        });
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> LedState {
        self.state
    }
}

/// Chip reset line (nRES, active low)
pub struct ChipReset<'d> {
    pin: Output<'d>,
    asserted: bool,
}

impl<'d> ChipReset<'d> {
    /// Wrap the pin and hold the chip in reset
    #[must_use]
    pub fn new(pin: Output<'d>) -> Self {
        let mut line = Self {
            pin,
            asserted: false,
        };
        line.drive(true);
        line
    }

    /// Drive the line from the link's logical reset output
    pub fn drive(&mut self, asserted: bool) {
        if asserted == self.asserted {
            return;
        }
        if asserted {
            self.pin.set_low();
        } else {
            self.pin.set_high();
        }
        self.asserted = asserted;
    }

    /// Check if reset is asserted
    #[must_use]
    pub const fn is_asserted(&self) -> bool {
        self.asserted
    }
}

/// Chip interrupt line (nIRQ, active low)
pub struct IrqLine<'d> {
    pin: Input<'d>,
}

impl<'d> IrqLine<'d> {
    /// Wrap the pin (pull-up expected)
    #[must_use]
    pub fn new(pin: Input<'d>) -> Self {
        Self { pin }
    }

    /// Check if the chip requests service
    #[must_use]
    pub fn is_asserted(&self) -> bool {
        self.pin.is_low()
    }
}
