//! SPI Shift Port
//!
//! [`ShiftPort`] over a blocking embedded-hal [`SpiBus`] with a
//! software-driven chip select.
//!
//! A shift is performed in full when started and reported complete on
//! the next poll. A bus error completes the shift with `0x00`, which the
//! link controller sees as a silent chip.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::shift::ShiftPort;

/// Shift port over an SPI bus and an active-low select pin
pub struct SpiShiftPort<SPI, CS> {
    spi: SPI,
    nsel: CS,
    in_flight: Option<u8>,
    errors: u32,
}

impl<SPI, CS> SpiShiftPort<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Create a port with the chip deselected
    pub fn new(spi: SPI, mut nsel: CS) -> Self {
        if nsel.set_high().is_err() {
            defmt::warn!("spi: nSEL init failed");
        }
        Self {
            spi,
            nsel,
            in_flight: None,
            errors: 0,
        }
    }

    /// Number of failed transfers
    #[must_use]
    pub const fn errors(&self) -> u32 {
        self.errors
    }

    /// Release the bus and select pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.nsel)
    }

    fn shift(&mut self, byte: u8) -> u8 {
        let mut buf = [byte];
        let result = self
            .spi
            .transfer_in_place(&mut buf)
            .and_then(|()| self.spi.flush());
        match result {
            Ok(()) => buf[0],
            Err(_) => {
                self.errors = self.errors.wrapping_add(1);
                defmt::warn!("spi: transfer of 0x{=u8:02X} failed", byte);
                0x00
            }
        }
    }
}

impl<SPI, CS> ShiftPort for SpiShiftPort<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    fn is_ready(&self) -> bool {
        self.in_flight.is_none()
    }

    fn start(&mut self, byte: u8) {
        let response = self.shift(byte);
        self.in_flight = Some(response);
    }

    fn poll(&mut self) -> Option<u8> {
        self.in_flight.take()
    }

    fn select(&mut self, selected: bool) {
        let result = if selected {
            self.nsel.set_low()
        } else {
            self.nsel.set_high()
        };
        if result.is_err() {
            defmt::warn!("spi: nSEL drive failed");
        }
    }
}
