//! Byte Shift Primitive
//!
//! The bus engine moves one byte at a time through a [`ShiftPort`]:
//! start a shift, then poll until the byte clocked in from the chip is
//! available. Chip select is driven through the same port.

/// One-byte full-duplex shift primitive with chip select
pub trait ShiftPort {
    /// Port can accept a new byte
    fn is_ready(&self) -> bool;

    /// Begin shifting `byte` out
    fn start(&mut self, byte: u8);

    /// Byte shifted in, once the shift started by [`start`](Self::start) completes
    fn poll(&mut self) -> Option<u8>;

    /// Drive chip select (`true` = selected)
    fn select(&mut self, selected: bool);
}

/// Loopback port: every byte shifted out is shifted back in
///
/// Completion is reported `latency` polls after the start, modelling a
/// shift clocked at a fraction of the tick rate.
#[derive(Clone, Debug, Default)]
pub struct Loopback {
    latency: u32,
    remaining: u32,
    in_flight: Option<u8>,
    selected: bool,
    shifts: u32,
}

impl Loopback {
    /// Create a loopback completing `latency` polls after each start
    #[must_use]
    pub const fn new(latency: u32) -> Self {
        Self {
            latency,
            remaining: 0,
            in_flight: None,
            selected: false,
            shifts: 0,
        }
    }

    /// Number of shifts started so far
    #[must_use]
    pub const fn shifts(&self) -> u32 {
        self.shifts
    }

    /// Current chip select state
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Reset the shift counter
    pub fn clear_shifts(&mut self) {
        self.shifts = 0;
    }
}

impl ShiftPort for Loopback {
    fn is_ready(&self) -> bool {
        self.in_flight.is_none()
    }

    fn start(&mut self, byte: u8) {
        self.in_flight = Some(byte);
        self.remaining = self.latency;
        self.shifts += 1;
    }

    fn poll(&mut self) -> Option<u8> {
        self.in_flight?;
        if self.remaining > 0 {
            self.remaining -= 1;
            return None;
        }
        self.in_flight.take()
    }

    fn select(&mut self, selected: bool) {
        self.selected = selected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_echoes_after_latency() {
        let mut port = Loopback::new(2);
        assert!(port.is_ready());
        port.start(0x5A);
        assert!(!port.is_ready());
        assert_eq!(port.poll(), None);
        assert_eq!(port.poll(), None);
        assert_eq!(port.poll(), Some(0x5A));
        assert!(port.is_ready());
        assert_eq!(port.poll(), None);
        assert_eq!(port.shifts(), 1);
    }

    #[test]
    fn loopback_zero_latency() {
        let mut port = Loopback::new(0);
        port.start(0x01);
        assert_eq!(port.poll(), Some(0x01));
    }
}
