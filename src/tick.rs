//! Tick Source
//!
//! The link state machines advance on a tick derived from the system
//! clock by an integer ratio. A gate can suspend ticking entirely, which
//! freezes every state machine register in place.
//!
//! [`TickDivider`] serves callers that see every system clock cycle,
//! such as a cycle-level host model driving
//! [`Transceiver::clock`](crate::transceiver::Transceiver::clock).
//! The firmware never counts cycles: a hardware timer at the tick rate
//! (`hal::timer::LinkClock`) stands in for the divider and calls
//! [`Transceiver::step`](crate::transceiver::Transceiver::step) directly.

/// Divide-down tick source
///
/// Pulses once every `ratio` calls to [`clock`](Self::clock).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickDivider {
    ratio: u32,
    count: u32,
}

impl TickDivider {
    /// Create a divider (a ratio of 0 behaves like 1)
    #[must_use]
    pub const fn new(ratio: u32) -> Self {
        Self {
            ratio: if ratio == 0 { 1 } else { ratio },
            count: 0,
        }
    }

    /// System clock cycles per tick
    #[must_use]
    pub const fn ratio(&self) -> u32 {
        self.ratio
    }

    /// Advance one system clock cycle, returns `true` on a tick
    pub fn clock(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.ratio {
            self.count = 0;
            true
        } else {
            false
        }
    }

    /// Restart the count
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TickDivider {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "TickDivider(1/{})", self.ratio);
    }
}

/// Tick suspension gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickGate {
    open: bool,
}

impl TickGate {
    /// Create an open gate
    #[must_use]
    pub const fn new() -> Self {
        Self { open: true }
    }

    /// Open or close the gate
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Check if ticks pass
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Filter a tick through the gate
    #[must_use]
    pub const fn pass(&self, tick: bool) -> bool {
        tick && self.open
    }
}

impl Default for TickGate {
    fn default() -> Self {
        Self::new()
    }
}
