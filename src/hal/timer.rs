//! Timer Abstractions
//!
//! The link state machines are stepped from an Embassy [`Ticker`] at the
//! configured bus tick rate. On hardware this takes the place of the
//! system clock [`TickDivider`](crate::tick::TickDivider).

use embassy_time::{Duration, Ticker};

/// Periodic link tick
pub struct LinkClock {
    period_us: u32,
    ticker: Ticker,
    ticks: u64,
}

impl LinkClock {
    /// Create a clock from a tick rate in Hz
    #[must_use]
    pub fn from_rate(rate_hz: u32) -> Self {
        let period_us = (1_000_000 / rate_hz.max(1)).max(1);
        Self {
            period_us,
            ticker: Ticker::every(Duration::from_micros(u64::from(period_us))),
            ticks: 0,
        }
    }

    /// Get the tick rate in Hz
    #[must_use]
    pub const fn rate_hz(&self) -> u32 {
        1_000_000 / self.period_us
    }

    /// Get period duration
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_micros(self.period_us as u64)
    }

    /// Ticks elapsed since creation
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Wait for the next tick
    pub async fn tick(&mut self) {
        self.ticker.next().await;
        self.ticks = self.ticks.wrapping_add(1);
    }

    /// Restart the period from now
    pub fn reset(&mut self) {
        self.ticker.reset();
    }
}

impl defmt::Format for LinkClock {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "LinkClock({}Hz)", self.rate_hz());
    }
}
