//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the RFM12 node and the
//! build-time [`RadioConfig`] that feeds the register encoder. All pin
//! mappings, clock rates, and protocol timings are centralized here.

use core::fmt;

use crate::encoder::{
    AfcSettings, Band, CrystalLoad, DataFilterSettings, FifoSettings, ReceiverSettings,
    TxSettings,
};

/// System clock frequency (STM32G474 @ 170MHz)
pub const SYSTEM_CLOCK_HZ: u32 = 170_000_000;

/// SPI clock to the RFM12 (the chip allows up to 2.5 MHz for FIFO reads)
pub const SPI_FREQUENCY_HZ: u32 = 2_000_000;

/// Rate at which the link state machines are stepped
pub const LINK_TICK_HZ: u32 = 100_000;

/// Settle time after releasing the chip from reset
pub const SETTLE_MS: u32 = 200;

/// Duration the chip reset line is held by the power-up watchdog
pub const RESET_HOLD_MS: u32 = 1_000;

/// Period of the status poll in Active power mode
pub const POLL_PERIOD_MS: u32 = 200;

/// Default power-up watchdog threshold
pub const POWERUP_WATCHDOG_MS: u32 = 1_500;

/// Default receiver watchdog threshold (gap between bytes of one frame)
pub const RX_WATCHDOG_MS: u32 = 100;

/// Upper bound of the received-byte counter
pub const MAX_FRAME_LEN: u8 = 19;

/// Default carrier (868.3 MHz)
pub const DEFAULT_FREQUENCY_HZ: u32 = 868_300_000;

/// Default bit rate
pub const DEFAULT_DATA_RATE: u32 = 9_600;

/// Depth of the received-byte queue in the firmware
pub const RX_QUEUE_DEPTH: usize = 64;

/// Largest frame the firmware queues for transmission
pub const TX_FRAME_CAPACITY: usize = 32;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic

    /// Status LED (directly on MCU)
    pub const LED_STATUS: &str = "PA5";

    /// SPI1 SCK
    pub const SPI1_SCK: &str = "PB3";

    /// SPI1 MISO (RFM12 SDO)
    pub const SPI1_MISO: &str = "PB4";

    /// SPI1 MOSI (RFM12 SDI)
    pub const SPI1_MOSI: &str = "PB5";

    /// RFM12 chip select (active low)
    pub const RFM_NSEL: &str = "PA4";

    /// RFM12 interrupt request (active low)
    pub const RFM_NIRQ: &str = "PA1";

    /// RFM12 reset (active low)
    pub const RFM_NRES: &str = "PA0";
}

/// Configuration validation error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Carrier cannot be reached in the selected band
    FrequencyOutOfBand {
        /// Requested carrier
        hz: u32,
    },
    /// Bit rate outside the chip's range
    DataRateOutOfRange {
        /// Requested bit rate
        baud: u32,
    },
    /// FSK deviation not a multiple of 15 kHz in 15..=240 kHz
    DeviationInvalid {
        /// Requested deviation
        hz: u32,
    },
    /// Register field does not fit its bit width
    InvalidField(&'static str),
    /// System clock is not an integer multiple of the bus tick rate
    ClockRatio {
        /// System clock
        system_hz: u32,
        /// Bus tick rate
        bus_hz: u32,
    },
    /// A watchdog or frame limit is zero
    ZeroLimit(&'static str),
    /// A timing does not fit the tick counters at this tick rate
    LimitTooLarge(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrequencyOutOfBand { hz } => write!(f, "frequency {hz} Hz outside band"),
            Self::DataRateOutOfRange { baud } => write!(f, "data rate {baud} baud out of range"),
            Self::DeviationInvalid { hz } => write!(f, "deviation {hz} Hz invalid"),
            Self::InvalidField(name) => write!(f, "field {name} out of range"),
            Self::ClockRatio { system_hz, bus_hz } => {
                write!(f, "system clock {system_hz} Hz not a multiple of tick rate {bus_hz} Hz")
            }
            Self::ZeroLimit(name) => write!(f, "{name} must be non-zero"),
            Self::LimitTooLarge(name) => write!(f, "{name} overflows the tick counter"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::FrequencyOutOfBand { hz } => defmt::write!(f, "FreqOutOfBand({})", hz),
            Self::DataRateOutOfRange { baud } => defmt::write!(f, "DataRate({})", baud),
            Self::DeviationInvalid { hz } => defmt::write!(f, "Deviation({})", hz),
            Self::InvalidField(name) => defmt::write!(f, "Field({=str})", *name),
            Self::ClockRatio { system_hz, bus_hz } => {
                defmt::write!(f, "ClockRatio({}/{})", system_hz, bus_hz);
            }
            Self::ZeroLimit(name) => defmt::write!(f, "Zero({=str})", *name),
            Self::LimitTooLarge(name) => defmt::write!(f, "TooLarge({=str})", *name),
        }
    }
}

/// Build-time radio configuration
///
/// Immutable for the life of a driver instance. Feeds the register
/// encoder once, when the instruction set is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RadioConfig {
    /// Clock driving the tick divider
    pub system_clock_hz: u32,
    /// Tick rate of the link state machines
    pub bus_clock_hz: u32,
    /// Ticks in `Idle` without a powered-up chip before a forced reset
    pub powerup_watchdog_ms: u32,
    /// Gap between bytes of one frame before the frame is abandoned
    pub rx_watchdog_ms: u32,
    /// Upper bound of the received-byte counter
    pub max_frame_len: u8,
    /// Frequency band
    pub band: Band,
    /// Crystal load capacitance
    pub crystal_load: CrystalLoad,
    /// Disable the chip's clock output pin
    pub clock_output_disabled: bool,
    /// Carrier in Hz
    pub frequency_hz: u32,
    /// Bit rate in baud
    pub data_rate: u32,
    /// Receiver control
    pub receiver: ReceiverSettings,
    /// Data filter and clock recovery
    pub data_filter: DataFilterSettings,
    /// AFC
    pub afc: AfcSettings,
    /// FIFO, sync pattern and reset mode
    pub fifo: FifoSettings,
    /// Transmitter
    pub tx: TxSettings,
    /// Report the status byte as received data when the chip is not
    /// ready for the first transmit byte
    pub status_echo: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            system_clock_hz: SYSTEM_CLOCK_HZ,
            bus_clock_hz: LINK_TICK_HZ,
            powerup_watchdog_ms: POWERUP_WATCHDOG_MS,
            rx_watchdog_ms: RX_WATCHDOG_MS,
            max_frame_len: MAX_FRAME_LEN,
            band: Band::Mhz868,
            crystal_load: CrystalLoad::default(),
            clock_output_disabled: true,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            data_rate: DEFAULT_DATA_RATE,
            receiver: ReceiverSettings::default(),
            data_filter: DataFilterSettings::default(),
            afc: AfcSettings::default(),
            fifo: FifoSettings::default(),
            tx: TxSettings::default(),
            status_echo: false,
        }
    }
}

impl RadioConfig {
    /// Check clock and limit fields
    ///
    /// Register fields are checked by the encoder when the instruction
    /// set is built.
    ///
    /// # Errors
    /// The first inconsistent field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_clock_hz < 1_000
            || self.bus_clock_hz % 1_000 != 0
            || self.system_clock_hz < self.bus_clock_hz
            || self.system_clock_hz % self.bus_clock_hz != 0
        {
            return Err(ConfigError::ClockRatio {
                system_hz: self.system_clock_hz,
                bus_hz: self.bus_clock_hz,
            });
        }
        if self.powerup_watchdog_ms == 0 {
            return Err(ConfigError::ZeroLimit("powerup_watchdog_ms"));
        }
        if self.rx_watchdog_ms == 0 {
            return Err(ConfigError::ZeroLimit("rx_watchdog_ms"));
        }
        if self.max_frame_len == 0 {
            return Err(ConfigError::ZeroLimit("max_frame_len"));
        }

        let per_ms = self.bus_clock_hz / 1_000;
        let limits = [
            ("settle", SETTLE_MS),
            ("reset_hold", RESET_HOLD_MS),
            ("poll_period", POLL_PERIOD_MS),
            ("powerup_watchdog_ms", self.powerup_watchdog_ms),
            ("rx_watchdog_ms", self.rx_watchdog_ms),
        ];
        for (name, ms) in limits {
            if ms.checked_mul(per_ms).is_none() {
                return Err(ConfigError::LimitTooLarge(name));
            }
        }
        Ok(())
    }

    /// Tick divider ratio (system clock cycles per link tick)
    #[must_use]
    pub const fn tick_ratio(&self) -> u32 {
        self.system_clock_hz / self.bus_clock_hz
    }

    /// Protocol timings converted to ticks
    ///
    /// Saturates on a configuration that fails [`validate`](Self::validate).
    #[must_use]
    pub const fn timing(&self) -> Timing {
        let per_ms = self.bus_clock_hz / 1_000;
        Timing {
            settle: SETTLE_MS.saturating_mul(per_ms),
            reset_hold: RESET_HOLD_MS.saturating_mul(per_ms),
            poll_period: POLL_PERIOD_MS.saturating_mul(per_ms),
            powerup_watchdog: self.powerup_watchdog_ms.saturating_mul(per_ms),
            rx_watchdog: self.rx_watchdog_ms.saturating_mul(per_ms),
        }
    }
}

/// Protocol timings in link ticks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Settle delay after reset and before re-initialization
    pub settle: u32,
    /// Chip reset hold time
    pub reset_hold: u32,
    /// Status poll period
    pub poll_period: u32,
    /// Power-up watchdog threshold
    pub powerup_watchdog: u32,
    /// Receiver watchdog threshold
    pub rx_watchdog: u32,
}
