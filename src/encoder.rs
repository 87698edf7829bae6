//! RFM12 Register Encoding
//!
//! Pure functions that turn configuration values into the 16-bit
//! command words understood by the chip. This module is testable on
//! the host.
//!
//! # Theory of Operation
//!
//! Every RFM12 register is written with a single 16-bit command whose
//! high bits select the register and whose low bits carry its fields.
//! The carrier frequency and the bit rate are derived values:
//!
//! 1. Carrier: `f0 = 10 MHz × c1 × (c2 + F / 4000)`, with `c1`/`c2`
//!    fixed per band and `96 ≤ F ≤ 3903`
//! 2. Bit rate: `BR = 10 MHz / 29 / (R + 1) / (1 + 7 × cs)` with a
//!    7-bit `R` and an optional ÷8 prescaler `cs`

use bitflags::bitflags;

use crate::config::ConfigError;

/// PLL setting command (default PLL bandwidth, fast startup)
pub const PLL_SETTING: u16 = 0xCC77;

/// Wake-up timer command with the timer disabled
pub const WAKEUP_TIMER_OFF: u16 = 0xE000;

/// Low duty-cycle command with duty cycling disabled
pub const LOW_DUTY_CYCLE_OFF: u16 = 0xC800;

/// Frequency band selected in the configuration register
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Band {
    /// 433 MHz band
    Mhz433,
    /// 868 MHz band
    #[default]
    Mhz868,
    /// 915 MHz band
    Mhz915,
}

impl Band {
    /// Band field (bits 5..4 of the configuration command)
    const fn bits(self) -> u16 {
        match self {
            Self::Mhz433 => 0b01,
            Self::Mhz868 => 0b10,
            Self::Mhz915 => 0b11,
        }
    }

    /// Band multiplier `c1`
    const fn c1(self) -> u32 {
        match self {
            Self::Mhz433 => 1,
            Self::Mhz868 => 2,
            Self::Mhz915 => 3,
        }
    }

    /// Band offset `c2`
    const fn c2(self) -> u32 {
        match self {
            Self::Mhz433 | Self::Mhz868 => 43,
            Self::Mhz915 => 30,
        }
    }

    /// Lowest carrier the band can reach
    #[must_use]
    pub const fn min_hz(self) -> u32 {
        self.carrier_hz(FrequencyWord::MIN)
    }

    /// Highest carrier the band can reach
    #[must_use]
    pub const fn max_hz(self) -> u32 {
        self.carrier_hz(FrequencyWord::MAX)
    }

    /// Carrier produced by a given 12-bit frequency word
    #[must_use]
    pub const fn carrier_hz(self, f: u16) -> u32 {
        2_500 * self.c1() * (4_000 * self.c2() + f as u32)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Band {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Mhz433 => defmt::write!(f, "433MHz"),
            Self::Mhz868 => defmt::write!(f, "868MHz"),
            Self::Mhz915 => defmt::write!(f, "915MHz"),
        }
    }
}

/// Crystal load capacitance, 8.5 pF to 16 pF in 0.5 pF steps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrystalLoad(u8);

impl CrystalLoad {
    /// Smallest load in tenths of a picofarad
    pub const MIN_TENTHS_PF: u16 = 85;

    /// Largest load in tenths of a picofarad
    pub const MAX_TENTHS_PF: u16 = 160;

    /// Create from tenths of a picofarad, returns None if not representable
    #[must_use]
    pub const fn from_tenths_pf(tenths: u16) -> Option<Self> {
        if tenths < Self::MIN_TENTHS_PF || tenths > Self::MAX_TENTHS_PF || tenths % 5 != 0 {
            None
        } else {
            Some(Self(((tenths - Self::MIN_TENTHS_PF) / 5) as u8))
        }
    }

    /// Load field (bits 3..0 of the configuration command)
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Capacitance in tenths of a picofarad
    #[must_use]
    pub const fn tenths_pf(self) -> u16 {
        Self::MIN_TENTHS_PF + self.0 as u16 * 5
    }
}

impl Default for CrystalLoad {
    fn default() -> Self {
        // 12.0 pF
        Self(7)
    }
}

/// Limits of the 12-bit frequency word
struct FrequencyWord;

impl FrequencyWord {
    const MIN: u16 = 96;
    const MAX: u16 = 3903;
}

/// Configuration command: band, load, TX register and RX FIFO enabled
#[must_use]
pub const fn configuration(band: Band, load: CrystalLoad) -> u16 {
    0x8000 | 0x0080 | 0x0040 | band.bits() << 4 | load.code() as u16
}

bitflags! {
    /// Power management command fields
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct PowerFlags: u8 {
        /// Receiver chain (`er`)
        const RECEIVER = 0x80;
        /// Baseband block (`ebb`)
        const BASEBAND = 0x40;
        /// Transmitter PLL and PA (`et`)
        const TRANSMITTER = 0x20;
        /// Synthesizer (`es`)
        const SYNTHESIZER = 0x10;
        /// Crystal oscillator (`ex`)
        const CRYSTAL = 0x08;
        /// Low battery detector (`eb`)
        const LOW_BATTERY = 0x04;
        /// Wake-up timer (`ew`)
        const WAKEUP = 0x02;
        /// Clock output disabled (`dc`)
        const CLOCK_OUTPUT_OFF = 0x01;
    }
}

impl PowerFlags {
    /// Full receive chain
    pub const RECEIVE: Self = Self::RECEIVER
        .union(Self::BASEBAND)
        .union(Self::SYNTHESIZER)
        .union(Self::CRYSTAL);

    /// Transmitter with its synthesizer
    pub const TRANSMIT: Self = Self::TRANSMITTER
        .union(Self::SYNTHESIZER)
        .union(Self::CRYSTAL);

    /// Crystal only, receiver and transmitter off
    pub const STANDBY: Self = Self::CRYSTAL;

    /// Everything off
    pub const SLEEP: Self = Self::empty();
}

/// Power management command
#[must_use]
pub const fn power_management(flags: PowerFlags) -> u16 {
    0x8200 | flags.bits() as u16
}

/// Frequency command for a carrier in Hz
///
/// # Errors
/// `FrequencyOutOfBand` if the carrier is outside the band's range.
pub fn frequency(band: Band, hz: u32) -> Result<u16, ConfigError> {
    if hz < band.min_hz() || hz > band.max_hz() {
        return Err(ConfigError::FrequencyOutOfBand { hz });
    }
    let f = hz / (2_500 * band.c1()) - 4_000 * band.c2();
    Ok(0xA000 | f as u16)
}

/// Slowest bit rate reachable with the ÷8 prescaler
pub const MIN_DATA_RATE: u32 = 337;

/// Fastest bit rate supported by the chip
pub const MAX_DATA_RATE: u32 = 115_200;

/// Data rate command for a bit rate in baud
///
/// Uses the ÷8 prescaler only when `R` does not fit in 7 bits without it.
///
/// # Errors
/// `DataRateOutOfRange` outside `MIN_DATA_RATE..=MAX_DATA_RATE`.
pub fn data_rate(baud: u32) -> Result<u16, ConfigError> {
    if !(MIN_DATA_RATE..=MAX_DATA_RATE).contains(&baud) {
        return Err(ConfigError::DataRateOutOfRange { baud });
    }

    // R + 1 = round(10 MHz / 29 / prescaler / baud)
    let divisor = |prescale: u32| {
        let denom = 29 * prescale * baud;
        (10_000_000 + denom / 2) / denom
    };

    let direct = divisor(1);
    if (1..=128).contains(&direct) {
        return Ok(0xC600 | (direct - 1) as u16);
    }

    let scaled = divisor(8);
    if (1..=128).contains(&scaled) {
        Ok(0xC600 | 0x0080 | (scaled - 1) as u16)
    } else {
        Err(ConfigError::DataRateOutOfRange { baud })
    }
}

/// Response time of the valid data indicator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VdiResponse {
    /// Fast
    #[default]
    Fast,
    /// Medium
    Medium,
    /// Slow
    Slow,
    /// Always on
    Always,
}

/// Receiver baseband bandwidth
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Bandwidth {
    /// 400 kHz
    Khz400,
    /// 340 kHz
    Khz340,
    /// 270 kHz
    Khz270,
    /// 200 kHz
    Khz200,
    /// 134 kHz
    #[default]
    Khz134,
    /// 67 kHz
    Khz67,
}

impl Bandwidth {
    const fn bits(self) -> u16 {
        match self {
            Self::Khz400 => 0b001,
            Self::Khz340 => 0b010,
            Self::Khz270 => 0b011,
            Self::Khz200 => 0b100,
            Self::Khz134 => 0b101,
            Self::Khz67 => 0b110,
        }
    }
}

/// LNA gain relative to maximum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LnaGain {
    /// 0 dB
    #[default]
    Max,
    /// -6 dB
    Minus6,
    /// -14 dB
    Minus14,
    /// -20 dB
    Minus20,
}

/// RSSI detector threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RssiThreshold {
    /// -103 dBm
    #[default]
    Dbm103,
    /// -97 dBm
    Dbm97,
    /// -91 dBm
    Dbm91,
    /// -85 dBm
    Dbm85,
    /// -79 dBm
    Dbm79,
    /// -73 dBm
    Dbm73,
}

/// Receiver control fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiverSettings {
    /// Pin 16 drives the valid data indicator instead of the interrupt input
    pub vdi_output: bool,
    /// VDI response time
    pub vdi_response: VdiResponse,
    /// Baseband bandwidth
    pub bandwidth: Bandwidth,
    /// LNA gain
    pub lna_gain: LnaGain,
    /// RSSI threshold
    pub rssi_threshold: RssiThreshold,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            vdi_output: true,
            vdi_response: VdiResponse::default(),
            bandwidth: Bandwidth::default(),
            lna_gain: LnaGain::default(),
            rssi_threshold: RssiThreshold::default(),
        }
    }
}

/// Receiver control command
#[must_use]
pub const fn receiver_control(settings: &ReceiverSettings) -> u16 {
    0x9000
        | (settings.vdi_output as u16) << 10
        | (settings.vdi_response as u16) << 8
        | settings.bandwidth.bits() << 5
        | (settings.lna_gain as u16) << 3
        | settings.rssi_threshold as u16
}

/// Clock recovery / data filter type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterType {
    /// Digital filter
    #[default]
    Digital,
    /// Analog RC filter
    Analog,
}

/// Data filter fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataFilterSettings {
    /// Clock recovery auto lock
    pub auto_lock: bool,
    /// Clock recovery fast mode
    pub fast_lock: bool,
    /// Filter type
    pub filter: FilterType,
    /// Data quality detector threshold (0-7)
    pub dqd_threshold: u8,
}

impl Default for DataFilterSettings {
    fn default() -> Self {
        Self {
            auto_lock: true,
            fast_lock: false,
            filter: FilterType::Digital,
            dqd_threshold: 4,
        }
    }
}

/// Data filter command
///
/// # Errors
/// `InvalidField` if the DQD threshold does not fit in 3 bits.
pub fn data_filter(settings: &DataFilterSettings) -> Result<u16, ConfigError> {
    if settings.dqd_threshold > 7 {
        return Err(ConfigError::InvalidField("dqd_threshold"));
    }
    Ok(0xC228
        | u16::from(settings.auto_lock) << 7
        | u16::from(settings.fast_lock) << 6
        | (settings.filter as u16) << 4
        | u16::from(settings.dqd_threshold))
}

/// When the receiver FIFO starts filling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FifoFillStart {
    /// After the sync pattern
    #[default]
    SyncWord,
    /// Immediately
    Always,
}

/// FIFO and reset mode fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FifoSettings {
    /// Bits received before the FIFO interrupt fires (0-15)
    pub interrupt_level: u8,
    /// Fill start condition
    pub fill_start: FifoFillStart,
    /// One-byte sync pattern (RFM12B)
    pub short_sync: bool,
    /// Keep the sensitive (glitch-triggered) reset enabled
    pub sensitive_reset: bool,
    /// Sync byte matched after the fixed `0x2D`
    pub sync_byte: u8,
}

impl Default for FifoSettings {
    fn default() -> Self {
        Self {
            interrupt_level: 8,
            fill_start: FifoFillStart::SyncWord,
            short_sync: false,
            sensitive_reset: false,
            sync_byte: 0xD4,
        }
    }
}

/// FIFO and reset mode command, with FIFO fill on or off
///
/// # Errors
/// `InvalidField` if the interrupt level does not fit in 4 bits.
pub fn fifo_mode(settings: &FifoSettings, fill: bool) -> Result<u16, ConfigError> {
    if settings.interrupt_level > 15 {
        return Err(ConfigError::InvalidField("interrupt_level"));
    }
    Ok(0xCA00
        | u16::from(settings.interrupt_level) << 4
        | u16::from(settings.short_sync) << 3
        | (settings.fill_start as u16) << 2
        | u16::from(fill) << 1
        | u16::from(!settings.sensitive_reset))
}

/// Sync pattern command
#[must_use]
pub const fn sync_pattern(byte: u8) -> u16 {
    0xCE00 | byte as u16
}

/// Automatic frequency control mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AfcMode {
    /// Controlled by the microcontroller strobe
    Manual,
    /// Runs once after power-up
    Once,
    /// Keeps the offset while the VDI is high
    #[default]
    KeepWhileReceiving,
    /// Runs independently of the VDI
    Independent,
}

/// AFC range limit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AfcRange {
    /// No restriction
    #[default]
    Unlimited,
    /// +15 / -16 frequency steps
    Steps16,
    /// +7 / -8 frequency steps
    Steps8,
    /// +3 / -4 frequency steps
    Steps4,
}

/// AFC fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AfcSettings {
    /// Mode
    pub mode: AfcMode,
    /// Range limit
    pub range: AfcRange,
    /// Strobe edge
    pub strobe: bool,
    /// High accuracy (fine) mode
    pub fine: bool,
    /// Offset register enabled
    pub output: bool,
    /// AFC enabled
    pub enabled: bool,
}

impl Default for AfcSettings {
    fn default() -> Self {
        Self {
            mode: AfcMode::KeepWhileReceiving,
            range: AfcRange::Unlimited,
            strobe: false,
            fine: false,
            output: true,
            enabled: true,
        }
    }
}

/// AFC command
#[must_use]
pub const fn afc(settings: &AfcSettings) -> u16 {
    0xC400
        | (settings.mode as u16) << 6
        | (settings.range as u16) << 4
        | (settings.strobe as u16) << 3
        | (settings.fine as u16) << 2
        | (settings.output as u16) << 1
        | settings.enabled as u16
}

/// Transmitter fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxSettings {
    /// FSK deviation in Hz (15 kHz to 240 kHz in 15 kHz steps)
    pub deviation_hz: u32,
    /// Invert the FSK shift
    pub inverted: bool,
    /// Output attenuation in 2.5 dB steps (0-7)
    pub attenuation: u8,
}

impl TxSettings {
    /// Deviation step
    pub const DEVIATION_STEP_HZ: u32 = 15_000;
}

impl Default for TxSettings {
    fn default() -> Self {
        Self {
            deviation_hz: 90_000,
            inverted: false,
            attenuation: 0,
        }
    }
}

/// TX configuration command
///
/// # Errors
/// `DeviationInvalid` or `InvalidField` for out-of-range values.
pub fn tx_config(settings: &TxSettings) -> Result<u16, ConfigError> {
    let step = TxSettings::DEVIATION_STEP_HZ;
    let dev = settings.deviation_hz;
    if dev < step || dev > 16 * step || dev % step != 0 {
        return Err(ConfigError::DeviationInvalid { hz: dev });
    }
    if settings.attenuation > 7 {
        return Err(ConfigError::InvalidField("attenuation"));
    }
    let m = (dev / step - 1) as u16;
    Ok(0x9800 | u16::from(settings.inverted) << 8 | m << 4 | u16::from(settings.attenuation))
}
