//! Instruction Set
//!
//! The fixed command words the link controller issues, built once from
//! a [`RadioConfig`]. The initialization sequence is an ordered,
//! versioned table so encoder changes never touch the controller.

use crate::config::{ConfigError, RadioConfig};
use crate::encoder::{self, PowerFlags};
use crate::types::Instruction;

/// Layout version of [`InstructionSet::init`]
pub const INIT_TABLE_VERSION: u8 = 1;

/// Number of initialization commands
pub const INIT_TABLE_LEN: usize = 12;

/// Meaning of each initialization table slot, in issue order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitStep {
    /// Band, crystal load, TX register and FIFO enable
    Configuration,
    /// Crystal on, receiver and transmitter off
    PowerStandby,
    /// Carrier frequency
    Frequency,
    /// Bit rate
    DataRate,
    /// Receiver bandwidth, gain and RSSI threshold
    ReceiverControl,
    /// Data filter and clock recovery
    DataFilter,
    /// FIFO mode with fill disabled
    FifoMode,
    /// Sync pattern
    SyncPattern,
    /// Automatic frequency control
    Afc,
    /// Deviation and output power
    TxConfig,
    /// PLL setting
    Pll,
    /// Wake-up timer off
    WakeupTimer,
}

impl InitStep {
    /// All steps in issue order
    pub const ORDER: [Self; INIT_TABLE_LEN] = [
        Self::Configuration,
        Self::PowerStandby,
        Self::Frequency,
        Self::DataRate,
        Self::ReceiverControl,
        Self::DataFilter,
        Self::FifoMode,
        Self::SyncPattern,
        Self::Afc,
        Self::TxConfig,
        Self::Pll,
        Self::WakeupTimer,
    ];
}

#[cfg(feature = "embedded")]
impl defmt::Format for InitStep {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.name());
    }
}

impl InitStep {
    /// Short name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Configuration => "config",
            Self::PowerStandby => "power",
            Self::Frequency => "freq",
            Self::DataRate => "rate",
            Self::ReceiverControl => "rx-ctrl",
            Self::DataFilter => "filter",
            Self::FifoMode => "fifo",
            Self::SyncPattern => "sync",
            Self::Afc => "afc",
            Self::TxConfig => "tx-cfg",
            Self::Pll => "pll",
            Self::WakeupTimer => "wakeup",
        }
    }
}

/// Every command word the controller needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionSet {
    init: [Instruction; INIT_TABLE_LEN],
    /// Power state: sleep (everything off)
    pub sleep: Instruction,
    /// Power state: receive chain on
    pub receiver_on: Instruction,
    /// Power state: crystal only
    pub receiver_off: Instruction,
    /// Power state: transmitter on
    pub transmitter_on: Instruction,
    /// FIFO mode with fill disabled (drops the current frame)
    pub clear_fifo: Instruction,
    /// FIFO mode with fill enabled (arms sync detection)
    pub enable_fifo: Instruction,
}

impl InstructionSet {
    /// Encode every command from the configuration
    ///
    /// # Errors
    /// The first configuration value the encoder rejects.
    pub fn from_config(config: &RadioConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let dc = if config.clock_output_disabled {
            PowerFlags::CLOCK_OUTPUT_OFF
        } else {
            PowerFlags::empty()
        };
        let power = |flags: PowerFlags| Instruction::new(encoder::power_management(flags | dc));

        let clear_fifo = Instruction::new(encoder::fifo_mode(&config.fifo, false)?);
        let enable_fifo = Instruction::new(encoder::fifo_mode(&config.fifo, true)?);
        let receiver_off = power(PowerFlags::STANDBY);

        let mut init = [Instruction::READ_STATUS; INIT_TABLE_LEN];
        for (slot, step) in init.iter_mut().zip(InitStep::ORDER) {
            *slot = match step {
                InitStep::Configuration => {
                    Instruction::new(encoder::configuration(config.band, config.crystal_load))
                }
                InitStep::PowerStandby => receiver_off,
                InitStep::Frequency => {
                    Instruction::new(encoder::frequency(config.band, config.frequency_hz)?)
                }
                InitStep::DataRate => Instruction::new(encoder::data_rate(config.data_rate)?),
                InitStep::ReceiverControl => {
                    Instruction::new(encoder::receiver_control(&config.receiver))
                }
                InitStep::DataFilter => Instruction::new(encoder::data_filter(&config.data_filter)?),
                InitStep::FifoMode => clear_fifo,
                InitStep::SyncPattern => {
                    Instruction::new(encoder::sync_pattern(config.fifo.sync_byte))
                }
                InitStep::Afc => Instruction::new(encoder::afc(&config.afc)),
                InitStep::TxConfig => Instruction::new(encoder::tx_config(&config.tx)?),
                InitStep::Pll => Instruction::new(encoder::PLL_SETTING),
                InitStep::WakeupTimer => Instruction::new(encoder::WAKEUP_TIMER_OFF),
            };
        }

        Ok(Self {
            init,
            sleep: power(PowerFlags::SLEEP),
            receiver_on: power(PowerFlags::RECEIVE),
            receiver_off,
            transmitter_on: power(PowerFlags::TRANSMIT),
            clear_fifo,
            enable_fifo,
        })
    }

    /// Initialization table in issue order
    #[must_use]
    pub const fn init(&self) -> &[Instruction; INIT_TABLE_LEN] {
        &self.init
    }

    /// Command for one initialization step
    #[must_use]
    pub fn init_step(&self, step: InitStep) -> Instruction {
        self.init[step as usize]
    }
}
