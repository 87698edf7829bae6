//! Shared types used across the RFM12 link driver
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and keep raw bit patterns out of the state machines.

use core::fmt;

use bitflags::bitflags;

/// A 16-bit command word sent to the chip
///
/// The high byte selects the command, the low byte (or the low
/// bits of the word) carries its payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instruction(u16);

impl Instruction {
    /// Status read (`0x0000`), shifts the status word out of the chip
    pub const READ_STATUS: Self = Self(0x0000);

    /// Receiver FIFO read (`0xB000`)
    pub const READ_FIFO: Self = Self(0xB000);

    /// Transmit register write without payload (`0xB800`)
    pub const WRITE_FIFO: Self = Self(0xB800);

    /// Command byte that needs the extra FIFO-read byte on the bus
    pub const FIFO_READ_OPCODE: u8 = 0xB0;

    /// Wrap a raw command word
    #[must_use]
    pub const fn new(word: u16) -> Self {
        Self(word)
    }

    /// Transmit register write carrying `byte`
    #[must_use]
    pub const fn write_fifo(byte: u8) -> Self {
        Self(Self::WRITE_FIFO.0 | byte as u16)
    }

    /// Raw command word
    #[must_use]
    pub const fn word(self) -> u16 {
        self.0
    }

    /// High byte (first on the wire)
    #[must_use]
    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Low byte (second on the wire)
    #[must_use]
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    /// Check whether this is a receiver FIFO read
    #[must_use]
    pub const fn is_fifo_read(self) -> bool {
        self.high() == Self::FIFO_READ_OPCODE
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instruction(0x{:04X})", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Instruction {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{=u16:04X}", self.0);
    }
}

bitflags! {
    /// Status word returned by [`Instruction::READ_STATUS`]
    ///
    /// Only `READY`, `POWER_ON_RESET` and `CHANNEL_BUSY` drive the link
    /// controller. The rest are named for diagnostics.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct StatusWord: u16 {
        /// RX: FIFO holds data. TX: transmit register ready for the next byte
        const READY = 1 << 15;
        /// Power-on reset detected
        const POWER_ON_RESET = 1 << 14;
        /// RX FIFO overflow / TX register underrun
        const OVERFLOW = 1 << 13;
        /// Wake-up timer overflow
        const WAKEUP = 1 << 12;
        /// Interrupt on the external interrupt pin
        const EXTERNAL = 1 << 11;
        /// Supply below the low battery threshold
        const LOW_BATTERY = 1 << 10;
        /// FIFO empty
        const FIFO_EMPTY = 1 << 9;
        /// Channel busy (RSSI above threshold / valid data indicator)
        const CHANNEL_BUSY = 1 << 8;
        /// Data quality detector output
        const DATA_QUALITY = 1 << 7;
        /// Clock recovery locked
        const CLOCK_LOCKED = 1 << 6;

        const _ = !0;
    }
}

impl StatusWord {
    /// Build from a raw word, keeping every bit
    #[must_use]
    pub const fn from_word(word: u16) -> Self {
        Self::from_bits_retain(word)
    }

    /// Check the ready / data-available bit
    #[must_use]
    pub const fn is_ready(self) -> bool {
        self.contains(Self::READY)
    }

    /// Check the power-on reset bit
    #[must_use]
    pub const fn is_power_on_reset(self) -> bool {
        self.contains(Self::POWER_ON_RESET)
    }

    /// Check the channel-busy bit
    #[must_use]
    pub const fn is_channel_busy(self) -> bool {
        self.contains(Self::CHANNEL_BUSY)
    }

    /// High byte of the raw word
    #[must_use]
    pub const fn high(self) -> u8 {
        (self.bits() >> 8) as u8
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for StatusWord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Status(0x{=u16:04X})", self.bits());
    }
}

/// Power mode requested by the layer above
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PowerMode {
    /// Receiver on with periodic channel polling
    #[default]
    Active,
    /// Receiver on, interrupt driven only
    ReceiveOnly,
    /// Receiver and transmitter off, chip asleep
    Shutdown,
    /// Reserved encoding (`0b11`), no defined behaviour
    Reserved,
}

impl PowerMode {
    /// Decode from the 2-bit interface field (upper bits ignored)
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Active,
            0b01 => Self::ReceiveOnly,
            0b10 => Self::Shutdown,
            _ => Self::Reserved,
        }
    }

    /// Encode to the 2-bit interface field
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Active => 0b00,
            Self::ReceiveOnly => 0b01,
            Self::Shutdown => 0b10,
            Self::Reserved => 0b11,
        }
    }

    /// Check if the chip should be awake for this mode
    #[must_use]
    pub const fn wakes_receiver(self) -> bool {
        matches!(self, Self::Active | Self::ReceiveOnly)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PowerMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Active => defmt::write!(f, "ACTIVE"),
            Self::ReceiveOnly => defmt::write!(f, "RX-ONLY"),
            Self::Shutdown => defmt::write!(f, "SHUTDOWN"),
            Self::Reserved => defmt::write!(f, "RESERVED"),
        }
    }
}

/// Per-tick signals from the data-link layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinkInputs {
    /// Byte to transmit
    pub data_out: u8,
    /// A frame is in progress
    pub frame_active: bool,
    /// Transmit `data_out` now (only honoured while the channel is free)
    pub write_enable: bool,
    /// Expected receive frame length, may change mid-frame
    pub frame_length: u8,
    /// Requested power mode
    pub power_mode: PowerMode,
}

impl LinkInputs {
    /// Idle inputs for the given frame length
    #[must_use]
    pub const fn idle(frame_length: u8) -> Self {
        Self {
            data_out: 0,
            frame_active: false,
            write_enable: false,
            frame_length,
            power_mode: PowerMode::Active,
        }
    }

    /// Same inputs with another power mode
    #[must_use]
    pub const fn with_power_mode(self, power_mode: PowerMode) -> Self {
        Self { power_mode, ..self }
    }

    /// Same inputs writing `byte` inside an active frame
    #[must_use]
    pub const fn writing(self, byte: u8) -> Self {
        Self {
            data_out: byte,
            frame_active: true,
            write_enable: true,
            ..self
        }
    }

    /// Check if the caller wants to transmit this tick
    #[must_use]
    pub const fn wants_write(&self) -> bool {
        self.frame_active && self.write_enable
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkInputs {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "In(frame={}, we={}, len={}, {})",
            self.frame_active,
            self.write_enable,
            self.frame_length,
            self.power_mode
        );
    }
}

/// Per-tick signals to the data-link layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinkOutputs {
    /// A new transmission may start (or the next byte may be written)
    pub channel_free: bool,
    /// Last received byte
    pub data_in: u8,
    /// `data_in` holds a new byte this tick
    pub data_valid: bool,
}

impl LinkOutputs {
    /// Received byte, if one arrived this tick
    #[must_use]
    pub const fn received(&self) -> Option<u8> {
        if self.data_valid {
            Some(self.data_in)
        } else {
            None
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkOutputs {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Out(free={}, valid={}, data=0x{=u8:02X})",
            self.channel_free,
            self.data_valid,
            self.data_in
        );
    }
}
