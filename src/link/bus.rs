//! Bus Transaction Engine
//!
//! Moves one 16-bit command word across the serial bus per transaction
//! and captures the 16 bits shifted back from the chip.
//!
//! Most commands take two byte shifts. A receiver FIFO read
//! (`0xB0xx`) takes three: the FIFO byte appears in the second shift,
//! so the engine shifts a padding byte and keeps the second byte as the
//! result's high half.
//!
//! The engine never starts a transaction on its own. It exposes a
//! narrow handshake: `ready`, a one-tick `valid` pulse and the result.

use crate::shift::ShiftPort;
use crate::types::Instruction;

/// Engine state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BusState {
    /// Waiting for the shift port to go idle after reset
    #[default]
    Start,
    /// Ready for an instruction
    Idle,
    /// Select the chip, shift the high byte
    Write0,
    /// Shift the low byte (or FIFO-read padding)
    Write1,
    /// Start the pending one-byte shift
    Wait0,
    /// Wait for the shift to complete
    Wait1,
    /// Latch the result, deselect, pulse valid
    Valid,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BusState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Start => defmt::write!(f, "Start"),
            Self::Idle => defmt::write!(f, "Idle"),
            Self::Write0 => defmt::write!(f, "Write0"),
            Self::Write1 => defmt::write!(f, "Write1"),
            Self::Wait0 => defmt::write!(f, "Wait0"),
            Self::Wait1 => defmt::write!(f, "Wait1"),
            Self::Valid => defmt::write!(f, "Valid"),
        }
    }
}

/// Request from the link controller for one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BusRequest {
    /// Start a transaction with `instruction` this tick
    pub write_enable: bool,
    /// Command word to send
    pub instruction: Instruction,
}

impl BusRequest {
    /// No request
    pub const NONE: Self = Self {
        write_enable: false,
        instruction: Instruction::READ_STATUS,
    };

    /// Request a transaction
    #[must_use]
    pub const fn issue(instruction: Instruction) -> Self {
        Self {
            write_enable: true,
            instruction,
        }
    }
}

/// Engine outputs as seen by the link controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BusStatus {
    /// Ready for the next instruction
    pub ready: bool,
    /// `data` holds a completed transaction's result (one tick)
    pub valid: bool,
    /// 16 bits shifted in from the chip
    pub data: u16,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BusStatus {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Bus(rdy={}, valid={}, 0x{=u16:04X})",
            self.ready,
            self.valid,
            self.data
        );
    }
}

/// Bus transaction engine
#[derive(Clone, Debug, Default)]
pub struct BusEngine {
    state: BusState,
    /// State to enter after the Wait0/Wait1 detour
    resume: BusState,
    /// Instruction latched in Idle
    latch: Instruction,
    /// Byte handed to the port in Wait0
    outgoing: u8,
    /// Byte captured in Wait1
    incoming: u8,
    /// Transaction result being assembled
    result: u16,
    /// The latched instruction still owes the FIFO-read extra byte
    extra_byte: bool,
    ready: bool,
    valid: bool,
    selected: bool,
}

impl BusEngine {
    /// Create an engine in its reset state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: BusState::Start,
            resume: BusState::Start,
            latch: Instruction::READ_STATUS,
            outgoing: 0,
            incoming: 0,
            result: 0,
            extra_byte: false,
            ready: false,
            valid: false,
            selected: false,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> BusState {
        self.state
    }

    /// Outputs registered by the last step
    #[must_use]
    pub const fn status(&self) -> BusStatus {
        BusStatus {
            ready: self.ready,
            valid: self.valid,
            data: self.result,
        }
    }

    /// Check if the chip is selected
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Advance one tick
    pub fn step<P: ShiftPort>(&mut self, request: BusRequest, port: &mut P) -> BusStatus {
        self.valid = false;

        match self.state {
            BusState::Start => {
                // Drain a shift left over from before a reset
                let _ = port.poll();
                if port.is_ready() {
                    self.state = BusState::Idle;
                }
            }

            BusState::Idle => {
                if request.write_enable {
                    self.latch = request.instruction;
                    self.extra_byte = request.instruction.is_fifo_read();
                    self.state = BusState::Write0;
                }
            }

            BusState::Write0 => {
                self.set_select(port, true);
                self.outgoing = self.latch.high();
                self.resume = BusState::Write1;
                self.state = BusState::Wait0;
            }

            BusState::Write1 => {
                // The byte just completed becomes the high half; for a
                // FIFO read that is overwritten by the second shift.
                self.result = u16::from(self.incoming) << 8;
                if self.extra_byte {
                    self.extra_byte = false;
                    self.outgoing = self.latch.low();
                    self.resume = BusState::Write1;
                } else {
                    self.outgoing = if self.latch.is_fifo_read() {
                        0x00
                    } else {
                        self.latch.low()
                    };
                    self.resume = BusState::Valid;
                }
                self.state = BusState::Wait0;
            }

            BusState::Wait0 => {
                port.start(self.outgoing);
                self.state = BusState::Wait1;
            }

            BusState::Wait1 => {
                if let Some(byte) = port.poll() {
                    self.incoming = byte;
                    self.state = self.resume;
                }
            }

            BusState::Valid => {
                self.result = (self.result & 0xFF00) | u16::from(self.incoming);
                self.set_select(port, false);
                self.valid = true;
                self.state = BusState::Idle;
            }
        }

        self.ready = match self.state {
            BusState::Start => port.is_ready(),
            BusState::Idle => true,
            _ => false,
        };

        self.status()
    }

    fn set_select<P: ShiftPort>(&mut self, port: &mut P, selected: bool) {
        self.selected = selected;
        port.select(selected);
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for BusEngine {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "BusEngine({}, {})", self.state, self.latch);
    }
}
