//! Link Controller
//!
//! Decides what the chip does next: initialization, interrupt service
//! and status polling, receive/transmit arbitration, power modes and
//! recovery from unexpected resets.
//!
//! The controller issues one instruction at a time to the
//! [`BusEngine`](super::bus::BusEngine) and waits for `ready` or `valid`
//! before the next. `Wait`, `Delay`/`DelayWait`, `ReadStatus` and
//! `ReadData` are shared states: the caller stores a resume state and
//! they jump back to it when done. There is no call stack.
//!
//! `Idle` evaluates its concerns in a fixed order every tick and the
//! last one to choose a transition wins:
//!
//! 1. power-up watchdog
//! 2. receiver watchdog
//! 3. periodic status poll (Active mode)
//! 4. interrupt service
//! 5. transmit admission
//! 6. status consumption
//! 7. shutdown request

use crate::config::{RadioConfig, Timing};
use crate::link::bus::{BusRequest, BusStatus};
use crate::link::table::{InstructionSet, INIT_TABLE_LEN};
use crate::types::{Instruction, LinkInputs, LinkOutputs, PowerMode, StatusWord};

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Chip held in reset until the bus engine is ready
    #[default]
    Start,
    /// Chip reset forced by the power-up or transmit watchdog
    Reset,
    /// Dispatcher
    Idle,
    /// Pushing the initialization table
    Init,
    /// Load the settle delay
    Delay,
    /// Count the settle delay down, then resume
    DelayWait,
    /// Wait for a status word, then resume
    ReadStatus,
    /// Wait for a FIFO byte, then resume
    ReadData,
    /// Disable FIFO fill (drop the frame)
    ClearFifo,
    /// Re-enable FIFO fill (arm sync detection)
    AcceptData,
    /// Wait for the bus engine, then resume
    Wait,
    /// Chip asleep until the power mode wakes it
    Sleep,
    /// Transmitter on, waiting for the chip to take the first byte
    TransmitWait,
    /// Streaming frame bytes to the chip
    Transmit,
    /// Switch the transmitter on
    TransmitOn,
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Start => defmt::write!(f, "Start"),
            Self::Reset => defmt::write!(f, "Reset"),
            Self::Idle => defmt::write!(f, "Idle"),
            Self::Init => defmt::write!(f, "Init"),
            Self::Delay => defmt::write!(f, "Delay"),
            Self::DelayWait => defmt::write!(f, "DelayWait"),
            Self::ReadStatus => defmt::write!(f, "ReadStatus"),
            Self::ReadData => defmt::write!(f, "ReadData"),
            Self::ClearFifo => defmt::write!(f, "ClearFifo"),
            Self::AcceptData => defmt::write!(f, "AcceptData"),
            Self::Wait => defmt::write!(f, "Wait"),
            Self::Sleep => defmt::write!(f, "Sleep"),
            Self::TransmitWait => defmt::write!(f, "TransmitWait"),
            Self::Transmit => defmt::write!(f, "Transmit"),
            Self::TransmitOn => defmt::write!(f, "TransmitOn"),
        }
    }
}

/// Everything the controller drives for one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinkStep {
    /// Request to the bus engine
    pub request: BusRequest,
    /// Signals to the layer above
    pub outputs: LinkOutputs,
    /// Chip reset asserted
    pub chip_reset: bool,
}

/// Fixed parameters, kept across a synchronous reset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LinkParams {
    set: InstructionSet,
    timing: Timing,
    max_frame_len: u8,
    status_echo: bool,
}

/// Link controller
#[derive(Clone, Debug)]
pub struct LinkController {
    params: LinkParams,
    state: LinkState,
    /// Where the shared states return to
    resume: LinkState,
    powered_up: bool,
    irq_enabled: bool,
    /// Power-up watchdog or poll timer in `Idle`, hold time in `Reset`,
    /// table index in `Init`
    counter: u32,
    delay: u32,
    /// Ticks since the last FIFO byte of a partial frame
    rx_idle: u32,
    rx_count: u8,
    tx_byte: u8,
    status: StatusWord,
    status_new: bool,
    data_in: u8,
}

impl LinkController {
    /// Create a controller in its reset state
    #[must_use]
    pub fn new(set: InstructionSet, config: &RadioConfig) -> Self {
        Self::from_params(LinkParams {
            set,
            timing: config.timing(),
            max_frame_len: config.max_frame_len,
            status_echo: config.status_echo,
        })
    }

    const fn from_params(params: LinkParams) -> Self {
        Self {
            params,
            state: LinkState::Start,
            resume: LinkState::Start,
            powered_up: false,
            irq_enabled: false,
            counter: 0,
            delay: 0,
            rx_idle: 0,
            rx_count: 0,
            tx_byte: 0,
            status: StatusWord::empty(),
            status_new: false,
            data_in: 0,
        }
    }

    /// Return to the initial state, clearing every register
    pub fn reset(&mut self) {
        *self = Self::from_params(self.params);
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// Check if the chip has been initialized
    #[must_use]
    pub const fn is_powered_up(&self) -> bool {
        self.powered_up
    }

    /// Check if interrupt service is enabled
    #[must_use]
    pub const fn interrupts_enabled(&self) -> bool {
        self.irq_enabled
    }

    /// Last status word read from the chip
    #[must_use]
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if a fetched status word is still unconsumed
    #[must_use]
    pub const fn has_new_status(&self) -> bool {
        self.status_new
    }

    /// Bytes read from the FIFO in the current frame
    #[must_use]
    pub const fn rx_count(&self) -> u8 {
        self.rx_count
    }

    /// Instruction set in use
    #[must_use]
    pub const fn instruction_set(&self) -> &InstructionSet {
        &self.params.set
    }

    /// Tick timings in use
    #[must_use]
    pub const fn timing(&self) -> &Timing {
        &self.params.timing
    }

    /// Advance one tick
    ///
    /// `irq_asserted` is the chip's interrupt line (logical, active
    /// high). `bus` holds the engine outputs from the previous tick.
    pub fn step(&mut self, inputs: &LinkInputs, irq_asserted: bool, bus: BusStatus) -> LinkStep {
        let mut step = LinkStep::default();
        let irq = irq_asserted && self.irq_enabled;

        match self.state {
            LinkState::Start => {
                if bus.ready {
                    self.powered_up = false;
                    self.irq_enabled = true;
                    self.counter = 0;
                    self.resume = LinkState::Idle;
                    self.enter(LinkState::Delay);
                }
            }

            LinkState::Reset => {
                self.counter += 1;
                if self.counter >= self.params.timing.reset_hold {
                    self.counter = 0;
                    self.irq_enabled = true;
                    self.enter(LinkState::Idle);
                }
            }

            LinkState::Idle => self.idle(inputs, irq, bus, &mut step),

            LinkState::Init => {
                if bus.ready {
                    let index = self.counter as usize;
                    if index < INIT_TABLE_LEN {
                        step.request = BusRequest::issue(self.params.set.init()[index]);
                        self.counter += 1;
                    } else {
                        self.powered_up = true;
                        self.counter = 0;
                        step.request = BusRequest::issue(self.params.set.receiver_on);
                        self.resume = LinkState::ClearFifo;
                        self.enter(LinkState::Wait);
                        #[cfg(feature = "embedded")]
                        defmt::info!("link: chip initialized");
                    }
                }
            }

            LinkState::Delay => {
                self.delay = self.params.timing.settle;
                self.enter(LinkState::DelayWait);
            }

            LinkState::DelayWait => {
                if self.delay == 0 {
                    self.enter(self.resume);
                } else {
                    self.delay -= 1;
                }
            }

            LinkState::ReadStatus => {
                if bus.valid {
                    self.status = StatusWord::from_word(bus.data);
                    self.status_new = true;
                    self.enter(self.resume);
                }
            }

            LinkState::ReadData => {
                if bus.valid {
                    self.data_in = (bus.data >> 8) as u8;
                    step.outputs.data_valid = true;
                    self.irq_enabled = true;
                    self.rx_idle = 0;
                    self.enter(self.resume);
                }
            }

            LinkState::ClearFifo => {
                if bus.ready {
                    step.request = BusRequest::issue(self.params.set.clear_fifo);
                    self.enter(LinkState::AcceptData);
                }
            }

            LinkState::AcceptData => {
                if bus.ready {
                    step.request = BusRequest::issue(self.params.set.enable_fifo);
                    self.rx_count = 0;
                    self.rx_idle = 0;
                    self.irq_enabled = true;
                    self.enter(LinkState::Idle);
                }
            }

            LinkState::Wait => {
                if bus.ready {
                    self.enter(self.resume);
                }
            }

            LinkState::Sleep => {
                if inputs.power_mode.wakes_receiver() && bus.ready {
                    step.request = BusRequest::issue(self.params.set.receiver_on);
                    self.resume = LinkState::ClearFifo;
                    self.enter(LinkState::Wait);
                    #[cfg(feature = "embedded")]
                    defmt::info!("link: waking for {}", inputs.power_mode);
                }
            }

            LinkState::TransmitOn => {
                if bus.ready {
                    step.request = BusRequest::issue(self.params.set.transmitter_on);
                    self.counter = 0;
                    self.resume = LinkState::TransmitWait;
                    self.enter(LinkState::Wait);
                }
            }

            LinkState::TransmitWait => {
                self.counter = self.counter.saturating_add(1);
                if self.status_new {
                    if bus.ready {
                        self.status_new = false;
                        self.irq_enabled = true;
                        if self.status.is_power_on_reset() {
                            let next = self.reinitialize();
                            self.enter(next);
                        } else if self.status.is_ready() {
                            self.status.remove(StatusWord::READY);
                            step.request = BusRequest::issue(Instruction::write_fifo(self.tx_byte));
                            self.enter(LinkState::Transmit);
                        } else if self.params.status_echo {
                            self.data_in = self.status.high();
                            step.outputs.data_valid = true;
                        }
                    }
                } else if irq && bus.ready {
                    step.request = BusRequest::issue(Instruction::READ_STATUS);
                    self.irq_enabled = false;
                    self.resume = LinkState::TransmitWait;
                    self.enter(LinkState::ReadStatus);
                } else if !inputs.frame_active && bus.ready {
                    // Frame withdrawn before the first byte was taken
                    step.request = BusRequest::issue(self.params.set.receiver_on);
                    self.resume = LinkState::ClearFifo;
                    self.enter(LinkState::Wait);
                } else if self.counter >= self.params.timing.powerup_watchdog && bus.ready {
                    #[cfg(feature = "embedded")]
                    defmt::warn!("link: transmitter never ready, resetting chip");
                    self.counter = 0;
                    self.powered_up = false;
                    self.status = StatusWord::empty();
                    self.enter(LinkState::Reset);
                }
            }

            LinkState::Transmit => {
                if !inputs.frame_active {
                    if bus.ready {
                        step.request = BusRequest::issue(self.params.set.receiver_on);
                        self.resume = LinkState::ClearFifo;
                        self.enter(LinkState::Wait);
                    }
                } else if irq && inputs.write_enable && bus.ready {
                    step.request = BusRequest::issue(Instruction::write_fifo(inputs.data_out));
                    self.resume = LinkState::Transmit;
                    self.enter(LinkState::Wait);
                }
            }
        }

        let irq = irq_asserted && self.irq_enabled;
        let engine_free = bus.ready && !step.request.write_enable;
        step.outputs.channel_free = match self.state {
            LinkState::Idle => {
                self.powered_up
                    && engine_free
                    && !irq
                    && !inputs.write_enable
                    && !self.status_new
                    && !self.status.is_channel_busy()
            }
            LinkState::Transmit => engine_free && irq && !inputs.write_enable,
            _ => false,
        };
        step.outputs.data_in = self.data_in;
        step.chip_reset = matches!(self.state, LinkState::Start | LinkState::Reset);
        step
    }

    fn idle(&mut self, inputs: &LinkInputs, irq: bool, bus: BusStatus, step: &mut LinkStep) {
        let timing = self.params.timing;
        let mut next = LinkState::Idle;

        if !self.powered_up {
            self.counter += 1;
            if self.counter >= timing.powerup_watchdog {
                #[cfg(feature = "embedded")]
                defmt::warn!("link: power-up watchdog expired, resetting chip");
                self.counter = 0;
                self.status = StatusWord::empty();
                next = LinkState::Reset;
            }
        }

        if self.powered_up && self.rx_count > 0 {
            self.rx_idle += 1;
            if self.rx_idle >= timing.rx_watchdog && bus.ready {
                #[cfg(feature = "embedded")]
                defmt::warn!("link: frame stalled after {} bytes", self.rx_count);
                self.rx_idle = 0;
                next = LinkState::ClearFifo;
            }
        }

        if self.powered_up && inputs.power_mode == PowerMode::Active {
            self.counter = self.counter.saturating_add(1);
            if self.counter >= timing.poll_period && bus.ready && !self.status_new {
                self.counter = 0;
                step.request = BusRequest::issue(Instruction::READ_STATUS);
                self.resume = LinkState::Idle;
                next = LinkState::ReadStatus;
            }
        }

        if irq && bus.ready && !self.status_new {
            step.request = BusRequest::issue(Instruction::READ_STATUS);
            self.irq_enabled = false;
            self.resume = LinkState::Idle;
            next = LinkState::ReadStatus;
        }

        if self.powered_up
            && inputs.wants_write()
            && !irq
            && !self.status_new
            && !self.status.is_channel_busy()
            && bus.ready
        {
            step.request = BusRequest::issue(self.params.set.receiver_off);
            self.tx_byte = inputs.data_out;
            self.resume = LinkState::TransmitOn;
            next = LinkState::Wait;
        }

        if self.status_new && bus.ready {
            self.status_new = false;
            let limit = inputs.frame_length.min(self.params.max_frame_len);
            if self.status.is_power_on_reset() || (self.status.is_ready() && !self.powered_up) {
                next = self.reinitialize();
            } else if self.rx_count >= limit {
                next = LinkState::ClearFifo;
            } else if self.status.is_ready() {
                step.request = BusRequest::issue(Instruction::READ_FIFO);
                self.rx_count = (self.rx_count + 1).min(self.params.max_frame_len);
                self.resume = LinkState::Idle;
                next = LinkState::ReadData;
            } else {
                self.irq_enabled = true;
            }
        }

        if self.powered_up && inputs.power_mode == PowerMode::Shutdown && bus.ready {
            #[cfg(feature = "embedded")]
            defmt::info!("link: entering sleep");
            step.request = BusRequest::issue(self.params.set.sleep);
            next = LinkState::Sleep;
        }

        self.enter(next);
    }

    /// Forget the chip's state and rerun `Init` after the settle delay
    fn reinitialize(&mut self) -> LinkState {
        #[cfg(feature = "embedded")]
        defmt::warn!("link: chip reset detected ({}), reinitializing", self.status);
        self.status = StatusWord::empty();
        self.powered_up = false;
        self.counter = 0;
        self.resume = LinkState::Init;
        LinkState::Delay
    }

    fn enter(&mut self, next: LinkState) {
        #[cfg(feature = "embedded")]
        if next != self.state {
            defmt::trace!("link: {} -> {}", self.state, next);
        }
        self.state = next;
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkController {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Link({}, up={}, irq={}, rx={})",
            self.state,
            self.powered_up,
            self.irq_enabled,
            self.rx_count
        );
    }
}
