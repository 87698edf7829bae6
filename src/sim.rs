//! Chip Simulator
//!
//! A behavioural model of the RFM12 for host tests, and a tick-level
//! harness that wires it to a [`Transceiver`].
//!
//! The model covers what the link controller relies on: the power-on
//! reset flag, the status word, FIFO reads (data in the second byte),
//! receiver FIFO fill gated by the FIFO mode command, the transmit
//! register and the interrupt line. Bytes "on air" arrive one every
//! `byte_ticks` ticks; the transmit register frees up at the same rate.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::config::RadioConfig;
use crate::shift::ShiftPort;
use crate::transceiver::{TickOutput, Transceiver};
use crate::types::{LinkInputs, PowerMode, StatusWord};

/// Receiver FIFO capacity in bytes
pub const FIFO_DEPTH: usize = 16;

/// Default ticks per byte on air
pub const DEFAULT_BYTE_TICKS: u32 = 40;

/// Behavioural RFM12 model
#[derive(Clone, Debug)]
pub struct SimChip {
    alive: bool,
    in_reset: bool,
    por: bool,
    external: bool,
    rx_on: bool,
    tx_on: bool,
    tx_ready: bool,
    fill_enabled: bool,
    channel_busy: bool,
    byte_ticks: u32,
    tx_countdown: u32,
    air_countdown: u32,
    air: VecDeque<u8>,
    fifo: VecDeque<u8>,
    transmitted: Vec<u8>,
    commands: Vec<u16>,
    /// Bytes shifted in during the current selection
    frame: Vec<u8>,
    status_latch: StatusWord,
    in_flight: Option<u8>,
    selected: bool,
}

impl Default for SimChip {
    fn default() -> Self {
        Self::new()
    }
}

impl SimChip {
    /// Create a responsive chip held in reset
    #[must_use]
    pub fn new() -> Self {
        Self {
            alive: true,
            in_reset: true,
            por: false,
            external: false,
            rx_on: false,
            tx_on: false,
            tx_ready: false,
            fill_enabled: false,
            channel_busy: false,
            byte_ticks: DEFAULT_BYTE_TICKS,
            tx_countdown: 0,
            air_countdown: 0,
            air: VecDeque::new(),
            fifo: VecDeque::new(),
            transmitted: Vec::new(),
            commands: Vec::new(),
            frame: Vec::new(),
            status_latch: StatusWord::empty(),
            in_flight: None,
            selected: false,
        }
    }

    /// Create a chip that never answers (missing or unpowered)
    #[must_use]
    pub fn dead() -> Self {
        Self {
            alive: false,
            ..Self::new()
        }
    }

    /// Set the ticks per byte on air
    #[must_use]
    pub fn with_byte_ticks(mut self, ticks: u32) -> Self {
        self.byte_ticks = ticks.max(1);
        self
    }

    /// Connect or disconnect the chip
    pub fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    /// Report a busy channel in the status word
    pub fn set_channel_busy(&mut self, busy: bool) {
        self.channel_busy = busy;
    }

    /// Brown-out: the chip loses its configuration and flags a power-on reset
    pub fn trigger_power_on_reset(&mut self) {
        self.clear_registers();
        self.por = true;
    }

    /// Raise the external interrupt flag until the next status read
    pub fn trigger_external_interrupt(&mut self) {
        self.external = true;
    }

    /// Queue bytes on air for the receiver
    pub fn receive(&mut self, bytes: &[u8]) {
        if self.air.is_empty() {
            self.air_countdown = self.byte_ticks;
        }
        self.air.extend(bytes.iter().copied());
    }

    /// Current status word
    #[must_use]
    pub fn status(&self) -> StatusWord {
        let mut status = StatusWord::empty();
        let ready = if self.tx_on {
            self.tx_ready
        } else {
            self.rx_on && self.fill_enabled && !self.fifo.is_empty()
        };
        status.set(StatusWord::READY, ready);
        status.set(StatusWord::POWER_ON_RESET, self.por);
        status.set(StatusWord::EXTERNAL, self.external);
        status.set(StatusWord::FIFO_EMPTY, self.fifo.is_empty());
        status.set(StatusWord::CHANNEL_BUSY, self.channel_busy);
        status
    }

    /// Interrupt line (logical, `true` = asserted)
    #[must_use]
    pub fn irq_line(&self) -> bool {
        if !self.alive || self.in_reset {
            return false;
        }
        let status = self.status();
        status.is_power_on_reset() || status.is_ready() || self.external
    }

    /// Check if the chip is held in reset
    #[must_use]
    pub const fn is_in_reset(&self) -> bool {
        self.in_reset
    }

    /// Check if the receiver is on
    #[must_use]
    pub const fn is_receiving(&self) -> bool {
        self.rx_on
    }

    /// Check if the transmitter is on
    #[must_use]
    pub const fn is_transmitting(&self) -> bool {
        self.tx_on
    }

    /// Check if received bytes are captured into the FIFO
    #[must_use]
    pub const fn is_fill_enabled(&self) -> bool {
        self.fill_enabled
    }

    /// Bytes written to the transmit register
    #[must_use]
    pub fn transmitted(&self) -> &[u8] {
        &self.transmitted
    }

    /// Every command word received, in order
    #[must_use]
    pub fn commands(&self) -> &[u16] {
        &self.commands
    }

    /// Count occurrences of a command word
    #[must_use]
    pub fn count_command(&self, word: u16) -> usize {
        self.commands.iter().filter(|&&w| w == word).count()
    }

    /// Forget the command log
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Advance the chip one tick with the reset line as driven by the link
    pub fn advance(&mut self, chip_reset: bool) {
        if chip_reset {
            self.in_reset = true;
            self.clear_registers();
            self.por = false;
            self.external = false;
            return;
        }
        if self.in_reset {
            self.in_reset = false;
            self.por = self.alive;
        }
        if !self.alive {
            return;
        }

        if self.tx_on && !self.tx_ready {
            self.tx_countdown = self.tx_countdown.saturating_sub(1);
            if self.tx_countdown == 0 {
                self.tx_ready = true;
            }
        }

        if !self.air.is_empty() {
            self.air_countdown = self.air_countdown.saturating_sub(1);
            if self.air_countdown == 0 {
                if let Some(byte) = self.air.pop_front() {
                    if self.rx_on && self.fill_enabled && self.fifo.len() < FIFO_DEPTH {
                        self.fifo.push_back(byte);
                    }
                }
                self.air_countdown = self.byte_ticks;
            }
        }
    }

    fn clear_registers(&mut self) {
        self.rx_on = false;
        self.tx_on = false;
        self.tx_ready = false;
        self.fill_enabled = false;
        self.fifo.clear();
    }

    fn respond(&mut self, byte: u8) -> u8 {
        let index = self.frame.len();
        self.frame.push(byte);
        if !self.alive || self.in_reset || !self.selected {
            return 0;
        }
        match (self.frame[0], index) {
            (0x00, 0) => {
                self.status_latch = self.status();
                self.status_latch.high()
            }
            (0x00, 1) => {
                self.por = false;
                self.external = false;
                self.status_latch.bits() as u8
            }
            (0xB0, 1) => self.fifo.pop_front().unwrap_or(0),
            _ => 0,
        }
    }

    fn execute(&mut self) {
        if self.frame.len() < 2 {
            return;
        }
        let word = u16::from_be_bytes([self.frame[0], self.frame[1]]);
        self.commands.push(word);
        if !self.alive || self.in_reset {
            return;
        }

        let [command, low] = word.to_be_bytes();
        match command {
            0x82 => {
                self.rx_on = low & 0x80 != 0;
                let tx_on = low & 0x20 != 0;
                if tx_on && !self.tx_on {
                    self.tx_ready = false;
                    self.tx_countdown = self.byte_ticks;
                }
                if !tx_on {
                    self.tx_ready = false;
                }
                self.tx_on = tx_on;
            }
            0xCA => {
                self.fill_enabled = low & 0x02 != 0;
                if !self.fill_enabled {
                    self.fifo.clear();
                }
            }
            0xB8 if self.tx_on => {
                self.transmitted.push(low);
                self.tx_ready = false;
                self.tx_countdown = self.byte_ticks;
            }
            _ => {}
        }
    }
}

impl ShiftPort for SimChip {
    fn is_ready(&self) -> bool {
        self.in_flight.is_none()
    }

    fn start(&mut self, byte: u8) {
        let response = self.respond(byte);
        self.in_flight = Some(response);
    }

    fn poll(&mut self) -> Option<u8> {
        self.in_flight.take()
    }

    fn select(&mut self, selected: bool) {
        if self.selected && !selected {
            self.execute();
        }
        self.selected = selected;
        self.frame.clear();
    }
}

/// Configuration used by the harness: one tick per millisecond
#[must_use]
pub fn test_config() -> RadioConfig {
    RadioConfig {
        system_clock_hz: 1_000_000,
        bus_clock_hz: 1_000,
        ..RadioConfig::default()
    }
}

/// Tick-level test bench: a transceiver driving a [`SimChip`]
pub struct Harness {
    /// Driver under test
    pub radio: Transceiver<SimChip>,
    /// Inputs applied on every tick
    pub inputs: LinkInputs,
    last: TickOutput,
    ticks: u64,
    received: Vec<u8>,
}

impl Harness {
    /// Create a harness with [`test_config`] and a responsive chip
    ///
    /// # Panics
    /// The test configuration is invalid.
    #[must_use]
    pub fn new() -> Self {
        Self::with(test_config(), SimChip::new())
    }

    /// Create a harness from a configuration and chip model
    ///
    /// # Panics
    /// The configuration is invalid.
    #[must_use]
    pub fn with(config: RadioConfig, chip: SimChip) -> Self {
        let radio = match Transceiver::new(config, chip) {
            Ok(radio) => radio,
            Err(e) => panic!("invalid harness configuration: {e}"),
        };
        Self {
            radio,
            inputs: LinkInputs::idle(config.max_frame_len),
            last: TickOutput::default(),
            ticks: 0,
            received: Vec::new(),
        }
    }

    /// Chip model
    #[must_use]
    pub fn chip(&self) -> &SimChip {
        self.radio.port()
    }

    /// Chip model (mutable)
    pub fn chip_mut(&mut self) -> &mut SimChip {
        self.radio.port_mut()
    }

    /// Outputs of the last tick
    #[must_use]
    pub const fn last(&self) -> TickOutput {
        self.last
    }

    /// Ticks run so far
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Bytes reported with `data_valid` so far
    #[must_use]
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Set the requested power mode
    pub fn set_power_mode(&mut self, mode: PowerMode) {
        self.inputs.power_mode = mode;
    }

    /// Run one tick
    pub fn tick(&mut self) -> TickOutput {
        let irq = self.radio.port().irq_line();
        let out = self.radio.step(&self.inputs, irq);
        self.radio.port_mut().advance(out.chip_reset);
        if let Some(byte) = out.link.received() {
            self.received.push(byte);
        }
        self.ticks += 1;
        self.last = out;
        out
    }

    /// Run `n` ticks
    pub fn run(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Run until `done` holds after a tick, at most `limit` ticks
    ///
    /// Returns the number of ticks run, or `None` on timeout.
    pub fn run_until(&mut self, limit: u64, mut done: impl FnMut(&Self) -> bool) -> Option<u64> {
        for n in 1..=limit {
            self.tick();
            if done(self) {
                return Some(n);
            }
        }
        None
    }

    /// Run until the chip is initialized and the channel is free
    pub fn power_up(&mut self, limit: u64) -> Option<u64> {
        self.run_until(limit, |h| {
            h.radio.controller().is_powered_up() && h.last.link.channel_free
        })
    }

    /// Transmit a frame with the caller handshake
    ///
    /// Each byte is written for one tick once `channel_free` is seen;
    /// the frame ends when the channel is free after the last byte.
    /// Returns `false` if a byte is not accepted within `limit` ticks.
    pub fn send(&mut self, frame: &[u8], limit: u64) -> bool {
        self.inputs.frame_active = true;
        for &byte in frame {
            if !self.last.link.channel_free && self.run_until(limit, |h| h.last.link.channel_free).is_none() {
                self.end_frame();
                return false;
            }
            self.inputs.data_out = byte;
            self.inputs.write_enable = true;
            self.tick();
            self.inputs.write_enable = false;
        }
        let drained = self.run_until(limit, |h| h.last.link.channel_free).is_some();
        self.end_frame();
        drained
    }

    fn end_frame(&mut self) {
        self.inputs.frame_active = false;
        self.inputs.write_enable = false;
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
