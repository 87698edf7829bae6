//! Transceiver
//!
//! Composes the link controller, the bus engine and a shift port into
//! one tick-driven driver.
//!
//! Within a tick the controller steps first, seeing the engine outputs
//! registered on the previous tick. The engine then consumes the
//! controller's request in the same tick.

use crate::config::{ConfigError, RadioConfig};
use crate::link::bus::BusEngine;
use crate::link::controller::LinkController;
use crate::link::table::InstructionSet;
use crate::shift::ShiftPort;
use crate::tick::{TickDivider, TickGate};
use crate::types::{LinkInputs, LinkOutputs};

/// Outputs of one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TickOutput {
    /// Signals to the data-link layer
    pub link: LinkOutputs,
    /// Chip reset asserted (drive the active-low line accordingly)
    pub chip_reset: bool,
}

#[cfg(feature = "embedded")]
impl defmt::Format for TickOutput {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} rst={}", self.link, self.chip_reset);
    }
}

/// Tick-driven RFM12 driver
pub struct Transceiver<P> {
    config: RadioConfig,
    controller: LinkController,
    engine: BusEngine,
    port: P,
    divider: TickDivider,
    gate: TickGate,
    last: TickOutput,
}

impl<P: ShiftPort> Transceiver<P> {
    /// Build the instruction set and create the driver in its reset state
    ///
    /// # Errors
    /// The configuration is rejected by validation or by the encoder.
    pub fn new(config: RadioConfig, port: P) -> Result<Self, ConfigError> {
        let set = InstructionSet::from_config(&config)?;
        Ok(Self {
            controller: LinkController::new(set, &config),
            engine: BusEngine::new(),
            port,
            divider: TickDivider::new(config.tick_ratio()),
            gate: TickGate::new(),
            last: TickOutput {
                link: LinkOutputs::default(),
                chip_reset: true,
            },
            config,
        })
    }

    /// Advance both state machines one tick
    pub fn step(&mut self, inputs: &LinkInputs, irq_asserted: bool) -> TickOutput {
        let bus = self.engine.status();
        let step = self.controller.step(inputs, irq_asserted, bus);
        self.engine.step(step.request, &mut self.port);
        self.last = TickOutput {
            link: step.outputs,
            chip_reset: step.chip_reset,
        };
        self.last
    }

    /// Advance one system clock cycle
    ///
    /// Steps only on a divider pulse with the gate open. Otherwise the
    /// outputs of the last step are returned with `data_valid` cleared.
    /// For callers clocked at the system rate; a timer already running
    /// at the tick rate calls [`step`](Self::step) instead.
    pub fn clock(&mut self, inputs: &LinkInputs, irq_asserted: bool) -> TickOutput {
        if self.gate.pass(self.divider.clock()) {
            self.step(inputs, irq_asserted)
        } else {
            let mut held = self.last;
            held.link.data_valid = false;
            held
        }
    }

    /// Synchronous global reset
    pub fn reset(&mut self) {
        self.controller.reset();
        self.engine = BusEngine::new();
        self.divider.reset();
        self.last = TickOutput {
            link: LinkOutputs::default(),
            chip_reset: true,
        };
        self.port.select(false);
    }

    /// Open or close the tick gate
    pub fn set_enabled(&mut self, enabled: bool) {
        self.gate.set_open(enabled);
    }

    /// Check if the tick gate is open
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.gate.is_open()
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Link controller
    #[must_use]
    pub const fn controller(&self) -> &LinkController {
        &self.controller
    }

    /// Bus engine
    #[must_use]
    pub const fn engine(&self) -> &BusEngine {
        &self.engine
    }

    /// Shift port
    #[must_use]
    pub const fn port(&self) -> &P {
        &self.port
    }

    /// Shift port (mutable)
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
