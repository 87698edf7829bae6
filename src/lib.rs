//! RFM12 Link Driver Library
//!
//! This library drives a half-duplex sub-GHz FSK transceiver chip of the
//! RFM12 family over a serial bus. It initializes the chip, receives
//! framed bytes and transmits frames on request, arbitrates between the
//! two and recovers from chip resets and missing hardware.
//!
//! # Architecture
//!
//! The driver is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DATA-LINK LAYER (caller)                 │
//! │  frame / write / frame length / power mode ⇄ channel free,  │
//! │  data in, data valid                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      LINK CONTROLLER                        │
//! │  Init  │  Interrupt service  │  RX/TX arbitration  │  Sleep │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   BUS TRANSACTION ENGINE                    │
//! │  16-bit command words, 24-bit FIFO reads, chip select       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    SHIFT PORT / HAL                         │
//! │  SPI byte shifts  │  nSEL  │  nIRQ  │  nRESET               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both state machines advance on a common tick. See
//! [`transceiver::Transceiver`] for the composition and
//! [`sim`] (host builds) for a chip model to test against.
//!
//! # Design Principles
//!
//! - **No call stack in the state machines**: shared states return to a
//!   stored resume state
//! - **Type-driven design**: command words, status bits and power modes
//!   are typed, never raw integers in the controller
//! - **No unsafe code**
//! - **Configuration errors at construction**: all register fields are
//!   validated once, when the instruction set is built

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(all(feature = "embedded", feature = "std"))]
extern crate std;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// SPI shift port and control pins on the STM32G474.
#[cfg(feature = "embedded")]
pub mod hal;

/// Link state machines and their instruction set
pub mod link;

/// Register encoder
///
/// Pure functions from configuration values to chip command words.
pub mod encoder;

/// Byte shift primitive
pub mod shift;

/// Tick divider and gate
pub mod tick;

/// Driver composition
pub mod transceiver;

/// Chip model and test bench
#[cfg(feature = "std")]
pub mod sim;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::shift::ShiftPort;
    pub use crate::transceiver::{TickOutput, Transceiver};

    // Common traits
    pub use embedded_hal::digital::OutputPin;
    pub use embedded_hal::spi::SpiBus;

    // Embassy
    pub use embassy_time::{Duration, Instant, Ticker, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
