//! Hardware Abstraction Layer
//!
//! Binds the link driver to STM32G474 peripherals: the SPI shift port,
//! the chip's control lines and the link tick clock.

pub mod gpio;
pub mod spi;
pub mod timer;
