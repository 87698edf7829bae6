//! Link Layer
//!
//! The two cooperating state machines that drive the chip, and the
//! instruction set they issue. The controller decides, the bus engine
//! moves words across the serial bus.

pub mod bus;
pub mod controller;
pub mod table;
