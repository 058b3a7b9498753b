//! Transmit-enable gates
//!
//! A gate is the driver-enable line of an RS-485 style transceiver: it has
//! to be active while a frame is on the wire and released afterwards so the
//! bus can carry the reply.

pub mod gpio;

pub use gpio::{GpioGate, Polarity};
