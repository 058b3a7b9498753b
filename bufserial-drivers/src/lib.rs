//! Capability implementations
//!
//! Concrete implementations of the capabilities the driver in
//! `bufserial-core` is parameterized over:
//!
//! - Transmit-enable gates for half-duplex transceivers ([`gate`])
//! - Pin adapters for `embedded-hal` GPIO drivers ([`pin`])

#![no_std]
#![deny(unsafe_code)]

pub mod gate;
pub mod pin;

pub use gate::{GpioGate, Polarity};
pub use pin::EmbeddedHalPin;
