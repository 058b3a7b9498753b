//! bufserial Hardware Abstraction Layer
//!
//! This crate defines the hardware contract the buffered serial driver is
//! written against. A chip support layer implements these traits once per
//! physical UART; the driver in `bufserial-core` never touches registers
//! directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (mainline send / recv)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  bufserial-core (rings, ISR handlers)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  bufserial-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ UART register │       │  GPIO (gate)  │
//! │    block      │       │               │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UsartRegisters`] - Status/control/data/divisor register access
//! - [`uart::UartTx`], [`uart::UartRx`] - Byte-stream serial communication
//! - [`gpio::OutputPin`] - Digital output
//! - [`gpio::TxEnable`] - Half-duplex transmit-enable capability

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::{NoGate, OutputPin, TxEnable};
pub use uart::{
    Control, DataBits, FrameConfig, Parity, Status, StopBits, UartRx, UartTx, UsartCapabilities,
    UsartRegisters,
};
