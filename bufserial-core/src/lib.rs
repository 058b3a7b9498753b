//! Buffered, interrupt-driven serial driver
//!
//! One [`Channel`] per physical UART holds a receive ring, a transmit ring
//! and sticky error flags. Mainline code talks to a channel through the
//! [`Transmitter`] and [`Receiver`] handles returned by [`Channel::split`];
//! the UART interrupt vectors reach it through the [`SerialPorts`] lookup
//! table.
//!
//! ```text
//! send ──▶ TX ring ──▶ data-register-empty ISR ──▶ UDR ──▶ wire
//! wire ──▶ UDR ──▶ receive-complete ISR ──▶ RX ring ──▶ recv
//! ```
//!
//! No locks guard the rings: each direction has exactly one producer and one
//! consumer (mainline produces TX and consumes RX, interrupts do the
//! opposite), and each ring index is written by one side only.
//!
//! - Ring buffer primitive ([`ring`])
//! - Per-UART state and configuration ([`channel`], [`config`])
//! - Transmit and receive paths ([`tx`], [`rx`])
//! - Deferred receive re-arm ([`deferred`])
//! - Interrupt vector dispatch ([`dispatch`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod channel;
pub mod config;
pub mod deferred;
pub mod dispatch;
pub mod ring;
pub mod rx;
pub mod tx;

#[cfg(test)]
mod mock;

pub use channel::{Channel, RxErrors};
pub use config::{ChannelConfig, ConfigError, SerialBoardConfig};
pub use dispatch::{SerialPorts, UartInterrupts, Vector};
pub use ring::RingBuffer;
pub use rx::Receiver;
pub use tx::{NoDelay, Transmitter};

/// Ring capacity used by the board-level helpers (usable slots: 255)
pub const DEFAULT_RING_SIZE: usize = 256;

/// Number of UART instances the dispatch table can address
pub const MAX_UARTS: usize = 4;
