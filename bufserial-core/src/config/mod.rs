//! Configuration types
//!
//! Frame and channel settings applied once at bring-up, plus the
//! board-level description of every UART, stored as postcard binary data
//! when the `serde` feature is enabled.

pub mod board;
pub mod frame;

pub use board::*;
pub use frame::*;

/// Errors reported while configuring a channel or the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate or clock frequency is zero
    InvalidBaudRate,
    /// Divisor is negative or does not fit the divisor register
    DivisorOutOfRange,
    /// Peripheral cannot do the requested character size
    UnsupportedDataBits,
    /// UART number beyond the dispatch table
    UartOutOfRange(u8),
    /// A channel is already registered for this UART number
    UartAlreadyRegistered(u8),
    /// No channel is registered for this UART number
    NotRegistered(u8),
    /// Board configuration lists the same UART twice
    DuplicatePort(u8),
    /// Board configuration has no room for another port
    TooManyPorts,
    /// Mainline handles were already handed out
    AlreadySplit,
    /// Stored configuration could not be encoded or decoded
    Encoding,
}
