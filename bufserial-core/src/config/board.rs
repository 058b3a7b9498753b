//! Board-level serial configuration
//!
//! Describes every UART the board brings up: which UART number, its frame
//! and overflow policy, and the optional transmit-enable pin of a
//! half-duplex transceiver.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{ChannelConfig, ConfigError};
use crate::MAX_UARTS;

/// Pin configuration with optional inversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfig {
    /// GPIO pin number
    pub pin: u8,
    /// Pin is active-low (inverted)
    pub inverted: bool,
}

impl PinConfig {
    /// Create an active-high pin config
    pub const fn new(pin: u8) -> Self {
        Self {
            pin,
            inverted: false,
        }
    }

    /// Create an inverted (active-low) pin
    pub const fn inverted(pin: u8) -> Self {
        Self {
            pin,
            inverted: true,
        }
    }
}

/// One UART as the board uses it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortConfig {
    /// UART number (index into the dispatch table)
    pub uart: u8,
    /// Frame and overflow settings
    pub channel: ChannelConfig,
    /// Transmit-enable line of a half-duplex transceiver
    pub tx_enable: Option<PinConfig>,
}

impl PortConfig {
    /// Full-duplex port without a transmit-enable line
    pub const fn new(uart: u8, channel: ChannelConfig) -> Self {
        Self {
            uart,
            channel,
            tx_enable: None,
        }
    }

    /// Attach a transmit-enable pin
    pub const fn with_tx_enable(mut self, pin: PinConfig) -> Self {
        self.tx_enable = Some(pin);
        self
    }
}

/// Serial configuration for a whole board
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerialBoardConfig {
    /// Peripheral clock feeding the baud generators
    pub clock_hz: u32,
    /// Configured ports
    pub ports: Vec<PortConfig, MAX_UARTS>,
}

impl SerialBoardConfig {
    /// Board with no ports yet
    pub const fn new(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            ports: Vec::new(),
        }
    }

    /// Add a port, rejecting duplicates and out-of-range UART numbers
    pub fn add_port(&mut self, port: PortConfig) -> Result<(), ConfigError> {
        if port.uart as usize >= MAX_UARTS {
            return Err(ConfigError::UartOutOfRange(port.uart));
        }
        if self.port(port.uart).is_some() {
            return Err(ConfigError::DuplicatePort(port.uart));
        }
        self.ports
            .push(port)
            .map_err(|_| ConfigError::TooManyPorts)
    }

    /// Look up the configuration of a UART
    pub fn port(&self, uart: u8) -> Option<&PortConfig> {
        self.ports.iter().find(|p| p.uart == uart)
    }

    /// Check a configuration that did not go through [`add_port`](Self::add_port),
    /// such as one loaded from storage
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::InvalidBaudRate);
        }
        for (i, port) in self.ports.iter().enumerate() {
            if port.uart as usize >= MAX_UARTS {
                return Err(ConfigError::UartOutOfRange(port.uart));
            }
            if self.ports[..i].iter().any(|p| p.uart == port.uart) {
                return Err(ConfigError::DuplicatePort(port.uart));
            }
            super::baud_divisor(self.clock_hz, port.channel.frame.baudrate)?;
        }
        Ok(())
    }

    /// Serialize into `buf` as postcard, returning the used prefix
    #[cfg(feature = "serde")]
    pub fn to_slice<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encoding)
    }

    /// Deserialize and validate a postcard-encoded configuration
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Encoding)?;
        config.validate()?;
        Ok(config)
    }
}
