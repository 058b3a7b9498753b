//! Baud divisor and frame validation

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use bufserial_hal::{DataBits, FrameConfig, UsartCapabilities};

use super::ConfigError;

/// Default transmit-enable settle time in microseconds
pub const DEFAULT_GATE_SETTLE_US: u32 = 10;

/// Samples per bit of the receiver
const OVERSAMPLING: u64 = 16;

/// Compute the baud divisor for a 16x oversampling UART
///
/// `divisor = round(clock_hz / (16 * baud)) - 1`, in integer arithmetic.
pub fn baud_divisor(clock_hz: u32, baud: u32) -> Result<u16, ConfigError> {
    if clock_hz == 0 || baud == 0 {
        return Err(ConfigError::InvalidBaudRate);
    }

    let denominator = OVERSAMPLING * baud as u64;
    let rounded = (clock_hz as u64 + denominator / 2) / denominator;

    // rounded == 0 means the baud rate is faster than the clock allows
    rounded
        .checked_sub(1)
        .and_then(|divisor| u16::try_from(divisor).ok())
        .ok_or(ConfigError::DivisorOutOfRange)
}

/// Baud rate the hardware actually produces for a divisor
pub fn actual_baud(clock_hz: u32, divisor: u16) -> u32 {
    (clock_hz as u64 / (OVERSAMPLING * (divisor as u64 + 1))) as u32
}

/// Check a frame against what the peripheral supports
pub fn check_frame(frame: &FrameConfig, caps: &UsartCapabilities) -> Result<(), ConfigError> {
    if frame.baudrate == 0 {
        return Err(ConfigError::InvalidBaudRate);
    }
    if frame.data_bits == DataBits::Nine && !caps.nine_bit_frames {
        return Err(ConfigError::UnsupportedDataBits);
    }
    Ok(())
}

/// Settings applied by [`Channel::configure`](crate::Channel::configure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelConfig {
    /// Baud rate and character framing
    pub frame: FrameConfig,
    /// Disable the receive interrupt on overflow and retry from mainline
    /// instead of dropping bytes inside the interrupt
    pub deferred_rearm: bool,
    /// Delay between asserting the transmit-enable gate and the first byte
    pub gate_settle_us: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl ChannelConfig {
    /// Channel with the given frame, drop-on-overflow and default settle time
    pub const fn new(frame: FrameConfig) -> Self {
        Self {
            frame,
            deferred_rearm: false,
            gate_settle_us: DEFAULT_GATE_SETTLE_US,
        }
    }

    /// Enable deferred receive re-arm
    pub const fn with_deferred_rearm(mut self) -> Self {
        self.deferred_rearm = true;
        self
    }

    /// Override the gate settle time
    pub const fn with_gate_settle_us(mut self, us: u32) -> Self {
        self.gate_settle_us = us;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F_CPU: u32 = 16_000_000;

    #[test]
    fn test_divisor_115200_at_16mhz() {
        // round(16e6 / 1_843_200) - 1 = round(8.68) - 1 = 8
        assert_eq!(baud_divisor(F_CPU, 115_200), Ok(8));
    }

    #[test]
    fn test_divisor_common_rates() {
        assert_eq!(baud_divisor(F_CPU, 9600), Ok(103));
        assert_eq!(baud_divisor(F_CPU, 19200), Ok(51));
        assert_eq!(baud_divisor(F_CPU, 38400), Ok(25));
        assert_eq!(baud_divisor(F_CPU, 250_000), Ok(3));
        assert_eq!(baud_divisor(F_CPU, 1_000_000), Ok(0));
        assert_eq!(baud_divisor(7_372_800, 115_200), Ok(3));
    }

    #[test]
    fn test_divisor_rounds_to_nearest() {
        // 16e6 / (16 * 57600) = 17.36 -> 17 - 1
        assert_eq!(baud_divisor(F_CPU, 57_600), Ok(16));
        // 16e6 / (16 * 76800) = 13.02 -> 13 - 1
        assert_eq!(baud_divisor(F_CPU, 76_800), Ok(12));
    }

    #[test]
    fn test_divisor_errors() {
        assert_eq!(baud_divisor(F_CPU, 0), Err(ConfigError::InvalidBaudRate));
        assert_eq!(baud_divisor(0, 9600), Err(ConfigError::InvalidBaudRate));
        // Faster than clock / 16 rounds to zero
        assert_eq!(
            baud_divisor(F_CPU, 4_000_000),
            Err(ConfigError::DivisorOutOfRange)
        );
        // Slower than a 16-bit divisor can express
        assert_eq!(baud_divisor(F_CPU, 10), Err(ConfigError::DivisorOutOfRange));
    }

    #[test]
    fn test_actual_baud() {
        assert_eq!(actual_baud(F_CPU, 103), 9615);
        assert_eq!(actual_baud(F_CPU, 8), 111_111);
    }

    #[test]
    fn test_check_frame() {
        let caps = UsartCapabilities::AVR;
        assert_eq!(check_frame(&FrameConfig::default(), &caps), Ok(()));

        let narrow = UsartCapabilities {
            nine_bit_frames: false,
            divisor_bits: 16,
        };
        let nine = FrameConfig {
            data_bits: DataBits::Nine,
            ..FrameConfig::default()
        };
        assert_eq!(check_frame(&nine, &narrow), Err(ConfigError::UnsupportedDataBits));
    }

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::new(FrameConfig::new_8n1(9600))
            .with_deferred_rearm()
            .with_gate_settle_us(50);
        assert!(config.deferred_rearm);
        assert_eq!(config.gate_settle_us, 50);
        assert_eq!(ChannelConfig::default().gate_settle_us, DEFAULT_GATE_SETTLE_US);
        assert!(!ChannelConfig::default().deferred_rearm);
    }
}
