//! GPIO pin abstractions
//!
//! Provides the output pin trait and the transmit-enable capability built on
//! top of it.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Half-duplex transmit-enable signal
///
/// Asserted before the first byte of a frame is handed to the UART and
/// deasserted once the last bit has left the shift register.
///
/// The same gate is driven from mainline code (assert) and from the
/// transmit-complete interrupt (deassert), so both operations take `&self`.
/// Implementations must make each call atomic with respect to interrupts.
pub trait TxEnable {
    /// Drive the transmit-enable line to its active level
    fn assert(&self);

    /// Release the transmit-enable line
    fn deassert(&self);

    /// Check if the line is currently at its active level
    fn is_asserted(&self) -> bool;
}

/// Channels without a flow-control gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoGate;

impl TxEnable for NoGate {
    fn assert(&self) {}

    fn deassert(&self) {}

    fn is_asserted(&self) -> bool {
        false
    }
}
