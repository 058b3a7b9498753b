//! `embedded-hal` pin adapter
//!
//! Lets any `embedded-hal` 1.0 output pin with an infallible error type
//! drive a [`GpioGate`](crate::GpioGate).

use core::convert::Infallible;

use bufserial_hal::OutputPin;

/// Wraps an `embedded_hal::digital::OutputPin`
///
/// Tracks the commanded level itself, since reading it back through
/// `embedded-hal` needs `&mut` access.
pub struct EmbeddedHalPin<P> {
    pin: P,
    high: bool,
}

impl<P> EmbeddedHalPin<P> {
    /// Wrap a pin whose current level is `high`
    pub const fn new(pin: P, high: bool) -> Self {
        Self { pin, high }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> OutputPin for EmbeddedHalPin<P>
where
    P: embedded_hal::digital::OutputPin<Error = Infallible>,
{
    fn set_high(&mut self) {
        if let Err(e) = self.pin.set_high() {
            match e {}
        }
        self.high = true;
    }

    fn set_low(&mut self) {
        if let Err(e) = self.pin.set_low() {
            match e {}
        }
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::ErrorType;

    struct HalPin {
        writes: [Option<bool>; 4],
        count: usize,
    }

    impl ErrorType for HalPin {
        type Error = Infallible;
    }

    impl embedded_hal::digital::OutputPin for HalPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.writes[self.count] = Some(false);
            self.count += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.writes[self.count] = Some(true);
            self.count += 1;
            Ok(())
        }
    }

    #[test]
    fn test_forwards_levels() {
        let mut pin = EmbeddedHalPin::new(
            HalPin {
                writes: [None; 4],
                count: 0,
            },
            false,
        );
        assert!(pin.is_set_low());

        pin.set_high();
        assert!(pin.is_set_high());
        pin.set_state(false);
        assert!(pin.is_set_low());

        let inner = pin.into_inner();
        assert_eq!(inner.writes, [Some(true), Some(false), None, None]);
    }
}
