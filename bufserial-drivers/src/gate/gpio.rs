//! GPIO transmit-enable gate
//!
//! Drives the driver-enable pin of a half-duplex transceiver directly from
//! a GPIO.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use bufserial_core::config::PinConfig;
use bufserial_hal::{OutputPin, TxEnable};

/// Pin level that enables the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Pin HIGH while transmitting
    #[default]
    ActiveHigh,
    /// Pin LOW while transmitting
    ActiveLow,
}

impl Polarity {
    /// Polarity from an `inverted` flag as stored in [`PinConfig`]
    pub const fn from_inverted(inverted: bool) -> Self {
        if inverted {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }

    /// Pin level for a logical gate state
    pub const fn level(self, active: bool) -> bool {
        match self {
            Polarity::ActiveHigh => active,
            Polarity::ActiveLow => !active,
        }
    }
}

struct GateState<P> {
    pin: P,
    /// Current logical state (true = transmitter enabled)
    asserted: bool,
}

/// GPIO transmit-enable gate
///
/// The pin can be configured as active-high (default) or active-low. It is
/// shared between mainline code and the transmit-complete interrupt, so it
/// lives behind a critical-section mutex.
///
/// The pin level is not touched on construction (so the gate can be built
/// in a `static`); configuring the channel releases the gate.
pub struct GpioGate<P> {
    state: Mutex<CriticalSectionRawMutex, RefCell<GateState<P>>>,
    polarity: Polarity,
}

impl<P> GpioGate<P> {
    /// Create a new GPIO gate
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `inverted`: If true, the gate is active when the pin is LOW
    pub const fn new(pin: P, inverted: bool) -> Self {
        Self::with_polarity(pin, Polarity::from_inverted(inverted))
    }

    /// Create a gate with an explicit polarity
    pub const fn with_polarity(pin: P, polarity: Polarity) -> Self {
        Self {
            state: Mutex::new(RefCell::new(GateState {
                pin,
                asserted: false,
            })),
            polarity,
        }
    }

    /// Create a gate with active-high output
    pub const fn new_active_high(pin: P) -> Self {
        Self::with_polarity(pin, Polarity::ActiveHigh)
    }

    /// Create a gate with active-low output
    pub const fn new_active_low(pin: P) -> Self {
        Self::with_polarity(pin, Polarity::ActiveLow)
    }

    /// Create the gate a board's [`PinConfig`] describes
    ///
    /// `pin` must be the GPIO numbered `config.pin`; resolving that number
    /// to a pin is the board's job.
    pub const fn from_pin_config(pin: P, config: &PinConfig) -> Self {
        Self::new(pin, config.inverted)
    }

    /// Configured polarity
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Check if the gate is active-low
    pub fn is_inverted(&self) -> bool {
        self.polarity == Polarity::ActiveLow
    }
}

impl<P: OutputPin> GpioGate<P> {
    fn drive(&self, active: bool) {
        let high = self.polarity.level(active);
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.asserted = active;
            state.pin.set_state(high);
        });
        #[cfg(feature = "defmt")]
        defmt::trace!("tx gate active={} ({})", active, self.polarity);
    }

    /// Electrical level of the pin
    pub fn is_pin_high(&self) -> bool {
        self.state.lock(|state| state.borrow().pin.is_set_high())
    }
}

impl<P: OutputPin> TxEnable for GpioGate<P> {
    fn assert(&self) {
        self.drive(true);
    }

    fn deassert(&self) {
        self.drive(false);
    }

    fn is_asserted(&self) -> bool {
        self.state.lock(|state| state.borrow().asserted)
    }
}
