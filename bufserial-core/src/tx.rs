//! Transmit path
//!
//! Mainline code queues bytes through the [`Transmitter`]; the
//! data-register-empty interrupt feeds them to the hardware one at a time;
//! the transmit-complete interrupt ends the frame.
//!
//! Per-channel transmit states, implicit in `tx_active`, the ring and the
//! interrupt enables:
//!
//! ```text
//!          first byte queued             ring empty
//! Idle ───────────────────────▶ Active ─────────────▶ Draining
//!  ▲     (gate asserted,                (last byte still in
//!  │      drain irq armed)               the shift register)
//!  │                                          │
//!  └──────────── transmit complete ◀──────────┘
//!                (gate deasserted)
//! ```

use core::convert::Infallible;
use core::hint::spin_loop;

use embedded_hal::delay::DelayNs;
use portable_atomic::Ordering;

use bufserial_hal::{Control, TxEnable, UartTx, UsartRegisters};

use crate::channel::Channel;

/// Delay provider that does not wait
///
/// Used until [`Transmitter::with_delay`] supplies a real one; the gate
/// settle time is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum TxState {
    Idle,
    Active,
    Draining,
}

impl<R, G, const N: usize> Channel<R, G, N> {
    pub(crate) fn tx_state(&self) -> TxState {
        if !self.tx_active.load(Ordering::Acquire) {
            TxState::Idle
        } else if self.tx.is_empty() {
            TxState::Draining
        } else {
            TxState::Active
        }
    }
}

impl<R: UsartRegisters, G: TxEnable, const N: usize> Channel<R, G, N> {
    /// Data-register-empty interrupt handler
    ///
    /// Hands the next queued byte to the hardware, which fires this
    /// interrupt again once the byte moves into the shift register. With
    /// nothing left to send the interrupt is disarmed.
    pub fn on_data_register_empty(&self) {
        match self.tx.try_pop() {
            Some(byte) => self.registers().write_data(byte),
            None => self
                .registers()
                .disable(Control::DATA_REGISTER_EMPTY_IE),
        }
    }

    /// Transmit-complete interrupt handler
    ///
    /// Fires once the shift register is empty, one character time after the
    /// ring ran dry. Only then is the transmit-enable gate released.
    pub fn on_transmit_complete(&self) {
        if !self.tx.is_empty() {
            // A byte was queued after the last one went out; the frame goes on
            return;
        }
        // Idle implies the drain interrupt is off, so a byte queued from now
        // on waits for Transmitter::send to assert the gate first
        self.registers()
            .disable(Control::DATA_REGISTER_EMPTY_IE);
        if self.tx_active.swap(false, Ordering::AcqRel) {
            self.gate().deassert();
            trace!("uart{}: tx idle", self.uart());
        }
    }
}

/// Mainline transmit handle
///
/// There is exactly one per channel (see [`Channel::split`]); `&mut self`
/// on every queueing method keeps mainline the only producer of the TX ring.
pub struct Transmitter<'a, R, G, D, const N: usize> {
    channel: &'a Channel<R, G, N>,
    delay: D,
}

impl<'a, R, G, const N: usize> Transmitter<'a, R, G, NoDelay, N> {
    pub(crate) fn new(channel: &'a Channel<R, G, N>) -> Self {
        Self {
            channel,
            delay: NoDelay,
        }
    }
}

impl<'a, R, G, D, const N: usize> Transmitter<'a, R, G, D, N> {
    /// Use `delay` to wait out the gate settle time
    pub fn with_delay<D2: DelayNs>(self, delay: D2) -> Transmitter<'a, R, G, D2, N> {
        Transmitter {
            channel: self.channel,
            delay,
        }
    }

    /// Channel this handle feeds
    pub fn channel(&self) -> &'a Channel<R, G, N> {
        self.channel
    }

    /// Check if a byte can be queued without blocking
    pub fn can_send(&self) -> bool {
        !self.channel.tx.is_full()
    }

    /// Bytes queued but not yet handed to the hardware
    pub fn pending(&self) -> usize {
        self.channel.tx.len()
    }

    /// Check if the last frame has completely left the wire
    pub fn is_idle(&self) -> bool {
        self.channel.tx_state() == TxState::Idle
    }
}

impl<'a, R: UsartRegisters, G: TxEnable, D: DelayNs, const N: usize> Transmitter<'a, R, G, D, N> {
    /// Queue a byte, spinning while the ring is full
    ///
    /// There is no timeout: a transmitter that never drains (interrupts
    /// masked, peer holding off) blocks the caller forever.
    pub fn send(&mut self, byte: u8) {
        while self.channel.tx.try_push(byte).is_err() {
            spin_loop();
        }
        self.start();
    }

    /// Queue a byte if there is room, handing it back otherwise
    pub fn try_send(&mut self, byte: u8) -> Result<(), u8> {
        self.channel.tx.try_push(byte)?;
        self.start();
        Ok(())
    }

    /// Spin until every queued byte has physically left the wire
    pub fn flush(&mut self) {
        while self.channel.tx_state() != TxState::Idle {
            spin_loop();
        }
    }

    fn start(&mut self) {
        let channel = self.channel;
        if !channel.tx_active.swap(true, Ordering::AcqRel) {
            if channel.tx.is_empty() {
                // The previous frame already carried the byte out and the
                // transmit-complete handler closed it in the meantime
                channel.tx_active.store(false, Ordering::Release);
                return;
            }
            channel.gate().assert();
            let settle_us = channel.gate_settle_us.load(Ordering::Relaxed);
            if settle_us > 0 {
                self.delay.delay_us(settle_us);
            }
        }
        // Arming an armed interrupt is a no-op
        channel
            .registers()
            .enable(Control::DATA_REGISTER_EMPTY_IE);
    }
}

impl<'a, R: UsartRegisters, G: TxEnable, D: DelayNs, const N: usize> UartTx
    for Transmitter<'a, R, G, D, N>
{
    type Error = Infallible;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for &byte in data {
            self.send(byte);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Transmitter::flush(self);
        Ok(())
    }
}

impl<'a, R, G, D, const N: usize> embedded_io::ErrorType for Transmitter<'a, R, G, D, N> {
    type Error = Infallible;
}

impl<'a, R: UsartRegisters, G: TxEnable, D: DelayNs, const N: usize> embedded_io::Write
    for Transmitter<'a, R, G, D, N>
{
    /// Blocks for the first byte, then queues as many as fit
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let Some((&first, rest)) = buf.split_first() else {
            return Ok(0);
        };
        self.send(first);
        let mut written = 1;
        for &byte in rest {
            if self.try_send(byte).is_err() {
                break;
            }
            written += 1;
        }
        Ok(written)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Transmitter::flush(self);
        Ok(())
    }
}

impl<'a, R: UsartRegisters, G: TxEnable, D: DelayNs, const N: usize> embedded_io::WriteReady
    for Transmitter<'a, R, G, D, N>
{
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.can_send())
    }
}
