//! Receive path
//!
//! The receive-complete interrupt moves bytes from the hardware into the
//! RX ring and classifies errors; mainline code takes them out through the
//! [`Receiver`].
//!
//! When the ring is full the byte cannot be stored. Without deferred re-arm
//! the byte is read and discarded so the interrupt can return, and every
//! further byte is dropped the same way until the consumer catches up. With
//! deferred re-arm the interrupt masks itself, leaves the byte in the
//! hardware and posts a request for
//! [`Channel::run_deferred_work`] to retry from mainline.

use core::convert::Infallible;
use core::hint::spin_loop;

use bufserial_hal::{Control, Status, TxEnable, UartRx, UsartRegisters};

use crate::channel::{Channel, RxErrors};

impl<R: UsartRegisters, G: TxEnable, const N: usize> Channel<R, G, N> {
    /// Receive-complete interrupt handler
    ///
    /// Drains every byte the hardware holds, so one entry also covers
    /// several coalesced receive events.
    pub fn on_receive_complete(&self) {
        self.receive(false);
    }

    /// Service the deferred re-arm request, if one is pending
    ///
    /// Call from the mainline idle loop, never from interrupt context.
    /// Moves the bytes the hardware kept while the interrupt was masked into
    /// the ring and unmasks the receive interrupt. If the ring is still full
    /// the request is posted again and the interrupt stays masked.
    ///
    /// Returns `true` if a request was serviced.
    pub fn run_deferred_work(&self) -> bool {
        if !self.rearm.take() {
            return false;
        }
        self.receive(true);
        true
    }

    /// Producer side of the RX ring
    ///
    /// Runs either in the receive interrupt or, with that interrupt masked,
    /// in deferred mode from mainline; never both at once.
    fn receive(&self, deferred: bool) {
        let regs = self.registers();
        loop {
            // Status first: its error bits belong to the byte in the data register
            let status = regs.status();
            if !status.contains(Status::RX_COMPLETE) {
                break;
            }

            if self.rx.is_full() {
                if self.deferred_rearm_enabled() {
                    regs.disable(Control::RX_COMPLETE_IE);
                    if !deferred {
                        self.record_errors(RxErrors::LOCAL_OVERFLOW);
                        warn!("uart{}: rx ring full, receive masked", self.uart());
                    }
                    if self.rearm.post() {
                        debug!("uart{}: rx rearm posted", self.uart());
                    }
                    return;
                }

                let _ = regs.read_data();
                self.record_errors(RxErrors::from_status(status) | RxErrors::LOCAL_OVERFLOW);
                self.record_dropped();
                warn!("uart{}: rx ring full, byte dropped", self.uart());
                continue;
            }

            // Error flags are advisory: the byte is kept either way
            let errors = RxErrors::from_status(status);
            if !errors.is_empty() {
                self.record_errors(errors);
                warn!("uart{}: rx error {}", self.uart(), errors);
            }
            let byte = regs.read_data();
            // Cannot fail: room was checked and this is the only producer
            let _ = self.rx.try_push(byte);
        }

        if deferred {
            regs.enable(Control::RX_COMPLETE_IE);
            debug!("uart{}: rx rearmed", self.uart());
        }
    }
}

/// Mainline receive handle
///
/// There is exactly one per channel (see [`Channel::split`]); `&mut self`
/// on every read keeps mainline the only consumer of the RX ring.
///
/// Errors are not reported through reads. A byte that arrived with a
/// framing or parity error is delivered like any other; check
/// [`Channel::rx_error`] and [`Channel::rx_overflow`] separately.
pub struct Receiver<'a, R, G, const N: usize> {
    channel: &'a Channel<R, G, N>,
}

impl<'a, R, G, const N: usize> Receiver<'a, R, G, N> {
    pub(crate) fn new(channel: &'a Channel<R, G, N>) -> Self {
        Self { channel }
    }

    /// Channel this handle reads from
    pub fn channel(&self) -> &'a Channel<R, G, N> {
        self.channel
    }

    /// Check if a byte can be read without blocking
    pub fn has_data(&self) -> bool {
        !self.channel.rx.is_empty()
    }

    /// Bytes waiting to be read
    pub fn pending(&self) -> usize {
        self.channel.rx.len()
    }

    /// Take the oldest received byte, spinning while the ring is empty
    ///
    /// There is no timeout.
    pub fn recv(&mut self) -> u8 {
        loop {
            if let Some(byte) = self.channel.rx.try_pop() {
                return byte;
            }
            spin_loop();
        }
    }

    /// Take the oldest received byte if there is one
    pub fn try_recv(&mut self) -> Option<u8> {
        self.channel.rx.try_pop()
    }
}

impl<'a, R, G, const N: usize> UartRx for Receiver<'a, R, G, N> {
    type Error = Infallible;

    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        for slot in buf.iter_mut() {
            *slot = self.recv();
        }
        Ok(buf.len())
    }
}

impl<'a, R, G, const N: usize> embedded_io::ErrorType for Receiver<'a, R, G, N> {
    type Error = Infallible;
}

impl<'a, R, G, const N: usize> embedded_io::Read for Receiver<'a, R, G, N> {
    /// Blocks for the first byte, then returns whatever else is buffered
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };
        *first = self.recv();
        let mut read = 1;
        for slot in rest {
            match self.try_recv() {
                Some(byte) => *slot = byte,
                None => break,
            }
            read += 1;
        }
        Ok(read)
    }
}

impl<'a, R, G, const N: usize> embedded_io::ReadReady for Receiver<'a, R, G, N> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.has_data())
    }
}
