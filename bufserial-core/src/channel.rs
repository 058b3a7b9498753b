//! Per-UART driver state
//!
//! A [`Channel`] is created once at bring-up for every physical UART and
//! lives for the rest of the program, typically in a `static`. It owns the
//! two rings, the sticky receive error flags and the hardware binding.
//! Interrupt handlers reach it through a shared reference; mainline code
//! reaches it through the [`Transmitter`] / [`Receiver`] pair returned by
//! [`Channel::split`].

use bitflags::bitflags;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use bufserial_hal::{Control, NoGate, Status, TxEnable, UsartRegisters};

use crate::config::{actual_baud, baud_divisor, check_frame, ChannelConfig, ConfigError};
use crate::deferred::RearmSlot;
use crate::ring::RingBuffer;
use crate::rx::Receiver;
use crate::tx::{NoDelay, Transmitter};
use crate::DEFAULT_RING_SIZE;

bitflags! {
    /// Sticky receive error flags
    ///
    /// Set from interrupt context, cleared only by the application.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RxErrors: u8 {
        /// Hardware reported a framing error
        const FRAMING = 1 << 0;
        /// Hardware reported a parity error
        const PARITY = 1 << 1;
        /// Hardware receive FIFO overran
        const OVERRUN = 1 << 2;
        /// A byte arrived while the receive ring was full
        const LOCAL_OVERFLOW = 1 << 3;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RxErrors {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "RxErrors({=u8:#04x})", self.bits())
    }
}

impl RxErrors {
    /// Translate hardware status error bits
    pub fn from_status(status: Status) -> Self {
        let mut errors = RxErrors::empty();
        if status.contains(Status::FRAMING_ERROR) {
            errors |= RxErrors::FRAMING;
        }
        if status.contains(Status::PARITY_ERROR) {
            errors |= RxErrors::PARITY;
        }
        if status.contains(Status::DATA_OVERRUN) {
            errors |= RxErrors::OVERRUN;
        }
        errors
    }

    /// Any error at all (the `rx_error` condition)
    pub fn is_error(self) -> bool {
        !self.is_empty()
    }

    /// Bytes were lost, in hardware or locally (the `rx_overflow` condition)
    pub fn is_overflow(self) -> bool {
        self.intersects(RxErrors::OVERRUN | RxErrors::LOCAL_OVERFLOW)
    }
}

/// Driver state for one physical UART
///
/// `N` is the ring size; each ring holds up to `N - 1` bytes.
pub struct Channel<R, G = NoGate, const N: usize = DEFAULT_RING_SIZE> {
    uart: u8,
    regs: R,
    gate: G,
    pub(crate) rx: RingBuffer<N>,
    pub(crate) tx: RingBuffer<N>,
    errors: AtomicU8,
    dropped: AtomicU32,
    pub(crate) rearm: RearmSlot,
    deferred_rearm: AtomicBool,
    pub(crate) gate_settle_us: AtomicU32,
    /// Set from the first queued byte of a frame until transmit-complete
    pub(crate) tx_active: AtomicBool,
    split: AtomicBool,
}

impl<R, G, const N: usize> Channel<R, G, N> {
    /// Create the channel for UART number `uart`
    ///
    /// The hardware is not touched until [`configure`](Self::configure).
    pub const fn new(uart: u8, regs: R, gate: G) -> Self {
        Self {
            uart,
            regs,
            gate,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            errors: AtomicU8::new(0),
            dropped: AtomicU32::new(0),
            rearm: RearmSlot::new(),
            deferred_rearm: AtomicBool::new(false),
            gate_settle_us: AtomicU32::new(0),
            tx_active: AtomicBool::new(false),
            split: AtomicBool::new(false),
        }
    }

    /// UART number this channel is bound to
    pub fn uart(&self) -> u8 {
        self.uart
    }

    /// Hardware register block
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Flow-control gate
    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Any receive error since the last clear
    pub fn rx_error(&self) -> bool {
        self.errors().is_error()
    }

    /// Any lost receive byte since the last clear
    pub fn rx_overflow(&self) -> bool {
        self.errors().is_overflow()
    }

    /// Current sticky error flags
    pub fn errors(&self) -> RxErrors {
        RxErrors::from_bits_truncate(self.errors.load(Ordering::Acquire))
    }

    /// Reset all sticky error flags
    pub fn clear_errors(&self) {
        self.errors.store(0, Ordering::Release);
    }

    /// Read and reset the sticky error flags in one step
    ///
    /// An error raised by an interrupt between a separate read and clear
    /// would otherwise be lost.
    pub fn take_errors(&self) -> RxErrors {
        RxErrors::from_bits_truncate(self.errors.swap(0, Ordering::AcqRel))
    }

    pub(crate) fn record_errors(&self, errors: RxErrors) {
        if !errors.is_empty() {
            self.errors.fetch_or(errors.bits(), Ordering::AcqRel);
        }
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Received bytes discarded because the ring was full
    pub fn dropped_bytes(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Deferred re-arm requests posted so far
    pub fn rearm_posts(&self) -> u32 {
        self.rearm.posts()
    }

    /// Whether a deferred re-arm request is outstanding
    pub fn rearm_pending(&self) -> bool {
        self.rearm.is_pending()
    }

    pub(crate) fn deferred_rearm_enabled(&self) -> bool {
        self.deferred_rearm.load(Ordering::Relaxed)
    }

    /// Bytes waiting in the receive ring
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    /// Bytes waiting in the transmit ring
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Hand out the mainline transmit and receive handles
    ///
    /// Succeeds once per channel. Holding the only [`Transmitter`] and the
    /// only [`Receiver`] is what makes mainline the single producer of the
    /// TX ring and the single consumer of the RX ring.
    #[allow(clippy::type_complexity)]
    pub fn split(
        &self,
    ) -> Result<(Transmitter<'_, R, G, NoDelay, N>, Receiver<'_, R, G, N>), ConfigError> {
        if self.split.swap(true, Ordering::AcqRel) {
            return Err(ConfigError::AlreadySplit);
        }
        Ok((Transmitter::new(self), Receiver::new(self)))
    }
}

impl<R: UsartRegisters, G: TxEnable, const N: usize> Channel<R, G, N> {
    /// Program baud rate and frame format and enable the UART
    ///
    /// Enables the receiver, the transmitter and the receive-complete and
    /// transmit-complete interrupts. The data-register-empty interrupt stays
    /// off until the first byte is queued. While a deferred re-arm request
    /// is outstanding the receive-complete interrupt stays masked too;
    /// [`run_deferred_work`](Self::run_deferred_work) unmasks it. An idle
    /// channel's gate is released. Returns the divisor written.
    pub fn configure(&self, clock_hz: u32, config: &ChannelConfig) -> Result<u16, ConfigError> {
        let divisor = baud_divisor(clock_hz, config.frame.baudrate)?;
        self.configure_with_divisor(divisor, config)?;
        debug!(
            "uart{}: {} baud requested, {} actual",
            self.uart,
            config.frame.baudrate,
            actual_baud(clock_hz, divisor)
        );
        Ok(divisor)
    }

    /// Like [`configure`](Self::configure) with a precomputed divisor
    pub fn configure_with_divisor(
        &self,
        divisor: u16,
        config: &ChannelConfig,
    ) -> Result<(), ConfigError> {
        let caps = self.regs.capabilities();
        check_frame(&config.frame, &caps)?;
        if divisor > caps.max_divisor() {
            return Err(ConfigError::DivisorOutOfRange);
        }

        // Interrupts off while divisor and format change
        self.regs.write_control(Control::empty());
        self.regs.write_divisor(divisor);
        self.regs.write_frame_format(config.frame.format_bits());

        self.deferred_rearm
            .store(config.deferred_rearm, Ordering::Relaxed);
        self.gate_settle_us
            .store(config.gate_settle_us, Ordering::Relaxed);

        let mut control = Control::TX_COMPLETE_IE
            | Control::RX_ENABLE
            | Control::TX_ENABLE
            | config.frame.control_bits();
        if !self.rearm.is_pending() {
            control |= Control::RX_COMPLETE_IE;
        }
        // Otherwise the pending re-arm unmasks receive, keeping one RX producer
        if !self.tx.is_empty() {
            // Bytes queued before a reconfiguration keep draining
            control |= Control::DATA_REGISTER_EMPTY_IE;
        }
        self.regs.write_control(control);

        if !self.tx_active.load(Ordering::Acquire) {
            // Known released level before the first frame
            self.gate.deassert();
        }

        info!(
            "uart{}: divisor {} ({} baud, {} data bits), deferred rearm {}",
            self.uart,
            divisor,
            config.frame.baudrate,
            config.frame.data_bits.count(),
            config.deferred_rearm
        );
        Ok(())
    }
}
