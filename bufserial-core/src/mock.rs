//! Test doubles: a USART register block, a transmit-enable gate and a
//! delay, all able to log into one shared timeline

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;

// Host critical-section implementation for the dispatch table mutex
use critical_section as _;

use bufserial_hal::{Control, Status, TxEnable, UsartCapabilities, UsartRegisters};

use crate::channel::Channel;

/// 16 MHz, the clock every divisor in the tests is computed against
pub const CLOCK_HZ: u32 = 16_000_000;

/// Observable side effects, in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    GateAssert,
    GateDeassert,
    Delay(u32),
    Wire(u8),
}

#[derive(Debug, Clone, Default)]
pub struct Timeline(Arc<Mutex<Vec<Event>>>);

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

struct State {
    control: Control,
    format: u8,
    divisor_writes: Vec<u8>,
    rx_fifo: VecDeque<(u8, Status)>,
    wire: Vec<u8>,
}

/// Register block whose transmit side completes instantly
///
/// A written byte goes straight to the wire log; received bytes are queued
/// with their error bits by `inject`.
pub struct MockUsart {
    state: Mutex<State>,
    caps: UsartCapabilities,
    timeline: Timeline,
}

impl MockUsart {
    pub fn new() -> Self {
        Self::build(UsartCapabilities::AVR, Timeline::new())
    }

    pub fn with_capabilities(caps: UsartCapabilities) -> Self {
        Self::build(caps, Timeline::new())
    }

    pub fn with_timeline(timeline: Timeline) -> Self {
        Self::build(UsartCapabilities::AVR, timeline)
    }

    fn build(caps: UsartCapabilities, timeline: Timeline) -> Self {
        Self {
            state: Mutex::new(State {
                control: Control::empty(),
                format: 0,
                divisor_writes: Vec::new(),
                rx_fifo: VecDeque::new(),
                wire: Vec::new(),
            }),
            caps,
            timeline,
        }
    }

    pub fn inject(&self, byte: u8) {
        self.inject_with_errors(byte, Status::empty());
    }

    pub fn inject_with_errors(&self, byte: u8, errors: Status) {
        self.state
            .lock()
            .unwrap()
            .rx_fifo
            .push_back((byte, errors & Status::RX_ERRORS));
    }

    pub fn has_rx_data(&self) -> bool {
        !self.state.lock().unwrap().rx_fifo.is_empty()
    }

    pub fn wire(&self) -> Vec<u8> {
        self.state.lock().unwrap().wire.clone()
    }

    pub fn divisor_writes(&self) -> Vec<u8> {
        self.state.lock().unwrap().divisor_writes.clone()
    }

    pub fn frame_format(&self) -> u8 {
        self.state.lock().unwrap().format
    }
}

impl UsartRegisters for MockUsart {
    fn status(&self) -> Status {
        let state = self.state.lock().unwrap();
        let mut status = Status::DATA_REGISTER_EMPTY;
        if let Some(&(_, errors)) = state.rx_fifo.front() {
            status |= Status::RX_COMPLETE | errors;
        }
        status
    }

    fn control(&self) -> Control {
        self.state.lock().unwrap().control
    }

    fn write_control(&self, value: Control) {
        self.state.lock().unwrap().control = value;
    }

    fn enable(&self, bits: Control) {
        self.state.lock().unwrap().control |= bits;
    }

    fn disable(&self, bits: Control) {
        self.state.lock().unwrap().control &= !bits;
    }

    fn write_frame_format(&self, bits: u8) {
        self.state.lock().unwrap().format = bits;
    }

    fn write_divisor_high(&self, high: u8) {
        self.state.lock().unwrap().divisor_writes.push(high);
    }

    fn write_divisor_low(&self, low: u8) {
        self.state.lock().unwrap().divisor_writes.push(low);
    }

    fn read_data(&self) -> u8 {
        self.state
            .lock()
            .unwrap()
            .rx_fifo
            .pop_front()
            .map(|(byte, _)| byte)
            .unwrap_or(0)
    }

    fn write_data(&self, byte: u8) {
        self.state.lock().unwrap().wire.push(byte);
        self.timeline.push(Event::Wire(byte));
    }

    fn capabilities(&self) -> UsartCapabilities {
        self.caps
    }
}

pub struct MockGate {
    asserted: AtomicBool,
    timeline: Timeline,
}

impl MockGate {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            asserted: AtomicBool::new(false),
            timeline,
        }
    }
}

impl TxEnable for MockGate {
    fn assert(&self) {
        self.asserted.store(true, Ordering::SeqCst);
        self.timeline.push(Event::GateAssert);
    }

    fn deassert(&self) {
        self.asserted.store(false, Ordering::SeqCst);
        self.timeline.push(Event::GateDeassert);
    }

    fn is_asserted(&self) -> bool {
        self.asserted.load(Ordering::SeqCst)
    }
}

pub struct MockDelay {
    timeline: Timeline,
}

impl MockDelay {
    pub fn new(timeline: Timeline) -> Self {
        Self { timeline }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.timeline.push(Event::Delay(ns));
    }
}

/// Play the hardware until the TX ring is drained and the frame has ended
pub fn pump_tx<G: TxEnable, const N: usize>(channel: &Channel<MockUsart, G, N>) {
    while channel
        .registers()
        .control()
        .contains(Control::DATA_REGISTER_EMPTY_IE)
    {
        channel.on_data_register_empty();
    }
    channel.on_transmit_complete();
}
