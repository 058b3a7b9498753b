//! Interrupt vector dispatch
//!
//! Maps a UART number and an interrupt source to the [`Channel`] that
//! serves it. The table is filled once during bring-up; afterwards the
//! vector handlers only look entries up.
//!
//! ```ignore
//! static UART0: Channel<Usart0> = Channel::new(0, Usart0, NoGate);
//! static PORTS: SerialPorts<'static> = SerialPorts::new();
//!
//! PORTS.register(0, &UART0)?;
//!
//! #[interrupt]
//! fn USART0_RX() {
//!     PORTS.dispatch(0, Vector::ReceiveComplete);
//! }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use bufserial_hal::{TxEnable, UsartRegisters};

use crate::channel::Channel;
use crate::config::{ChannelConfig, ConfigError, SerialBoardConfig};
use crate::MAX_UARTS;

/// UART interrupt sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Vector {
    /// A byte was received
    ReceiveComplete,
    /// The data register can take another byte
    DataRegisterEmpty,
    /// The last byte has left the shift register
    TransmitComplete,
}

/// Type-erased view of a channel for the dispatch table
///
/// Lets channels with different register types, gates and ring sizes share
/// one table.
pub trait UartInterrupts: Sync {
    /// See [`Channel::on_receive_complete`]
    fn on_receive_complete(&self);

    /// See [`Channel::on_data_register_empty`]
    fn on_data_register_empty(&self);

    /// See [`Channel::on_transmit_complete`]
    fn on_transmit_complete(&self);

    /// See [`Channel::run_deferred_work`]
    fn run_deferred_work(&self) -> bool;

    /// See [`Channel::configure`]
    fn configure(&self, clock_hz: u32, config: &ChannelConfig) -> Result<u16, ConfigError>;

    /// Route one interrupt source to its handler
    fn handle(&self, vector: Vector) {
        match vector {
            Vector::ReceiveComplete => self.on_receive_complete(),
            Vector::DataRegisterEmpty => self.on_data_register_empty(),
            Vector::TransmitComplete => self.on_transmit_complete(),
        }
    }
}

impl<R, G, const N: usize> UartInterrupts for Channel<R, G, N>
where
    R: UsartRegisters + Sync,
    G: TxEnable + Sync,
{
    fn on_receive_complete(&self) {
        Channel::on_receive_complete(self);
    }

    fn on_data_register_empty(&self) {
        Channel::on_data_register_empty(self);
    }

    fn on_transmit_complete(&self) {
        Channel::on_transmit_complete(self);
    }

    fn run_deferred_work(&self) -> bool {
        Channel::run_deferred_work(self)
    }

    fn configure(&self, clock_hz: u32, config: &ChannelConfig) -> Result<u16, ConfigError> {
        Channel::configure(self, clock_hz, config)
    }
}

type Table<'a, const M: usize> = [Option<&'a dyn UartInterrupts>; M];

/// UART number to channel lookup table
pub struct SerialPorts<'a, const M: usize = MAX_UARTS> {
    table: Mutex<CriticalSectionRawMutex, RefCell<Table<'a, M>>>,
}

impl<'a, const M: usize> Default for SerialPorts<'a, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const M: usize> SerialPorts<'a, M> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new([None; M])),
        }
    }

    /// Bind `channel` to UART number `uart`
    pub fn register(&self, uart: u8, channel: &'a dyn UartInterrupts) -> Result<(), ConfigError> {
        self.table.lock(|table| {
            let mut table = table.borrow_mut();
            let slot = table
                .get_mut(uart as usize)
                .ok_or(ConfigError::UartOutOfRange(uart))?;
            if slot.is_some() {
                return Err(ConfigError::UartAlreadyRegistered(uart));
            }
            *slot = Some(channel);
            Ok(())
        })
    }

    /// Channel bound to `uart`, if any
    pub fn get(&self, uart: u8) -> Option<&'a dyn UartInterrupts> {
        self.table
            .lock(|table| table.borrow().get(uart as usize).copied().flatten())
    }

    /// Run the handler for one interrupt of one UART
    ///
    /// Call from the vector handler. Returns `false` if no channel is bound
    /// to `uart`; the interrupt is then left unserviced.
    pub fn dispatch(&self, uart: u8, vector: Vector) -> bool {
        // Copy the reference out so the handler runs outside the lock
        match self.get(uart) {
            Some(channel) => {
                channel.handle(vector);
                true
            }
            None => {
                warn!("uart{}: {} on unregistered channel", uart, vector);
                false
            }
        }
    }

    /// Service the deferred re-arm request of every channel
    ///
    /// Call from the mainline idle loop. Returns the number of requests
    /// serviced.
    pub fn run_deferred_work(&self) -> usize {
        // Snapshot under one lock; the handlers run outside it
        let table: Table<'a, M> = self.table.lock(|table| *table.borrow());
        let mut serviced = 0;
        for channel in table.iter().flatten() {
            if channel.run_deferred_work() {
                serviced += 1;
            }
        }
        serviced
    }

    /// Configure every port the board describes
    ///
    /// Each port must already have a registered channel. Stops at the first
    /// failure.
    pub fn configure_board(&self, board: &SerialBoardConfig) -> Result<(), ConfigError> {
        board.validate()?;
        for port in board.ports.iter() {
            let channel = self
                .get(port.uart)
                .ok_or(ConfigError::NotRegistered(port.uart))?;
            channel.configure(board.clock_hz, &port.channel)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortConfig;
    use crate::mock::{MockUsart, CLOCK_HZ};
    use bufserial_hal::{Control, FrameConfig, NoGate};

    #[test]
    fn test_dispatch_routes_to_registered_channel() {
        let uart0: Channel<MockUsart, NoGate, 8> = Channel::new(0, MockUsart::new(), NoGate);
        let uart1: Channel<MockUsart, NoGate, 16> = Channel::new(1, MockUsart::new(), NoGate);
        uart0.configure(CLOCK_HZ, &ChannelConfig::default()).unwrap();
        uart1.configure(CLOCK_HZ, &ChannelConfig::default()).unwrap();

        let ports: SerialPorts<'_> = SerialPorts::new();
        ports.register(0, &uart0).unwrap();
        ports.register(1, &uart1).unwrap();

        uart1.registers().inject(0x31);
        assert!(ports.dispatch(1, Vector::ReceiveComplete));
        assert_eq!(uart1.rx_pending(), 1);
        assert_eq!(uart0.rx_pending(), 0);

        let (mut tx, _rx) = uart0.split().unwrap();
        tx.send(0x30);
        assert!(ports.dispatch(0, Vector::DataRegisterEmpty));
        assert!(ports.dispatch(0, Vector::DataRegisterEmpty));
        assert!(ports.dispatch(0, Vector::TransmitComplete));
        assert_eq!(uart0.registers().wire(), vec![0x30]);
        assert!(tx.is_idle());
        assert!(uart1.registers().wire().is_empty());
    }

    #[test]
    fn test_unregistered_uart_is_ignored() {
        let ports: SerialPorts<'_> = SerialPorts::new();
        assert!(!ports.dispatch(2, Vector::ReceiveComplete));
        assert!(!ports.dispatch(200, Vector::TransmitComplete));
        assert!(ports.get(2).is_none());
    }

    #[test]
    fn test_register_rejects_bad_slots() {
        let uart: Channel<MockUsart, NoGate, 8> = Channel::new(0, MockUsart::new(), NoGate);
        let ports: SerialPorts<'_, 2> = SerialPorts::new();

        assert_eq!(ports.register(2, &uart), Err(ConfigError::UartOutOfRange(2)));
        assert_eq!(ports.register(1, &uart), Ok(()));
        assert_eq!(
            ports.register(1, &uart),
            Err(ConfigError::UartAlreadyRegistered(1))
        );
    }

    #[test]
    fn test_run_deferred_work_services_pending_channels() {
        let config = ChannelConfig::default().with_deferred_rearm();
        let uart0: Channel<MockUsart, NoGate, 4> = Channel::new(0, MockUsart::new(), NoGate);
        let uart1: Channel<MockUsart, NoGate, 4> = Channel::new(1, MockUsart::new(), NoGate);
        uart0.configure(CLOCK_HZ, &config).unwrap();
        uart1.configure(CLOCK_HZ, &config).unwrap();

        let ports: SerialPorts<'_> = SerialPorts::new();
        ports.register(0, &uart0).unwrap();
        ports.register(3, &uart1).unwrap();

        for byte in 0..4 {
            uart1.registers().inject(byte);
        }
        ports.dispatch(3, Vector::ReceiveComplete);
        assert!(uart1.rearm_pending());
        assert!(!uart0.rearm_pending());

        let (_tx, mut rx) = uart1.split().unwrap();
        assert_eq!(rx.recv(), 0);

        assert_eq!(ports.run_deferred_work(), 1);
        assert_eq!(ports.run_deferred_work(), 0);
        assert!(uart1
            .registers()
            .control()
            .contains(Control::RX_COMPLETE_IE));
        assert_eq!(uart1.rx_pending(), 3);
    }

    #[test]
    fn test_run_deferred_work_reaches_last_table_slot() {
        let config = ChannelConfig::default().with_deferred_rearm();
        let uart: Channel<MockUsart, NoGate, 4> = Channel::new(255, MockUsart::new(), NoGate);
        uart.configure(CLOCK_HZ, &config).unwrap();

        let ports: SerialPorts<'_, 256> = SerialPorts::new();
        ports.register(255, &uart).unwrap();

        for byte in 0..4 {
            uart.registers().inject(byte);
        }
        assert!(ports.dispatch(255, Vector::ReceiveComplete));
        assert!(uart.rearm_pending());

        let (_tx, mut rx) = uart.split().unwrap();
        assert_eq!(rx.recv(), 0);
        assert_eq!(ports.run_deferred_work(), 1);
        assert!(!uart.rearm_pending());
        assert_eq!(uart.rx_pending(), 3);
    }

    #[test]
    fn test_configure_board() {
        let uart0: Channel<MockUsart, NoGate, 8> = Channel::new(0, MockUsart::new(), NoGate);
        let uart1: Channel<MockUsart, NoGate, 8> = Channel::new(1, MockUsart::new(), NoGate);
        let ports: SerialPorts<'_> = SerialPorts::new();
        ports.register(0, &uart0).unwrap();
        ports.register(1, &uart1).unwrap();

        let mut board = SerialBoardConfig::new(CLOCK_HZ);
        board
            .add_port(PortConfig::new(0, ChannelConfig::new(FrameConfig::new_8n1(115_200))))
            .unwrap();
        board
            .add_port(PortConfig::new(1, ChannelConfig::new(FrameConfig::new_8n1(9600))))
            .unwrap();

        assert_eq!(ports.configure_board(&board), Ok(()));
        assert_eq!(uart0.registers().divisor_writes(), vec![0, 8]);
        assert_eq!(uart1.registers().divisor_writes(), vec![0, 103]);

        board
            .add_port(PortConfig::new(2, ChannelConfig::default()))
            .unwrap();
        assert_eq!(
            ports.configure_board(&board),
            Err(ConfigError::NotRegistered(2))
        );
    }
}
