//! UART serial communication abstractions
//!
//! Provides the register contract of a USART peripheral with
//! data-register-empty, transmit-complete and receive-complete interrupt
//! sources, the frame configuration types, and byte-stream traits that the
//! buffered driver implements on top of them.

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// Status register fields
    ///
    /// Bit positions follow the classic USART status register layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// A received byte is waiting in the data register
        const RX_COMPLETE = 1 << 7;
        /// Shift register and data register are both empty
        const TX_COMPLETE = 1 << 6;
        /// Data register can accept a new byte
        const DATA_REGISTER_EMPTY = 1 << 5;
        /// Stop bit of the pending byte was sampled low
        const FRAMING_ERROR = 1 << 4;
        /// A byte was lost because the receive FIFO was full
        const DATA_OVERRUN = 1 << 3;
        /// Parity check failed for the pending byte
        const PARITY_ERROR = 1 << 2;
        /// Double transmission speed
        const DOUBLE_SPEED = 1 << 1;
        /// Multi-processor communication mode
        const MULTI_PROCESSOR = 1 << 0;

        /// Every hardware receive error bit
        const RX_ERRORS = Self::FRAMING_ERROR.bits()
            | Self::DATA_OVERRUN.bits()
            | Self::PARITY_ERROR.bits();
    }
}

bitflags! {
    /// Control register fields
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Control: u8 {
        /// Receive-complete interrupt enable
        const RX_COMPLETE_IE = 1 << 7;
        /// Transmit-complete interrupt enable
        const TX_COMPLETE_IE = 1 << 6;
        /// Data-register-empty interrupt enable
        const DATA_REGISTER_EMPTY_IE = 1 << 5;
        /// Receiver enable
        const RX_ENABLE = 1 << 4;
        /// Transmitter enable
        const TX_ENABLE = 1 << 3;
        /// Character size bit 2 (set only for 9-bit frames)
        const CHAR_SIZE_2 = 1 << 2;
        /// Ninth received data bit
        const RX_BIT_8 = 1 << 1;
        /// Ninth transmitted data bit
        const TX_BIT_8 = 1 << 0;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Status({=u8:#04x})", self.bits())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Control {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Control({=u8:#04x})", self.bits())
    }
}

/// Static description of what a UART peripheral supports
///
/// Checked once when a channel is configured so that a missing feature is
/// reported as an error instead of silently becoming a no-op write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsartCapabilities {
    /// Peripheral can send and receive 9-bit characters
    pub nine_bit_frames: bool,
    /// Width of the baud divisor register in bits (at most 16)
    pub divisor_bits: u8,
}

impl UsartCapabilities {
    /// Classic 8-bit AVR USART: 9-bit frames, 12-bit divisor
    pub const AVR: Self = Self {
        nine_bit_frames: true,
        divisor_bits: 12,
    };

    /// Largest divisor the peripheral can hold
    pub const fn max_divisor(&self) -> u16 {
        if self.divisor_bits >= 16 {
            u16::MAX
        } else {
            (1u16 << self.divisor_bits) - 1
        }
    }
}

impl Default for UsartCapabilities {
    fn default() -> Self {
        Self::AVR
    }
}

/// USART register block
///
/// One implementation per physical UART. All methods take `&self` because
/// the block is shared between mainline code and interrupt handlers, the
/// way memory-mapped registers are.
///
/// [`enable`](Self::enable) and [`disable`](Self::disable) are
/// read-modify-write operations on the control register; implementations
/// must make them atomic with respect to the UART's own interrupts.
pub trait UsartRegisters {
    /// Read the status register
    ///
    /// Error bits describe the byte currently in the data register, so the
    /// status must be read before [`read_data`](Self::read_data).
    fn status(&self) -> Status;

    /// Read the control register
    fn control(&self) -> Control;

    /// Overwrite the control register
    fn write_control(&self, value: Control);

    /// Set control bits, leaving the others untouched
    fn enable(&self, bits: Control);

    /// Clear control bits, leaving the others untouched
    fn disable(&self, bits: Control);

    /// Write the frame format register (see [`FrameConfig::format_bits`])
    fn write_frame_format(&self, bits: u8);

    /// Write the high byte of the baud divisor
    fn write_divisor_high(&self, high: u8);

    /// Write the low byte of the baud divisor
    fn write_divisor_low(&self, low: u8);

    /// Pop the most recently received byte
    fn read_data(&self) -> u8;

    /// Push a byte into the transmit shift path
    fn write_data(&self, byte: u8);

    /// Write the full 16-bit divisor, high byte first
    ///
    /// The low byte write latches the new value, so the order matters.
    fn write_divisor(&self, divisor: u16) {
        self.write_divisor_high((divisor >> 8) as u8);
        self.write_divisor_low(divisor as u8);
    }

    /// Describe what this peripheral supports
    fn capabilities(&self) -> UsartCapabilities {
        UsartCapabilities::AVR
    }
}

/// UART transmitter
///
/// Byte-stream interface for sending data over a UART.
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been queued or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block until every queued byte has physically left the wire
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// UART receiver
///
/// Byte-stream interface for receiving data from a UART.
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Read data from the UART
    ///
    /// Blocks until the buffer is filled or an error occurs.
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Read a single byte from the UART
    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read_blocking(&mut buf)?;
        Ok(buf[0])
    }
}

/// Combined UART interface
///
/// For UARTs that provide both TX and RX on a single peripheral.
pub trait Uart: UartTx + UartRx {}

// Blanket implementation
impl<T: UartTx + UartRx> Uart for T {}

/// Frame configuration
///
/// Used once at initialization; the driver keeps no copy of it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits per character
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl FrameConfig {
    /// 8N1 frame at the given baud rate
    pub const fn new_8n1(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Frame format register value
    ///
    /// Layout: parity mode in bits 5:4, stop-bit select in bit 3, the two
    /// low character-size bits in bits 2:1. The third character-size bit
    /// lives in the control register ([`Control::CHAR_SIZE_2`]).
    pub const fn format_bits(&self) -> u8 {
        (self.parity.mode_bits() << 4)
            | (self.stop_bits.select_bit() << 3)
            | ((self.data_bits.char_size() & 0b11) << 1)
    }

    /// Control bits the frame needs in addition to the interrupt enables
    pub fn control_bits(&self) -> Control {
        if self.data_bits.char_size() & 0b100 != 0 {
            Control::CHAR_SIZE_2
        } else {
            Control::empty()
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
    Nine,
}

impl DataBits {
    /// Number of bits as an integer
    pub const fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
            DataBits::Nine => 9,
        }
    }

    /// Character-size selector value
    pub const fn char_size(self) -> u8 {
        match self {
            DataBits::Five => 0,
            DataBits::Six => 1,
            DataBits::Seven => 2,
            DataBits::Eight => 3,
            DataBits::Nine => 7,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            9 => Ok(DataBits::Nine),
            other => Err(other),
        }
    }
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Parity {
    /// Parity mode selector value
    pub const fn mode_bits(self) -> u8 {
        match self {
            Parity::None => 0,
            Parity::Even => 2,
            Parity::Odd => 3,
        }
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    /// Stop-bit select value
    pub const fn select_bit(self) -> u8 {
        match self {
            StopBits::One => 0,
            StopBits::Two => 1,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(other),
        }
    }
}
