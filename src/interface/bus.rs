//! The bus transport capability: one exclusively-owned serial link with caller-controlled
//! chip-select hold.
//!
//! A transport is configured once with `initialize` and then carries frames. Every frame is
//! bracketed by `begin`/`end`; use `Transaction` so that `end` runs even when a transfer inside
//! the frame fails.

use core::fmt;

/// Largest single `write` a transport is handed. Longer data is split by the caller, holding
/// chip-select between pieces.
pub const MAX_TRANSFER: usize = 4096;

/// Clock polarity and phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusMode {
    /// CPOL=0, CPHA=0
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl BusMode {
    /// The (CPOL, CPHA) bit pair.
    pub fn polarity_phase(self) -> (bool, bool) {
        match self {
            BusMode::Mode0 => (false, false),
            BusMode::Mode1 => (false, true),
            BusMode::Mode2 => (true, false),
            BusMode::Mode3 => (true, true),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordSize {
    Eight,
    Sixteen,
}

impl WordSize {
    pub fn bits(self) -> u8 {
        match self {
            WordSize::Eight => 8,
            WordSize::Sixteen => 16,
        }
    }
}

/// Divider applied to the 250MHz peripheral core clock to derive the bus clock. Valid values are
/// powers of two from 2 to 65536.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockDivider(u32);

impl ClockDivider {
    /// Peripheral core clock the divider applies to.
    pub const CORE_CLOCK_HZ: u32 = 250_000_000;

    /// 15.6MHz, used for normal display traffic.
    pub const DIV_16: ClockDivider = ClockDivider(16);
    /// 244kHz, used during initialization and for touch ADC reads.
    pub const DIV_1024: ClockDivider = ClockDivider(1024);

    /// Construct a divider, rejecting values that are not a power of two in range.
    pub fn new(divider: u32) -> Option<Self> {
        if divider >= 2 && divider <= 65536 && divider.is_power_of_two() {
            Some(ClockDivider(divider))
        } else {
            None
        }
    }

    pub fn divider(self) -> u32 {
        self.0
    }

    /// Resulting bus clock in Hz.
    pub fn hz(self) -> u32 {
        Self::CORE_CLOCK_HZ / self.0
    }
}

/// Bus settings applied by `BusTransport::initialize`. Once applied they are fixed until the
/// transport is re-initialized; only the clock divider may be changed on a live transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusConfig {
    pub mode: BusMode,
    pub bit_order: BitOrder,
    pub word_size: WordSize,
    pub clock_divider: ClockDivider,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            mode: BusMode::Mode0,
            bit_order: BitOrder::MsbFirst,
            word_size: WordSize::Eight,
            clock_divider: ClockDivider::DIV_1024,
        }
    }
}

/// A physical serial link. Implementations own their channel exclusively.
pub trait BusTransport {
    type Error: fmt::Debug;

    /// Open the channel and apply `config`. A failure is terminal for the channel.
    fn initialize(&mut self, config: &BusConfig) -> Result<(), Self::Error>;

    /// Release the channel.
    fn deinitialize(&mut self) -> Result<(), Self::Error>;

    /// Change the bus clock of an initialized channel.
    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), Self::Error>;

    /// Assert chip-select, opening a frame.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Deassert chip-select, closing the frame.
    fn end(&mut self) -> Result<(), Self::Error>;

    /// Transmit `buf`, replacing its contents with the bytes clocked in simultaneously. With
    /// `hold_select` the line stays asserted after the last byte so the next call continues the
    /// same frame.
    fn write(&mut self, buf: &mut [u8], hold_select: bool) -> Result<(), Self::Error>;

    /// Transmit one byte and return the byte clocked in.
    fn transfer_byte(&mut self, byte: u8, hold_select: bool) -> Result<u8, Self::Error> {
        let mut buf = [byte];
        self.write(&mut buf, hold_select)?;
        Ok(buf[0])
    }

    /// Transmit one 16-bit word, low byte first, and return the word clocked in.
    fn transfer_word(&mut self, word: u16, hold_select: bool) -> Result<u16, Self::Error> {
        let mut buf = word.to_le_bytes();
        self.write(&mut buf, hold_select)?;
        Ok(u16::from_le_bytes(buf))
    }
}

/// One chip-select-bracketed frame. The frame is closed when `finish` is called or, if a
/// transfer failed and the transaction is dropped early, on drop.
pub struct Transaction<'b, B>
where
    B: 'b + BusTransport,
{
    bus: &'b mut B,
    open: bool,
}

impl<'b, B> Transaction<'b, B>
where
    B: 'b + BusTransport,
{
    /// Open a frame on `bus`.
    pub fn begin(bus: &'b mut B) -> Result<Self, B::Error> {
        bus.begin()?;
        Ok(Transaction { bus, open: true })
    }

    pub fn write(&mut self, buf: &mut [u8], hold_select: bool) -> Result<(), B::Error> {
        self.bus.write(buf, hold_select)
    }

    pub fn transfer_byte(&mut self, byte: u8, hold_select: bool) -> Result<u8, B::Error> {
        self.bus.transfer_byte(byte, hold_select)
    }

    /// Close the frame, reporting a failure to deassert.
    pub fn finish(mut self) -> Result<(), B::Error> {
        self.open = false;
        self.bus.end()
    }
}

impl<'b, B> Drop for Transaction<'b, B>
where
    B: 'b + BusTransport,
{
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.bus.end() {
                log::error!("failed to release chip-select after aborted frame: {:?}", e);
            }
        }
    }
}
