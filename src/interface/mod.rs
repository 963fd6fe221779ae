//! The register protocol: turns logical register reads and writes into framed bus transactions.
//!
//! Every access is one frame: chip-select asserted, a selector byte identifying command-vs-data
//! and read-vs-write, then the payload, then chip-select released.

pub mod bus;
#[cfg(feature = "linux")]
pub mod linux;
#[cfg(feature = "linux")]
pub mod mmio;
#[cfg(feature = "linux")]
pub mod spidev;
#[cfg(test)]
pub mod test_spy;

use core::fmt;

use self::bus::{BusConfig, BusTransport, ClockDivider, Transaction, MAX_TRANSFER};

/// Selector for a data byte written to the selected register.
pub const DATA_WRITE: u8 = 0x00;
/// Selector for a data byte read from the selected register.
pub const DATA_READ: u8 = 0x40;
/// Selector for a register address (command) write.
pub const CMD_WRITE: u8 = 0x80;
/// Selector for a status register read.
pub const CMD_READ: u8 = 0xC0;

/// The four access primitives of the controller, plus the register-level helpers composed from
/// them and the bus controls the driver needs.
pub trait DisplayInterface {
    type Error: fmt::Debug;

    /// Apply bus settings and open the link.
    fn configure(&mut self, config: &BusConfig) -> Result<(), Self::Error>;

    /// Close the link.
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Change the bus clock.
    fn set_clock(&mut self, divider: ClockDivider) -> Result<(), Self::Error>;

    /// Select the register that subsequent data accesses address.
    fn write_command(&mut self, cmd: u8) -> Result<(), Self::Error>;

    /// Write one byte to the selected register.
    fn write_data(&mut self, data: u8) -> Result<(), Self::Error>;

    /// Write a run of bytes to the selected register as a single frame. The controller
    /// auto-increments its memory write pointer across consecutive bytes.
    fn write_data_stream<I>(&mut self, data: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = u8>;

    /// Read one byte from the selected register.
    fn read_data(&mut self) -> Result<u8, Self::Error>;

    /// Read the controller status register.
    fn read_status(&mut self) -> Result<u8, Self::Error>;

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.write_command(reg)?;
        self.write_data(value)
    }

    /// Write a 16-bit value split over `reg` (low byte) and `reg + 1` (high byte). These are two
    /// independently framed register writes because the controller latches each one separately.
    fn write_register16(&mut self, reg: u8, value: u16) -> Result<(), Self::Error> {
        self.write_register(reg, (value & 0xFF) as u8)?;
        self.write_register(reg + 1, (value >> 8) as u8)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, Self::Error> {
        self.write_command(reg)?;
        self.read_data()
    }
}

/// Register protocol over a serial bus transport.
pub struct SpiInterface<B> {
    /// The transport carrying the frames.
    bus: B,
}

impl<B> SpiInterface<B>
where
    B: BusTransport,
{
    /// Create a new interface which frames register accesses on `bus`.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Give back the transport.
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Send `selector` then `payload` in one frame, returning the byte clocked in with the
    /// payload.
    fn frame(&mut self, selector: u8, payload: u8) -> Result<u8, B::Error> {
        let mut t = Transaction::begin(&mut self.bus)?;
        t.transfer_byte(selector, true)?;
        let r = t.transfer_byte(payload, false)?;
        t.finish()?;
        Ok(r)
    }
}

impl<B> DisplayInterface for SpiInterface<B>
where
    B: BusTransport,
{
    type Error = B::Error;

    fn configure(&mut self, config: &BusConfig) -> Result<(), B::Error> {
        self.bus.initialize(config)
    }

    fn release(&mut self) -> Result<(), B::Error> {
        self.bus.deinitialize()
    }

    fn set_clock(&mut self, divider: ClockDivider) -> Result<(), B::Error> {
        self.bus.set_clock_divider(divider)
    }

    fn write_command(&mut self, cmd: u8) -> Result<(), B::Error> {
        self.frame(CMD_WRITE, cmd).map(|_| ())
    }

    fn write_data(&mut self, data: u8) -> Result<(), B::Error> {
        self.frame(DATA_WRITE, data).map(|_| ())
    }

    fn write_data_stream<I>(&mut self, data: I) -> Result<(), B::Error>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut iter = data.into_iter().peekable();
        let mut t = Transaction::begin(&mut self.bus)?;
        t.transfer_byte(DATA_WRITE, true)?;

        // Stage the stream through a fixed buffer, holding chip-select across every chunk but the
        // last so the device sees one continuous frame.
        let mut buf = [0u8; MAX_TRANSFER];
        loop {
            let mut chunk_len = 0;
            for slot in buf.iter_mut() {
                match iter.next() {
                    Some(byte) => {
                        *slot = byte;
                        chunk_len += 1;
                    }
                    None => break,
                }
            }
            let last = iter.peek().is_none();
            if chunk_len > 0 {
                t.write(&mut buf[..chunk_len], !last)?;
            }
            if last {
                break;
            }
        }
        t.finish()
    }

    fn read_data(&mut self) -> Result<u8, B::Error> {
        self.frame(DATA_READ, 0)
    }

    fn read_status(&mut self) -> Result<u8, B::Error> {
        self.frame(CMD_READ, 0)
    }
}
