//! Transport over the kernel SPI driver on bus 0, `/dev/spidev0.<channel>`.
//!
//! Each `write` becomes one or more single-segment messages of at most `MAX_TRANSFER` bytes,
//! the kernel's default message limit. The kernel asserts chip-select for every message;
//! `ss_change` on the segment keeps it asserted into the next one, which is how a frame is held
//! open across calls.

use log::{debug, error};
use rppal::spi::{self, Bus, Segment, SlaveSelect, Spi};

use super::bus::{BitOrder, BusConfig, BusMode, BusTransport, ClockDivider, WordSize, MAX_TRANSFER};
use super::linux::TransportError;

/// Split a `len` byte write into `(offset, length, ss_change)` messages. Every message but the
/// last keeps chip-select asserted; the last one follows `hold_select`.
pub(crate) fn chunk_plan(
    len: usize,
    hold_select: bool,
) -> impl Iterator<Item = (usize, usize, bool)> {
    let count = (len + MAX_TRANSFER - 1) / MAX_TRANSFER;
    (0..count).map(move |i| {
        let offset = i * MAX_TRANSFER;
        let last = i + 1 == count;
        let size = if last { len - offset } else { MAX_TRANSFER };
        (offset, size, if last { hold_select } else { true })
    })
}

fn slave_select(channel: u8) -> Result<SlaveSelect, TransportError> {
    match channel {
        0 => Ok(SlaveSelect::Ss0),
        1 => Ok(SlaveSelect::Ss1),
        2 => Ok(SlaveSelect::Ss2),
        _ => Err(TransportError::Unsupported("chip-select channel above 2")),
    }
}

fn spi_mode(mode: BusMode) -> spi::Mode {
    match mode {
        BusMode::Mode0 => spi::Mode::Mode0,
        BusMode::Mode1 => spi::Mode::Mode1,
        BusMode::Mode2 => spi::Mode::Mode2,
        BusMode::Mode3 => spi::Mode::Mode3,
    }
}

pub struct SpidevTransport {
    channel: u8,
    spi: Option<Spi>,
    /// Outgoing copy of the chunk in flight; the caller's buffer receives the incoming bytes.
    tx: Vec<u8>,
    /// Whether the last message left chip-select asserted.
    held: bool,
}

impl SpidevTransport {
    pub fn new(channel: u8) -> Self {
        SpidevTransport {
            channel,
            spi: None,
            tx: Vec::new(),
            held: false,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    fn spi(&self) -> Result<&Spi, TransportError> {
        self.spi.as_ref().ok_or(TransportError::NotOpen)
    }

    /// Send one message. An empty `buf` only toggles chip-select.
    fn message(&mut self, buf: &mut [u8], ss_change: bool) -> Result<(), TransportError> {
        self.tx.clear();
        self.tx.extend_from_slice(buf);
        let spi = self.spi.as_ref().ok_or(TransportError::NotOpen)?;
        let mut segment = Segment::new(buf, &self.tx);
        segment.set_ss_change(ss_change);
        spi.transfer_segments(&[segment]).map_err(|e| {
            error!("spidev0.{} transfer failed: {}", self.channel, e);
            TransportError::Spi(e)
        })?;
        self.held = ss_change;
        Ok(())
    }
}

impl BusTransport for SpidevTransport {
    type Error = TransportError;

    fn initialize(&mut self, config: &BusConfig) -> Result<(), TransportError> {
        self.spi = None;
        let spi = Spi::new(
            Bus::Spi0,
            slave_select(self.channel)?,
            config.clock_divider.hz(),
            spi_mode(config.mode),
        )?;
        spi.set_bit_order(match config.bit_order {
            BitOrder::MsbFirst => spi::BitOrder::MsbFirst,
            BitOrder::LsbFirst => spi::BitOrder::LsbFirst,
        })?;
        spi.set_bits_per_word(config.word_size.bits())?;
        self.spi = Some(spi);
        self.held = false;
        debug!(
            "spidev0.{} open at {}Hz",
            self.channel,
            config.clock_divider.hz()
        );
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), TransportError> {
        self.spi()?;
        self.spi = None;
        Ok(())
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), TransportError> {
        self.spi()?.set_clock_speed(divider.hz())?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), TransportError> {
        // The kernel asserts chip-select with the first message.
        self.spi().map(|_| ())
    }

    fn end(&mut self) -> Result<(), TransportError> {
        if self.held {
            self.message(&mut [], false)?;
        }
        Ok(())
    }

    fn write(&mut self, buf: &mut [u8], hold_select: bool) -> Result<(), TransportError> {
        self.spi()?;
        for (offset, len, ss_change) in chunk_plan(buf.len(), hold_select) {
            self.message(&mut buf[offset..offset + len], ss_change)?;
        }
        Ok(())
    }
}
