//! Transport driving the BCM2835 family SPI0 controller directly through `/dev/mem`.
//!
//! Chip-select is the controller's own CE0/CE1 output: it is asserted while the transfer active
//! (TA) bit is set, so a frame is held open simply by leaving TA set between writes. The SPI0
//! pins must already be in their ALT0 function, which the kernel does when SPI is enabled.

use std::ffi::CString;
use std::io;
use std::ptr;

use log::{debug, error};

use super::bus::{BitOrder, BusConfig, BusTransport, ClockDivider, WordSize};
use super::linux::TransportError;

/// Offset of SPI0 from the peripheral base.
pub const SPI0_OFFSET: usize = 0x20_4000;

const MAP_LEN: usize = 4096;

/// Register offsets, in bytes.
mod reg {
    pub const CS: usize = 0x00;
    pub const FIFO: usize = 0x04;
    pub const CLK: usize = 0x08;
}

/// CS register bits.
mod cs {
    pub const CHIP_SELECT: u32 = 0x03;
    pub const CPHA: u32 = 1 << 2;
    pub const CPOL: u32 = 1 << 3;
    pub const CLEAR: u32 = 0x30;
    pub const TA: u32 = 1 << 7;
    pub const DONE: u32 = 1 << 16;
    pub const RXD: u32 = 1 << 17;
    pub const TXD: u32 = 1 << 18;
}

/// The CS register value selecting `chip_select` in `config`'s clock mode, with TA clear.
pub(crate) fn control_word(config: &BusConfig, chip_select: u8) -> u32 {
    let (cpol, cpha) = config.mode.polarity_phase();
    let mut word = chip_select as u32 & cs::CHIP_SELECT;
    if cpol {
        word |= cs::CPOL;
    }
    if cpha {
        word |= cs::CPHA;
    }
    word
}

/// The CLK register value for `divider`. The controller reads 0 as 65536.
pub(crate) fn clock_word(divider: ClockDivider) -> u32 {
    divider.divider() & 0xFFFF
}

pub struct MmioTransport {
    peripheral_base: usize,
    chip_select: u8,
    regs: Option<*mut u32>,
    control: u32,
}

impl MmioTransport {
    /// `peripheral_base` is the physical peripheral base of the board: 0x2000_0000 on the
    /// original Pi, 0x3F00_0000 on the Pi 2 and 3, 0xFE00_0000 on the Pi 4.
    pub fn new(peripheral_base: usize, chip_select: u8) -> Self {
        MmioTransport {
            peripheral_base,
            chip_select,
            regs: None,
            control: 0,
        }
    }

    fn reg(&self, offset: usize) -> Result<*mut u32, TransportError> {
        self.regs
            .map(|base| unsafe { base.add(offset / 4) })
            .ok_or(TransportError::NotOpen)
    }

    fn read(&self, offset: usize) -> Result<u32, TransportError> {
        let r = self.reg(offset)?;
        Ok(unsafe { ptr::read_volatile(r) })
    }

    fn write_reg(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        let r = self.reg(offset)?;
        unsafe { ptr::write_volatile(r, value) };
        Ok(())
    }

    fn map(&mut self) -> Result<(), TransportError> {
        let path = CString::new("/dev/mem").map_err(|_| TransportError::Unsupported("path"))?;
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_SYNC) };
        if fd < 0 {
            let source = io::Error::last_os_error();
            error!("cannot open /dev/mem: {}", source);
            return Err(TransportError::Open(source));
        }
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                MAP_LEN,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                (self.peripheral_base + SPI0_OFFSET) as libc::off_t,
            )
        };
        // The mapping outlives the descriptor.
        unsafe {
            libc::close(fd);
        }
        if addr == libc::MAP_FAILED {
            let source = io::Error::last_os_error();
            error!(
                "cannot map SPI0 at 0x{:08X}: {}",
                self.peripheral_base + SPI0_OFFSET,
                source
            );
            return Err(TransportError::Map(source));
        }
        self.regs = Some(addr as *mut u32);
        Ok(())
    }

    fn unmap(&mut self) {
        if let Some(base) = self.regs.take() {
            unsafe {
                libc::munmap(base as *mut libc::c_void, MAP_LEN);
            }
        }
    }

    fn wait_for(&self, bit: u32) -> Result<(), TransportError> {
        while self.read(reg::CS)? & bit == 0 {}
        Ok(())
    }
}

impl BusTransport for MmioTransport {
    type Error = TransportError;

    fn initialize(&mut self, config: &BusConfig) -> Result<(), TransportError> {
        if config.bit_order == BitOrder::LsbFirst {
            return Err(TransportError::Unsupported("LSB-first bit order"));
        }
        if config.word_size == WordSize::Sixteen {
            return Err(TransportError::Unsupported("16-bit words"));
        }
        self.unmap();
        self.map()?;
        self.control = control_word(config, self.chip_select);
        self.write_reg(reg::CS, cs::CLEAR)?;
        self.write_reg(reg::CS, self.control)?;
        self.write_reg(reg::CLK, clock_word(config.clock_divider))?;
        debug!(
            "SPI0 mapped, CE{} at {}Hz",
            self.chip_select,
            config.clock_divider.hz()
        );
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), TransportError> {
        // Leave the controller idle with its FIFOs cleared.
        self.write_reg(reg::CS, self.control | cs::CLEAR)?;
        self.unmap();
        Ok(())
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), TransportError> {
        self.write_reg(reg::CLK, clock_word(divider))
    }

    fn begin(&mut self) -> Result<(), TransportError> {
        self.write_reg(reg::CS, self.control | cs::CLEAR)?;
        self.write_reg(reg::CS, self.control | cs::TA)
    }

    fn end(&mut self) -> Result<(), TransportError> {
        self.write_reg(reg::CS, self.control)
    }

    fn write(&mut self, buf: &mut [u8], hold_select: bool) -> Result<(), TransportError> {
        let mut sent = 0;
        let mut received = 0;
        while received < buf.len() {
            while sent < buf.len() && self.read(reg::CS)? & cs::TXD != 0 {
                self.write_reg(reg::FIFO, buf[sent] as u32)?;
                sent += 1;
            }
            while received < buf.len() && self.read(reg::CS)? & cs::RXD != 0 {
                buf[received] = self.read(reg::FIFO)? as u8;
                received += 1;
            }
        }
        self.wait_for(cs::DONE)?;
        if !hold_select {
            self.write_reg(reg::CS, self.control)?;
        }
        Ok(())
    }
}

impl Drop for MmioTransport {
    fn drop(&mut self) {
        self.unmap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::bus::BusMode;

    #[test]
    fn control_words() {
        let mut config = BusConfig::default();
        assert_eq!(control_word(&config, 0), 0);
        config.mode = BusMode::Mode3;
        assert_eq!(control_word(&config, 1), 0b1101);
        config.mode = BusMode::Mode1;
        assert_eq!(control_word(&config, 0), cs::CPHA);
    }

    #[test]
    fn clock_words() {
        assert_eq!(clock_word(ClockDivider::DIV_16), 16);
        assert_eq!(clock_word(ClockDivider::DIV_1024), 1024);
        assert_eq!(clock_word(ClockDivider::new(65536).unwrap()), 0);
    }

    #[test]
    fn rejects_unsupported_framing() {
        let mut t = MmioTransport::new(0x3F00_0000, 0);
        let mut config = BusConfig::default();
        config.word_size = WordSize::Sixteen;
        assert!(match t.initialize(&config) {
            Err(TransportError::Unsupported(_)) => true,
            _ => false,
        });
        assert!(match t.begin() {
            Err(TransportError::NotOpen) => true,
            _ => false,
        });
    }
}
