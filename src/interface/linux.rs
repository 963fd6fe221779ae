//! Linux host support: a bus transport picked at runtime, plus the reset line and delay the
//! driver needs, both from `rppal`.

use std::io;

use log::{debug, info};
use rppal::gpio::{self, Gpio, OutputPin};
use thiserror::Error;

use super::bus::{BusConfig, BusTransport, ClockDivider};
use super::mmio::MmioTransport;
use super::spidev::SpidevTransport;

pub use rppal::hal::Delay;

/// Failure of a Linux bus transport or GPIO.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("spi device error: {0}")]
    Spi(#[from] rppal::spi::Error),
    #[error("gpio error: {0}")]
    Gpio(#[from] gpio::Error),
    #[error("cannot open /dev/mem: {0}")]
    Open(#[source] io::Error),
    #[error("cannot map peripheral registers: {0}")]
    Map(#[source] io::Error),
    #[error("unsupported bus setting: {0}")]
    Unsupported(&'static str),
    /// The transport was used before `initialize` or after `deinitialize`.
    #[error("bus transport is not open")]
    NotOpen,
}

/// Which host mechanism carries the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// The kernel SPI driver through `/dev/spidev0.<channel>`.
    DeviceFile { channel: u8 },
    /// The SPI0 registers mapped from `/dev/mem`.
    MemoryMapped {
        peripheral_base: usize,
        chip_select: u8,
    },
}

/// A bus transport whose backend is chosen at runtime.
pub enum LinuxTransport {
    DeviceFile(SpidevTransport),
    MemoryMapped(MmioTransport),
}

impl LinuxTransport {
    /// Create the transport for `backend`. Nothing is opened until `initialize`.
    pub fn open(backend: Backend) -> Self {
        info!("using {:?} bus backend", backend);
        match backend {
            Backend::DeviceFile { channel } => {
                LinuxTransport::DeviceFile(SpidevTransport::new(channel))
            }
            Backend::MemoryMapped {
                peripheral_base,
                chip_select,
            } => LinuxTransport::MemoryMapped(MmioTransport::new(peripheral_base, chip_select)),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $t:ident => $e:expr) => {
        match $self {
            LinuxTransport::DeviceFile($t) => $e,
            LinuxTransport::MemoryMapped($t) => $e,
        }
    };
}

impl BusTransport for LinuxTransport {
    type Error = TransportError;

    fn initialize(&mut self, config: &BusConfig) -> Result<(), TransportError> {
        dispatch!(self, t => t.initialize(config))
    }

    fn deinitialize(&mut self) -> Result<(), TransportError> {
        dispatch!(self, t => t.deinitialize())
    }

    fn set_clock_divider(&mut self, divider: ClockDivider) -> Result<(), TransportError> {
        dispatch!(self, t => t.set_clock_divider(divider))
    }

    fn begin(&mut self) -> Result<(), TransportError> {
        dispatch!(self, t => t.begin())
    }

    fn end(&mut self) -> Result<(), TransportError> {
        dispatch!(self, t => t.end())
    }

    fn write(&mut self, buf: &mut [u8], hold_select: bool) -> Result<(), TransportError> {
        dispatch!(self, t => t.write(buf, hold_select))
    }
}

/// Claim BCM GPIO `pin` as the controller's reset line, driven high (not in reset).
pub fn reset_pin(pin: u8) -> Result<OutputPin, TransportError> {
    let line = Gpio::new()?.get(pin)?.into_output_high();
    debug!("gpio{} claimed as reset line", pin);
    Ok(line)
}
