//! Driver library for the RAiO RA8875 TFT display controller, attached over a serial peripheral
//! bus with its resistive touch panel.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(test, not(feature = "std")))]
#[macro_use]
extern crate std;

extern crate embedded_hal as hal;

pub mod color;
pub mod command;
pub mod config;
pub mod display;
pub mod error;
pub mod interface;
pub mod sensor;

// Re-exports for primary API.
pub use color::Rgb565;
pub use command::{FontSource, LayerMode, MemoryTarget, Mode, PwmChannel};
pub use config::{Config, PollPolicy, Resolution};
pub use display::draw::{DrawCommand, Shape};
pub use display::touch::{TouchCalibration, TouchPoint};
pub use display::{Display, State, Window};
pub use error::Error;
pub use interface::bus::{BitOrder, BusConfig, BusMode, BusTransport, ClockDivider, WordSize};
pub use interface::{DisplayInterface, SpiInterface};
