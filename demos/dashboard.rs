//! Sensor dashboard on an 800x480 RA8875 panel attached to a Raspberry Pi.
//!
//! Usage: `dashboard [--reset-gpio <pin>] [spidev <channel> | mmio <peripheral-base> <chip-select>]`
//!
//! The sensors here are synthetic stand-ins; wire real drivers in through the `VoltageSource`
//! and `MeasurementSource` traits. Touching the panel leaves a dot where it was touched.

use std::process;

use clap::{Parser, Subcommand};
use log::{error, info};

use ra8875::interface::linux::{reset_pin, Backend, Delay, LinuxTransport};
use ra8875::sensor::{sample_channels, Axes, MeasurementSource, VoltageSource};
use ra8875::{Config, Display, DrawCommand, Mode, Resolution, Rgb565, SpiInterface};

const LINE_HEIGHT: u16 = 16;

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "Sensor dashboard on an 800x480 RA8875 panel")]
struct Cli {
    #[command(subcommand)]
    backend: Option<BackendArg>,

    /// BCM GPIO wired to the controller's reset line
    #[arg(short, long, global = true, default_value_t = 25)]
    reset_gpio: u8,
}

#[derive(Subcommand)]
enum BackendArg {
    /// Kernel SPI driver, /dev/spidev0.<channel>
    Spidev {
        #[arg(default_value_t = 0)]
        channel: u8,
    },
    /// SPI0 registers mapped from /dev/mem
    Mmio {
        /// Peripheral base address, e.g. 0xFE000000 on a Pi 4
        #[arg(value_parser = parse_address)]
        base: usize,
        /// Hardware chip-select, 0 or 1
        chip_select: u8,
    },
}

fn parse_address(s: &str) -> Result<usize, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Spidev { channel } => Backend::DeviceFile { channel },
            BackendArg::Mmio { base, chip_select } => Backend::MemoryMapped {
                peripheral_base: base,
                chip_select,
            },
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let backend = cli
        .backend
        .map(Backend::from)
        .unwrap_or(Backend::DeviceFile { channel: 0 });
    let reset = reset_pin(cli.reset_gpio).unwrap_or_else(|e| {
        error!("reset line unavailable: {}", e);
        process::exit(1);
    });

    let iface = SpiInterface::new(LinuxTransport::open(backend));
    let mut disp = Display::new(iface, reset, Delay::new(), Config::new(Resolution::R800x480));
    if let Err(e) = run(&mut disp) {
        // A failed transfer leaves the controller in an unknown state.
        error!("display failure: {}", e);
        process::exit(1);
    }
}

type Panel = Display<SpiInterface<LinuxTransport>, rppal::gpio::OutputPin, Delay>;
type PanelError = ra8875::Error<ra8875::interface::linux::TransportError>;

fn run(disp: &mut Panel) -> Result<(), PanelError> {
    disp.init()?;
    info!("panel {}x{}", disp.width(), disp.height());

    let mut accel = || -> Result<Axes, ()> { Ok(Axes::new(40, -25, 256)) };

    disp.set_mode(Mode::Text)?;
    disp.text_color(Rgb565::YELLOW, Rgb565::BLACK)?;

    let mut counter = 0u32;
    loop {
        let mut line = 0;
        let mut next_line = || {
            line += 1;
            (line - 1) * LINE_HEIGHT
        };

        disp.set_mode(Mode::Text)?;
        disp.text_write(0, next_line(), format_args!("COUNTER {:010}", counter))?;

        let mut adc = move |ch: u8| -> Result<f32, ()> {
            Ok(1.65 + 1.6 * libm::sinf(counter as f32 / 20.0 + ch as f32))
        };
        let mut volts = [0.0f32; 4];
        let n = sample_channels(&mut adc, &[0, 1, 2, 3], &mut volts).unwrap_or(0);
        for (ch, v) in volts[..n].iter().enumerate() {
            disp.text_write(0, next_line(), format_args!("ADC CH{} {:.6}", ch, v))?;
        }
        let battery = adc.read_voltage(0).unwrap_or(0.0);

        let a = accel.read().unwrap_or_default();
        disp.text_write(
            0,
            next_line(),
            format_args!("ACCEL {:05}:{:05}:{:05}", a.x, a.y, a.z),
        )?;
        disp.text_write(
            0,
            next_line(),
            format_args!("HEADING {:.3} BATT {:.2}V", a.heading(), battery),
        )?;

        disp.set_mode(Mode::Graphic)?;
        let x = (400 + a.x as i32).max(0) as u16;
        let y = (240 - a.y as i32).max(0) as u16;
        disp.draw(DrawCommand::circle(x, y, 2, Rgb565::BLUE, true))?;

        if let Some(p) = disp.touch_read()? {
            disp.draw(DrawCommand::circle(p.x, p.y, 4, Rgb565::RED, true))?;
        }

        counter = counter.wrapping_add(1);
    }
}
