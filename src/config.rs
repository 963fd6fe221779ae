//! Display configuration: the resolution presets with their panel timing, and the builder that
//! collects the optional settings applied by `Display::init`.

use crate::command::consts::*;
use crate::display::touch::TouchCalibration;
use crate::interface::bus::{BitOrder, BusConfig, BusMode, ClockDivider, WordSize};

/// Panel timing for one resolution preset. Horizontal values are in pixels, vertical in lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub pixel_clock: u8,
    pub hsync_nondisplay: u16,
    pub hsync_start: u16,
    pub hsync_pulse_width: u16,
    pub hsync_finetune: u8,
    pub vsync_nondisplay: u16,
    pub vsync_start: u16,
    pub vsync_pulse_width: u16,
}

/// The supported panel resolutions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    R480x272,
    R800x480,
}

impl Resolution {
    pub fn width(self) -> u16 {
        match self {
            Resolution::R480x272 => 480,
            Resolution::R800x480 => 800,
        }
    }

    pub fn height(self) -> u16 {
        match self {
            Resolution::R480x272 => 272,
            Resolution::R800x480 => 480,
        }
    }

    /// Timing for the common panels at this resolution.
    pub fn timing(self) -> Timing {
        match self {
            Resolution::R480x272 => Timing {
                pixel_clock: PCSR_PDATL | PCSR_4CLK,
                hsync_nondisplay: 10,
                hsync_start: 8,
                hsync_pulse_width: 48,
                hsync_finetune: 0,
                vsync_nondisplay: 3,
                vsync_start: 8,
                vsync_pulse_width: 10,
            },
            Resolution::R800x480 => Timing {
                pixel_clock: PCSR_PDATL | PCSR_2CLK,
                hsync_nondisplay: 26,
                hsync_start: 32,
                hsync_pulse_width: 96,
                hsync_finetune: 0,
                vsync_nondisplay: 32,
                vsync_start: 23,
                vsync_pulse_width: 2,
            },
        }
    }
}

/// How long to wait on a status register that reports the controller busy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollPolicy {
    /// Poll until idle, however long that takes.
    Unbounded,
    /// Give up with `Error::Timeout` after this many status reads.
    Bounded { max_polls: u32 },
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::Unbounded
    }
}

/// A configuration for the display. Builder methods override the defaults, which match the
/// timing and clocking known to work with common RA8875 modules.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub(crate) resolution: Resolution,
    pub(crate) timing: Timing,
    pub(crate) bus_mode: BusMode,
    pub(crate) init_clock: ClockDivider,
    pub(crate) normal_clock: ClockDivider,
    pub(crate) touch_clock: ClockDivider,
    pub(crate) poll_policy: PollPolicy,
    pub(crate) pwm_clock: u8,
    pub(crate) backlight: u8,
    pub(crate) touch_calibration: TouchCalibration,
}

impl Config {
    /// Create a new configuration for a panel of the given resolution.
    pub fn new(resolution: Resolution) -> Self {
        Config {
            resolution,
            timing: resolution.timing(),
            bus_mode: BusMode::Mode0,
            init_clock: ClockDivider::DIV_1024,
            normal_clock: ClockDivider::DIV_16,
            touch_clock: ClockDivider::DIV_1024,
            poll_policy: PollPolicy::Unbounded,
            pwm_clock: PWM_CLK_DIV1024,
            backlight: 255,
            touch_calibration: TouchCalibration::default(),
        }
    }

    /// Replace the preset panel timing.
    pub fn timing(self, timing: Timing) -> Self {
        Self { timing, ..self }
    }

    pub fn bus_mode(self, bus_mode: BusMode) -> Self {
        Self { bus_mode, ..self }
    }

    /// Bus clock used while initializing the controller, before its PLL is locked.
    pub fn init_clock(self, init_clock: ClockDivider) -> Self {
        Self { init_clock, ..self }
    }

    /// Bus clock used for normal display traffic after initialization.
    pub fn normal_clock(self, normal_clock: ClockDivider) -> Self {
        Self {
            normal_clock,
            ..self
        }
    }

    /// Bus clock used while sampling the touch panel ADC.
    pub fn touch_clock(self, touch_clock: ClockDivider) -> Self {
        Self {
            touch_clock,
            ..self
        }
    }

    pub fn poll_policy(self, poll_policy: PollPolicy) -> Self {
        Self {
            poll_policy,
            ..self
        }
    }

    /// PWM1 clock divider exponent (0-15) for the backlight.
    pub fn pwm_clock(self, pwm_clock: u8) -> Self {
        Self { pwm_clock, ..self }
    }

    /// Backlight duty cycle set at init.
    pub fn backlight(self, backlight: u8) -> Self {
        Self { backlight, ..self }
    }

    pub fn touch_calibration(self, touch_calibration: TouchCalibration) -> Self {
        Self {
            touch_calibration,
            ..self
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Bus settings applied when the transport is opened.
    pub(crate) fn bus_config(&self) -> BusConfig {
        BusConfig {
            mode: self.bus_mode,
            bit_order: BitOrder::MsbFirst,
            word_size: WordSize::Eight,
            clock_divider: self.init_clock,
        }
    }
}
