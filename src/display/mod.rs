//! The main API to the display driver. `Display` owns the register interface, the reset line and
//! a delay provider, runs the power-up sequence, and exposes the controller's text, graphics,
//! layer and touch features.

pub mod draw;
pub mod text;
pub mod touch;

use core::fmt;
use core::iter;

use hal::blocking::delay::DelayMs;
use hal::digital::v2::OutputPin;
use log::{debug, info, warn};

use crate::color::Rgb565;
use crate::command::consts::*;
use crate::command::*;
use crate::config::{Config, PollPolicy};
use crate::error::Error;
use crate::interface::bus::ClockDivider;
use crate::interface::DisplayInterface;

use self::draw::DrawCommand;
use self::touch::TouchPoint;

/// Lifecycle of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    /// Reset has been issued but initialization has not completed. A failed `init` leaves the
    /// display here.
    Resetting,
    Ready,
}

/// An inclusive rectangle in display pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

/// A driver for an RA8875 display controller.
pub struct Display<DI, RST, DLY> {
    iface: DI,
    reset: RST,
    delay: DLY,
    config: Config,
    state: State,
    width: u16,
    height: u16,
    /// Last mode set through `set_mode`, `None` until the first call.
    mode: Option<Mode>,
    memory: MemoryTarget,
    text_scale: u8,
    window: Window,
}

type Result<T, DI> = core::result::Result<T, Error<<DI as DisplayInterface>::Error>>;

impl<DI, RST, DLY> Display<DI, RST, DLY>
where
    DI: DisplayInterface,
    RST: OutputPin,
    DLY: DelayMs<u16>,
{
    /// Construct a new display driver for the panel described by `config`, connected through
    /// `iface` with its reset line on `reset`. Nothing is sent until `init`.
    pub fn new(iface: DI, reset: RST, delay: DLY, config: Config) -> Self {
        let width = config.resolution.width();
        let height = config.resolution.height();
        Display {
            iface,
            reset,
            delay,
            config,
            state: State::Uninitialized,
            width,
            height,
            mode: None,
            memory: MemoryTarget::Layer1,
            text_scale: 0,
            window: Window {
                left: 0,
                top: 0,
                right: width - 1,
                bottom: height - 1,
            },
        }
    }

    /// Reset the controller and bring it up: PLL, panel timing, a cleared screen, hidden cursor,
    /// ROM font on layer 1, touch panel enabled, backlight on. Runs at the configured init clock
    /// and switches the bus to the normal clock once done.
    pub fn init(&mut self) -> Result<(), DI> {
        self.state = State::Resetting;
        self.forget_mode();
        self.hard_reset()?;
        self.iface.configure(&self.config.bus_config())?;
        self.pll_init()?;

        let timing = self.config.timing;
        Command::SetSystemConfig.send(&mut self.iface)?;
        Command::SetPixelClock(timing.pixel_clock).send(&mut self.iface)?;
        self.delay.delay_ms(1);

        Command::SetHorizontalTiming {
            width: self.width,
            nondisplay: timing.hsync_nondisplay,
            finetune: timing.hsync_finetune,
            sync_start: timing.hsync_start,
            pulse_width: timing.hsync_pulse_width,
        }
        .send(&mut self.iface)?;
        Command::SetVerticalTiming {
            height: self.height,
            nondisplay: timing.vsync_nondisplay,
            sync_start: timing.vsync_start,
            pulse_width: timing.vsync_pulse_width,
        }
        .send(&mut self.iface)?;
        Command::SetDisplayConfig.send(&mut self.iface)?;

        self.set_active_window(0, 0, self.width - 1, self.height - 1)?;
        self.clear_memory(true)?;
        self.set_cursor_blink_rate(255)?;
        self.show_cursor(false, false)?;
        self.set_font_source(FontSource::InternalRom)?;
        self.select_memory(MemoryTarget::Layer1)?;
        self.touch_enable(true)?;
        self.pwm1_config(true, self.config.pwm_clock)?;
        self.pwm1_out(self.config.backlight)?;
        self.display_on(true)?;

        self.set_clock(self.config.normal_clock)?;
        self.state = State::Ready;
        info!("display ready at {}x{}", self.width, self.height);
        Ok(())
    }

    /// Close the bus. The display must be initialized again before further use.
    pub fn deinitialize(&mut self) -> Result<(), DI> {
        self.iface.release()?;
        self.state = State::Uninitialized;
        self.forget_mode();
        info!("display released");
        Ok(())
    }

    /// Pulse the reset line: low for 1ms, then 10ms to settle.
    fn hard_reset(&mut self) -> Result<(), DI> {
        info!("resetting display controller");
        self.reset.set_low().map_err(|_| Error::ResetPin)?;
        self.delay.delay_ms(1);
        self.reset.set_high().map_err(|_| Error::ResetPin)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    /// Verify the silicon ID, then program the PLL.
    fn pll_init(&mut self) -> Result<(), DI> {
        let id = self.iface.read_register(ID)?;
        if id != CHIP_ID {
            warn!("unexpected controller id 0x{:02X}", id);
            return Err(Error::IdentityMismatch { found: id });
        }
        let mut buf = [RegWrite::Byte(0, 0); 6];
        let writes = Command::SetPll(12, PLLC2_DIV2)
            .encode(&mut buf)
            .map_err(|_| Error::OutOfRange)?;
        for write in writes {
            write.send(&mut self.iface)?;
            self.delay.delay_ms(1);
        }
        info!("PLL configured");
        Ok(())
    }

    /// Issue a software reset through the power register.
    pub fn soft_reset(&mut self) -> Result<(), DI> {
        self.iface.write_command(PWRR)?;
        self.iface.write_data(PWRR_SOFTRESET)?;
        self.iface.write_data(PWRR_NORMAL)?;
        self.forget_mode();
        self.delay.delay_ms(1);
        Ok(())
    }

    /// Drop cached register state that a controller reset returns to its defaults.
    fn forget_mode(&mut self) {
        self.mode = None;
        self.text_scale = 0;
    }

    fn set_clock(&mut self, divider: ClockDivider) -> Result<(), DI> {
        debug!("bus clock {}Hz", divider.hz());
        self.iface.set_clock(divider)?;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), DI> {
        match self.state {
            State::Ready => Ok(()),
            _ => Err(Error::NotReady),
        }
    }

    /// Read-modify-write `R` in a single register selection.
    fn modify<R, F>(&mut self, f: F) -> Result<(), DI>
    where
        R: Register,
        F: FnOnce(R) -> R,
    {
        self.iface.write_command(R::ADDRESS)?;
        let raw = self.iface.read_data()?;
        self.iface.write_data(f(R::decode(raw)).encode())?;
        Ok(())
    }

    /// One status read: done once every bit in `busy` reads clear.
    fn poll_idle(&mut self, register: u8, busy: u8) -> nb::Result<(), Error<DI::Error>> {
        let status = self
            .iface
            .read_register(register)
            .map_err(|e| nb::Error::Other(Error::Transport(e)))?;
        if status & busy == 0 {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Wait for `register` to report idle according to the configured poll policy.
    fn wait_idle(&mut self, register: u8, busy: u8) -> Result<(), DI> {
        match self.config.poll_policy {
            PollPolicy::Unbounded => nb::block!(self.poll_idle(register, busy)),
            PollPolicy::Bounded { max_polls } => {
                for _ in 0..max_polls.max(1) {
                    match self.poll_idle(register, busy) {
                        Ok(()) => return Ok(()),
                        Err(nb::Error::WouldBlock) => {}
                        Err(nb::Error::Other(e)) => return Err(e),
                    }
                }
                warn!(
                    "register 0x{:02X} still busy after {} polls",
                    register, max_polls
                );
                Err(Error::Timeout { register })
            }
        }
    }

    /// Set the active window and move the graphic cursor to its top left corner. The window
    /// stays as set until changed again.
    pub fn set_active_window(
        &mut self,
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
    ) -> Result<(), DI> {
        Command::SetActiveWindow(left, top, right, bottom).send(&mut self.iface)?;
        Command::SetGraphicCursor(left, top).send(&mut self.iface)?;
        self.window = Window {
            left,
            top,
            right,
            bottom,
        };
        Ok(())
    }

    /// Clear the whole screen, or only the active window, and wait for completion.
    pub fn clear_memory(&mut self, full: bool) -> Result<(), DI> {
        Command::ClearMemory(full).send(&mut self.iface)?;
        self.wait_idle(MCLR, MCLR_STATUS)
    }

    /// Switch between graphic and text mode. Does nothing if `mode` was the last mode set.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), DI> {
        if self.mode == Some(mode) {
            return Ok(());
        }
        self.modify(|r: Mwcr0| Mwcr0 {
            text_mode: mode == Mode::Text,
            ..r
        })?;
        self.mode = Some(mode);
        debug!("mode {:?}", mode);
        Ok(())
    }

    /// Select where display memory writes go.
    pub fn select_memory(&mut self, target: MemoryTarget) -> Result<(), DI> {
        if target == MemoryTarget::Cgram {
            // CGRAM is only writable while it is not the active font source.
            let fncr0 = Fncr0::decode(self.iface.read_register(FNCR0)?);
            if fncr0.cgram {
                let fncr0 = Fncr0 {
                    cgram: false,
                    ..fncr0
                };
                self.iface.write_register(FNCR0, fncr0.encode())?;
            }
        }
        self.modify(|r: Mwcr1| r.with_target(target))?;
        self.memory = target;
        debug!("memory target {:?}", target);
        Ok(())
    }

    pub fn set_layer_mode(&mut self, mode: LayerMode) -> Result<(), DI> {
        self.modify(|r: Ltpr0| r.with_mode(mode))
    }

    /// Set layer transparency, 0 (opaque) to 8 (invisible). Larger values are clamped.
    pub fn set_layer_transparency(&mut self, layer1: u8, layer2: u8) -> Result<(), DI> {
        Command::SetLayerTransparency(layer1.min(8), layer2.min(8)).send(&mut self.iface)
    }

    pub fn set_font_source(&mut self, source: FontSource) -> Result<(), DI> {
        self.modify(|r: Fncr0| r.with_source(source))
    }

    pub fn text_set_cursor(&mut self, x: u16, y: u16) -> Result<(), DI> {
        Command::SetTextCursor(x, y).send(&mut self.iface)
    }

    /// Set text colors with an opaque background.
    pub fn text_color(&mut self, foreground: Rgb565, background: Rgb565) -> Result<(), DI> {
        Command::SetForegroundColor(foreground).send(&mut self.iface)?;
        Command::SetBackgroundColor(background).send(&mut self.iface)?;
        self.modify(|r: Fncr1| Fncr1 {
            transparent: false,
            ..r
        })
    }

    /// Set the text color and draw glyphs over whatever is underneath.
    pub fn text_transparent(&mut self, foreground: Rgb565) -> Result<(), DI> {
        Command::SetForegroundColor(foreground).send(&mut self.iface)?;
        self.modify(|r: Fncr1| Fncr1 {
            transparent: true,
            ..r
        })
    }

    /// Enlarge glyphs by `scale + 1` in both directions. `scale` is clamped to 3.
    pub fn text_enlarge(&mut self, scale: u8) -> Result<(), DI> {
        let scale = scale.min(3);
        self.modify(|r: Fncr1| Fncr1 {
            horizontal_scale: scale,
            vertical_scale: scale,
            ..r
        })?;
        self.text_scale = scale;
        Ok(())
    }

    /// Write formatted text at (`x`, `y`) using the character generator. The display should be
    /// in text mode. Fails with `Error::TextOverflow` before sending anything if the rendered
    /// text exceeds `text::TEXT_CAPACITY` bytes.
    pub fn text_write(&mut self, x: u16, y: u16, args: fmt::Arguments) -> Result<(), DI> {
        self.ensure_ready()?;
        let rendered = text::render(args).map_err(|_| Error::TextOverflow)?;
        self.text_set_cursor(x, y)?;
        self.iface.write_command(MRWC)?;
        for code in text::char_codes(&rendered) {
            self.iface.write_data(code)?;
            if self.text_scale > 0 {
                // Enlarged glyphs render slower than the bus can deliver them.
                self.delay.delay_ms(1);
            }
        }
        Ok(())
    }

    /// Upload a 16-byte 8x16 glyph into CGRAM `slot`. Leaves the display in text mode writing to
    /// layer 1.
    pub fn upload_user_char(&mut self, glyph: &[u8; 16], slot: u8) -> Result<(), DI> {
        self.set_mode(Mode::Graphic)?;
        Command::SelectCgramSlot(slot).send(&mut self.iface)?;
        self.select_memory(MemoryTarget::Cgram)?;
        self.iface.write_command(MRWC)?;
        for &row in glyph.iter() {
            self.iface.write_data(row)?;
        }
        self.set_mode(Mode::Text)?;
        self.select_memory(MemoryTarget::Layer1)
    }

    /// Show or hide the text cursor. Also resets the memory write target to layer 1.
    pub fn show_cursor(&mut self, show: bool, blink: bool) -> Result<(), DI> {
        self.modify(|r: Mwcr0| Mwcr0 {
            cursor_visible: show,
            cursor_blink: blink,
            ..r
        })?;
        self.iface.write_register(MWCR1, 0)?;
        self.memory = MemoryTarget::Layer1;
        let (w, h) = if show { (0x07, 0x01) } else { (0, 0) };
        Command::SetCursorSize(w, h).send(&mut self.iface)
    }

    pub fn set_cursor_blink_rate(&mut self, rate: u8) -> Result<(), DI> {
        Command::SetCursorBlinkRate(rate).send(&mut self.iface)
    }

    /// Move the graphic memory write cursor.
    pub fn set_xy(&mut self, x: u16, y: u16) -> Result<(), DI> {
        Command::SetGraphicCursor(x, y).send(&mut self.iface)
    }

    pub fn draw_pixel(&mut self, x: u16, y: u16, color: Rgb565) -> Result<(), DI> {
        self.ensure_ready()?;
        self.set_xy(x, y)?;
        self.iface.write_command(MRWC)?;
        self.iface.write_data_stream(color.to_bytes().iter().cloned())?;
        Ok(())
    }

    /// Blit `pixels`, row-major, into the `w` by `h` rectangle at (`x`, `y`). The active window
    /// is narrowed to the image and left that way.
    pub fn draw_image(
        &mut self,
        pixels: &[Rgb565],
        x: u16,
        y: u16,
        w: u16,
        h: u16,
    ) -> Result<(), DI> {
        self.ensure_ready()?;
        if w == 0 || h == 0 || pixels.len() != w as usize * h as usize {
            return Err(Error::OutOfRange);
        }
        let right = x.checked_add(w - 1).ok_or(Error::OutOfRange)?;
        let bottom = y.checked_add(h - 1).ok_or(Error::OutOfRange)?;
        self.set_active_window(x, y, right, bottom)?;
        self.iface.write_command(MRWC)?;
        self.iface.write_data_stream(pixels.iter().flat_map(|p| {
            let [high, low] = p.to_bytes();
            iter::once(high).chain(iter::once(low))
        }))?;
        Ok(())
    }

    /// Run one drawing engine primitive and block until the engine reports idle.
    pub fn draw(&mut self, cmd: DrawCommand) -> Result<(), DI> {
        self.ensure_ready()?;
        let status = cmd.send(&mut self.iface)?;
        self.wait_idle(status.register, status.busy)
    }

    pub fn fill_screen(&mut self, color: Rgb565) -> Result<(), DI> {
        self.draw(DrawCommand::rect(
            0,
            0,
            self.width - 1,
            self.height - 1,
            color,
            true,
        ))
    }

    /// Turn the display and the panel enable output on or off.
    pub fn display_on(&mut self, on: bool) -> Result<(), DI> {
        let power = if on {
            PowerState::DisplayOn
        } else {
            PowerState::DisplayOff
        };
        Command::SetPower(power).send(&mut self.iface)?;
        Command::SetGpiox(on).send(&mut self.iface)
    }

    pub fn sleep(&mut self, sleep: bool) -> Result<(), DI> {
        let power = if sleep {
            PowerState::Sleep
        } else {
            PowerState::DisplayOff
        };
        Command::SetPower(power).send(&mut self.iface)
    }

    /// Enable or disable a PWM channel. `clock` is the divider exponent (0-15).
    pub fn pwm_config(&mut self, channel: PwmChannel, enabled: bool, clock: u8) -> Result<(), DI> {
        Command::SetPwmConfig(channel, enabled, clock).send(&mut self.iface)
    }

    pub fn pwm_out(&mut self, channel: PwmChannel, duty: u8) -> Result<(), DI> {
        Command::SetPwmDuty(channel, duty).send(&mut self.iface)
    }

    /// PWM1 drives the backlight on most modules.
    pub fn pwm1_config(&mut self, enabled: bool, clock: u8) -> Result<(), DI> {
        self.pwm_config(PwmChannel::One, enabled, clock)
    }

    pub fn pwm2_config(&mut self, enabled: bool, clock: u8) -> Result<(), DI> {
        self.pwm_config(PwmChannel::Two, enabled, clock)
    }

    pub fn pwm1_out(&mut self, duty: u8) -> Result<(), DI> {
        self.pwm_out(PwmChannel::One, duty)
    }

    pub fn pwm2_out(&mut self, duty: u8) -> Result<(), DI> {
        self.pwm_out(PwmChannel::Two, duty)
    }

    /// Power the touch panel and its interrupt up or down.
    pub fn touch_enable(&mut self, on: bool) -> Result<(), DI> {
        if on {
            Command::EnableTouchPanel.send(&mut self.iface)?;
            self.modify(|r: Intc1| Intc1 { touch: true, ..r })
        } else {
            self.modify(|r: Intc1| Intc1 { touch: false, ..r })?;
            Command::DisableTouchPanel.send(&mut self.iface)
        }
    }

    /// Whether a touch interrupt is pending, optionally acknowledging it.
    pub fn touched(&mut self, clear: bool) -> Result<bool, DI> {
        let pending = self.iface.read_register(INTC2)? & INTC2_TP != 0;
        if clear {
            Command::ClearInterrupts(INTC2_TP).send(&mut self.iface)?;
        }
        Ok(pending)
    }

    /// Sample the touch panel at the touch clock. Returns the calibrated point if a touch was
    /// pending. The touch interrupt is acknowledged and the normal clock restored whether or not
    /// the sample succeeded.
    pub fn touch_read(&mut self) -> Result<Option<TouchPoint>, DI> {
        self.ensure_ready()?;
        let touch_clock = self.config.touch_clock;
        let sample = self
            .set_clock(touch_clock)
            .and_then(|()| self.sample_touch());
        let cleared = Command::ClearInterrupts(INTC2_TP).send(&mut self.iface);
        let restored = self.set_clock(self.config.normal_clock);
        let point = sample?;
        cleared?;
        restored?;
        Ok(point)
    }

    fn sample_touch(&mut self) -> Result<Option<TouchPoint>, DI> {
        if self.iface.read_register(INTC2)? & INTC2_TP == 0 {
            return Ok(None);
        }
        let x_high = self.iface.read_register(TPXH)?;
        let y_high = self.iface.read_register(TPYH)?;
        let low = self.iface.read_register(TPXYL)?;
        let (x, y) = touch::decode_raw(x_high, y_high, low);
        Ok(Some(self.config.touch_calibration.apply(x, y)))
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn memory_target(&self) -> MemoryTarget {
        self.memory
    }

    pub fn text_scale(&self) -> u8 {
        self.text_scale
    }

    pub fn active_window(&self) -> Window {
        self.window
    }

    /// Give back the interface, reset pin and delay.
    pub fn release(self) -> (DI, RST, DLY) {
        (self.iface, self.reset, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;
    use crate::interface::bus::BusConfig;
    use crate::interface::test_spy::{Event, TestDelay, TestPin, TestSpyBus};
    use crate::interface::SpiInterface;
    use std::vec::Vec;

    type TestDisplay = Display<SpiInterface<TestSpyBus>, TestPin, TestDelay>;

    fn display(config: Config) -> (TestSpyBus, TestDisplay) {
        let spy = TestSpyBus::new();
        let disp = Display::new(
            SpiInterface::new(spy.split()),
            spy.pin(),
            spy.delay(),
            config,
        );
        (spy, disp)
    }

    fn ready(config: Config) -> (TestSpyBus, TestDisplay) {
        let (spy, mut disp) = display(config);
        disp.init().unwrap();
        spy.clear();
        (spy, disp)
    }

    #[test]
    fn init_800x480() {
        let (spy, mut disp) = display(Config::new(Resolution::R800x480));
        disp.init().unwrap();
        assert_eq!(disp.state(), State::Ready);
        assert_eq!((disp.width(), disp.height()), (800, 480));
        assert_eq!(spy.register(PCSR), 0x81);
        assert_eq!(spy.clock(), Some(ClockDivider::DIV_16));
        assert_eq!(
            &spy.bus_events()[..5],
            &[
                Event::Pin(false),
                Event::Delay(1),
                Event::Pin(true),
                Event::Delay(10),
                Event::Init(BusConfig::default()),
            ]
        );
        #[rustfmt::skip]
        let expected: &[(u8, u8)] = &[
            (PLLC1, 0x0C), (PLLC2, 0x01),
            (SYSR, 0x0C), // 16bpp, 8-bit host
            (PCSR, 0x81),
            (HDWR, 99), (HNDFTR, 0), (HNDR, 3), (HSTR, 3), (HPWR, 11),
            (VDHR0, 0xDF), (VDHR0 + 1, 0x01),
            (VNDR0, 31), (VNDR0 + 1, 0),
            (VSTR0, 22), (VSTR0 + 1, 0),
            (VPWR, 1),
            (DPCR, 0),
            // active window and cursor
            (HSAW0, 0), (HSAW0 + 1, 0), (HEAW0, 0x1F), (HEAW0 + 1, 0x03),
            (VSAW0, 0), (VSAW0 + 1, 0), (VEAW0, 0xDF), (VEAW0 + 1, 0x01),
            (CURH0, 0), (CURH0 + 1, 0), (CURV0, 0), (CURV0 + 1, 0),
            (MCLR, 0x80),
            (BTCR, 255),
            (MWCR0, 0x00), (MWCR1, 0), (CURHS, 0), (CURVS, 0),
            (FNCR0, 0x00),
            (MWCR1, 0x00),
            (TPCR0, 0xB2), (TPCR1, 0x04), (INTC1, 0x04),
            (P1CR, 0x8A), (P1DCR, 255),
            (PWRR, 0x80), (GPIOX, 1),
        ];
        assert_eq!(spy.writes(), expected);
        assert_eq!(spy.reads_of(MCLR), 1);
    }

    #[test]
    fn init_480x272_timing() {
        let (spy, _disp) = ready(Config::new(Resolution::R480x272));
        assert_eq!(spy.register(PCSR), 0x82);
        assert_eq!(spy.register(HDWR), 59);
        assert_eq!(spy.register(HNDR), 1);
        assert_eq!(spy.register(HSTR), 0);
        assert_eq!(spy.register(HPWR), 5);
        assert_eq!(spy.register16(VDHR0), 271);
        assert_eq!(spy.register16(VNDR0), 2);
        assert_eq!(spy.register16(VSTR0), 7);
        assert_eq!(spy.register(VPWR), 9);
    }

    #[test]
    fn init_identity_mismatch() {
        let (spy, mut disp) = display(Config::new(Resolution::R800x480));
        spy.set_register(ID, 0x12);
        assert_eq!(disp.init(), Err(Error::IdentityMismatch { found: 0x12 }));
        assert_eq!(disp.state(), State::Resetting);
        assert!(spy.writes().is_empty());
        assert_eq!(
            disp.fill_screen(Rgb565::BLACK),
            Err(Error::NotReady)
        );
    }

    #[test]
    fn init_transport_failure() {
        let (spy, mut disp) = display(Config::new(Resolution::R800x480));
        spy.fail_initialize();
        assert!(match disp.init() {
            Err(Error::Transport(_)) => true,
            _ => false,
        });
        assert!(spy.sent().is_empty());
    }

    #[test]
    fn draw_before_init() {
        let (spy, mut disp) = display(Config::new(Resolution::R800x480));
        assert_eq!(
            disp.draw(DrawCommand::circle(10, 10, 5, Rgb565::RED, true)),
            Err(Error::NotReady)
        );
        assert_eq!(disp.touch_read(), Err(Error::NotReady));
        assert!(spy.sent().is_empty());
    }

    #[test]
    fn deinitialize() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.deinitialize().unwrap();
        assert_eq!(disp.state(), State::Uninitialized);
        assert_eq!(spy.bus_events(), vec![Event::Deinit]);
    }

    #[test]
    fn active_window_read_back() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.set_active_window(12, 34, 567, 432).unwrap();
        assert_eq!(spy.register16(HSAW0), 12);
        assert_eq!(spy.register16(VSAW0), 34);
        assert_eq!(spy.register16(HEAW0), 567);
        assert_eq!(spy.register16(VEAW0), 432);
        assert_eq!(spy.register16(CURH0), 12);
        assert_eq!(spy.register16(CURV0), 34);
        assert_eq!(
            disp.active_window(),
            Window {
                left: 12,
                top: 34,
                right: 567,
                bottom: 432
            }
        );
    }

    #[test]
    fn set_mode_once() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(MWCR0, 0x05);
        disp.set_mode(Mode::Text).unwrap();
        disp.set_mode(Mode::Text).unwrap();
        assert_eq!(spy.reads_of(MWCR0), 1);
        assert_eq!(spy.writes_to(MWCR0), vec![0x85]);
        disp.set_mode(Mode::Graphic).unwrap();
        assert_eq!(spy.register(MWCR0), 0x05);
        assert_eq!(disp.mode(), Some(Mode::Graphic));
    }

    #[test]
    fn reinit_forgets_mode() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.set_mode(Mode::Text).unwrap();
        disp.text_enlarge(2).unwrap();
        // The hard reset returns MWCR0 to its default.
        spy.set_register(MWCR0, 0x00);
        disp.init().unwrap();
        assert_eq!(disp.mode(), None);
        assert_eq!(disp.text_scale(), 0);
        spy.clear();
        disp.set_mode(Mode::Text).unwrap();
        assert_eq!(spy.reads_of(MWCR0), 1);
        assert_eq!(spy.register(MWCR0) & 0x80, 0x80);
    }

    #[test]
    fn soft_reset_forgets_mode() {
        let (_spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.set_mode(Mode::Graphic).unwrap();
        disp.soft_reset().unwrap();
        assert_eq!(disp.mode(), None);
        assert_eq!(disp.text_scale(), 0);
    }

    #[test]
    fn select_memory_targets() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(MWCR1, 0x01);
        spy.set_register(FNCR0, 0x81);
        disp.select_memory(MemoryTarget::Cgram).unwrap();
        assert_eq!(spy.register(FNCR0), 0x01);
        assert_eq!(spy.register(MWCR1), 0x05);
        disp.select_memory(MemoryTarget::Layer2).unwrap();
        assert_eq!(spy.register(MWCR1), 0x01);
        disp.select_memory(MemoryTarget::Cursor).unwrap();
        assert_eq!(spy.register(MWCR1), 0x09);
        disp.select_memory(MemoryTarget::Layer1).unwrap();
        assert_eq!(spy.register(MWCR1), 0x00);
        assert_eq!(disp.memory_target(), MemoryTarget::Layer1);
    }

    #[test]
    fn cgram_left_alone_when_not_font_source() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(FNCR0, 0x01);
        disp.select_memory(MemoryTarget::Cgram).unwrap();
        assert!(spy.writes_to(FNCR0).is_empty());
    }

    #[test]
    fn draw_polls_until_idle() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.script_reads(DCR, &[0x80, 0x80, 0x80]);
        disp.draw(DrawCommand::rect(1, 2, 3, 4, Rgb565::RED, false))
            .unwrap();
        assert_eq!(spy.reads_of(DCR), 4);

        spy.clear();
        spy.script_reads(ELLIPSE, &[0x80; 7]);
        disp.draw(DrawCommand::ellipse(100, 100, 40, 20, Rgb565::RED, true))
            .unwrap();
        assert_eq!(spy.reads_of(ELLIPSE), 8);
    }

    #[test]
    fn circle_polls_circle_status() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        // Only the circle bit counts for the circle engine.
        spy.script_reads(DCR, &[0x40, 0x80]);
        disp.draw(DrawCommand::circle(50, 50, 10, Rgb565::RED, true))
            .unwrap();
        assert_eq!(spy.reads_of(DCR), 2);
    }

    #[test]
    fn bounded_poll_times_out() {
        let config =
            Config::new(Resolution::R800x480).poll_policy(PollPolicy::Bounded { max_polls: 3 });
        let (spy, mut disp) = ready(config);
        spy.script_reads(DCR, &[0x80; 5]);
        assert_eq!(
            disp.draw(DrawCommand::rect(1, 2, 3, 4, Rgb565::RED, true)),
            Err(Error::Timeout { register: DCR })
        );
        assert_eq!(spy.reads_of(DCR), 3);
    }

    #[test]
    fn bounded_poll_reads_at_least_once() {
        let config =
            Config::new(Resolution::R800x480).poll_policy(PollPolicy::Bounded { max_polls: 0 });
        let (spy, mut disp) = ready(config);
        disp.draw(DrawCommand::rect(1, 2, 3, 4, Rgb565::RED, true))
            .unwrap();
        assert_eq!(spy.reads_of(DCR), 1);
    }

    #[test]
    fn fill_screen_spans_display() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.fill_screen(Rgb565::BLACK).unwrap();
        assert_eq!(spy.register16(DLHSR0), 0);
        assert_eq!(spy.register16(DLVSR0), 0);
        assert_eq!(spy.register16(DLHER0), 799);
        assert_eq!(spy.register16(DLVER0), 479);
        assert_eq!(spy.writes_to(DCR), vec![0xB0]);
    }

    #[test]
    fn touch_read_touched() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(INTC2, INTC2_TP);
        spy.set_register(TPXH, 0x64);
        spy.set_register(TPYH, 0x1E);
        spy.set_register(TPXYL, 0b1101);
        assert_eq!(disp.touch_read(), Ok(Some(TouchPoint { x: 401, y: 1 })));
        assert_eq!(spy.writes_to(INTC2), vec![INTC2_TP]);
        assert_eq!(spy.register(INTC2), 0);
        let clocks: Vec<Event> = spy
            .bus_events()
            .into_iter()
            .filter(|e| match e {
                Event::Clock(_) => true,
                _ => false,
            })
            .collect();
        assert_eq!(
            clocks,
            vec![
                Event::Clock(ClockDivider::DIV_1024),
                Event::Clock(ClockDivider::DIV_16)
            ]
        );
    }

    #[test]
    fn touch_read_untouched_still_clears() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        assert_eq!(disp.touch_read(), Ok(None));
        assert_eq!(spy.reads_of(TPXH), 0);
        assert_eq!(spy.writes_to(INTC2), vec![INTC2_TP]);
        assert_eq!(spy.clock(), Some(ClockDivider::DIV_16));
    }

    #[test]
    fn touch_read_failure_restores_clock() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        let mut bus = spy.split();
        spy.set_register(INTC2, INTC2_TP);
        // Clock change succeeds, the INTC2 command frame fails.
        bus.fail_next_write();
        assert!(disp.touch_read().is_err());
        assert_eq!(spy.clock(), Some(ClockDivider::DIV_16));
        assert_eq!(spy.writes_to(INTC2), vec![INTC2_TP]);
    }

    #[test]
    fn touch_clock_failure_still_clears() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(INTC2, INTC2_TP);
        spy.fail_next_clock();
        assert!(disp.touch_read().is_err());
        assert_eq!(spy.writes_to(INTC2), vec![INTC2_TP]);
        assert_eq!(spy.register(INTC2), 0);
        assert_eq!(spy.clock(), Some(ClockDivider::DIV_16));
        assert_eq!(spy.reads_of(TPXH), 0);
    }

    #[test]
    fn touched_flag() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(INTC2, INTC2_TP);
        assert_eq!(disp.touched(false), Ok(true));
        assert_eq!(spy.register(INTC2), INTC2_TP);
        assert_eq!(disp.touched(true), Ok(true));
        assert_eq!(disp.touched(false), Ok(false));
    }

    #[test]
    fn touch_disable_order() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(INTC1, 0x15);
        disp.touch_enable(false).unwrap();
        spy.check_writes(&[(INTC1, 0x11), (TPCR0, 0x00)]);
    }

    #[test]
    fn text_write_streams_characters() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.text_write(10, 20, format_args!("V{}", 3)).unwrap();
        assert_eq!(spy.register16(F_CURXL), 10);
        assert_eq!(spy.register16(F_CURYL), 20);
        assert_eq!(spy.writes_to(MRWC), b"V3");
        assert!(spy.delays().is_empty());
    }

    #[test]
    fn text_write_enlarged_paces_characters() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.text_enlarge(7).unwrap();
        assert_eq!(disp.text_scale(), 3);
        assert_eq!(spy.register(FNCR1) & 0x0F, 0x0F);
        disp.text_write(0, 0, format_args!("abc")).unwrap();
        assert_eq!(spy.delays(), vec![1, 1, 1]);
    }

    #[test]
    fn text_write_overflow() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        let long = "x".repeat(text::TEXT_CAPACITY + 1);
        assert_eq!(
            disp.text_write(0, 0, format_args!("{}", long)),
            Err(Error::TextOverflow)
        );
        assert!(spy.sent().is_empty());
    }

    #[test]
    fn text_colors() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.text_transparent(Rgb565::WHITE).unwrap();
        assert_eq!(spy.register(FNCR1) & 0x40, 0x40);
        disp.text_color(Rgb565::WHITE, Rgb565::BLUE).unwrap();
        assert_eq!(spy.register(FNCR1) & 0x40, 0);
        assert_eq!(
            spy.writes_to(BGCR0 + 2),
            vec![0x1F]
        );
    }

    #[test]
    fn upload_user_char() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        let glyph = [0xAAu8; 16];
        disp.upload_user_char(&glyph, 3).unwrap();
        assert_eq!(spy.register(CGSR), 3);
        assert_eq!(spy.writes_to(MRWC), vec![0xAA; 16]);
        assert_eq!(disp.mode(), Some(Mode::Text));
        assert_eq!(disp.memory_target(), MemoryTarget::Layer1);
        assert_eq!(spy.register(MWCR1), 0x00);
    }

    #[test]
    fn show_cursor() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.show_cursor(true, true).unwrap();
        assert_eq!(spy.register(MWCR0) & 0x60, 0x60);
        assert_eq!(spy.register(CURHS), 7);
        assert_eq!(spy.register(CURVS), 1);
    }

    #[test]
    fn draw_pixel_high_byte_first() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.draw_pixel(5, 6, Rgb565(0xF81F)).unwrap();
        assert_eq!(spy.register16(CURH0), 5);
        assert_eq!(spy.register16(CURV0), 6);
        assert_eq!(spy.writes_to(MRWC), vec![0xF8, 0x1F]);
    }

    #[test]
    fn draw_image_narrows_window() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        let pixels = [Rgb565(0x1234); 6];
        disp.draw_image(&pixels, 100, 200, 3, 2).unwrap();
        assert_eq!(
            disp.active_window(),
            Window {
                left: 100,
                top: 200,
                right: 102,
                bottom: 201
            }
        );
        assert_eq!(spy.register16(HEAW0), 102);
        assert_eq!(
            spy.writes_to(MRWC),
            [0x12, 0x34].iter().cycle().take(12).cloned().collect::<Vec<u8>>()
        );
        assert_eq!(
            disp.draw_image(&pixels, 0, 0, 4, 2),
            Err(Error::OutOfRange)
        );
    }

    #[test]
    fn layers() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        spy.set_register(LTPR0, 0xF0);
        disp.set_layer_mode(LayerMode::BooleanAnd).unwrap();
        assert_eq!(spy.register(LTPR0), 0xF5);
        disp.set_layer_transparency(20, 3).unwrap();
        assert_eq!(spy.register(LTPR1), 0x38);
    }

    #[test]
    fn power() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.sleep(true).unwrap();
        disp.sleep(false).unwrap();
        disp.display_on(false).unwrap();
        disp.soft_reset().unwrap();
        spy.check_writes(&[
            (PWRR, 0x02),
            (PWRR, 0x00),
            (PWRR, 0x00),
            (GPIOX, 0),
            (PWRR, 0x01),
            (PWRR, 0x00),
        ]);
    }

    #[test]
    fn pwm_channels() {
        let (spy, mut disp) = ready(Config::new(Resolution::R800x480));
        disp.pwm2_config(true, 5).unwrap();
        disp.pwm2_out(64).unwrap();
        spy.check_writes(&[(P2CR, 0x85), (P2DCR, 64)]);
        disp.pwm_config(PwmChannel::One, false, 0).unwrap();
        spy.check_writes(&[(P1CR, 0x00)]);
        assert_eq!(disp.pwm1_config(true, 16), Err(Error::OutOfRange));
    }
}
