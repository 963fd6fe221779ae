//! The register set of the RA8875.
//!
//! Multi-register settings are expressed as `Command`s, which validate their parameters and encode
//! into a short list of register writes before anything is sent. Registers that the driver
//! changes with a read-modify-write are modelled as bit-field structs implementing `Register`.

use itertools::izip;

use crate::color::Rgb565;
use crate::error::Error;
use crate::interface::DisplayInterface;

/// Register addresses and bit values, as named in the controller datasheet.
pub mod consts {
    /// Silicon ID held by the identification register.
    pub const CHIP_ID: u8 = 0x75;

    pub const ID: u8 = 0x00;

    pub const PWRR: u8 = 0x01;
    pub const PWRR_DISPON: u8 = 0x80;
    pub const PWRR_DISPOFF: u8 = 0x00;
    pub const PWRR_SLEEP: u8 = 0x02;
    pub const PWRR_NORMAL: u8 = 0x00;
    pub const PWRR_SOFTRESET: u8 = 0x01;

    pub const MRWC: u8 = 0x02;

    pub const PCSR: u8 = 0x04;
    pub const PCSR_PDATL: u8 = 0x80;
    pub const PCSR_2CLK: u8 = 0x01;
    pub const PCSR_4CLK: u8 = 0x02;

    pub const SYSR: u8 = 0x10;
    pub const SYSR_16BPP: u8 = 0x0C;
    pub const SYSR_MCU8: u8 = 0x00;

    pub const HDWR: u8 = 0x14;
    pub const HNDFTR: u8 = 0x15;
    pub const HNDFTR_DE_HIGH: u8 = 0x00;
    pub const HNDR: u8 = 0x16;
    pub const HSTR: u8 = 0x17;
    pub const HPWR: u8 = 0x18;
    pub const HPWR_LOW: u8 = 0x00;

    pub const VDHR0: u8 = 0x19;
    pub const VNDR0: u8 = 0x1B;
    pub const VSTR0: u8 = 0x1D;
    pub const VPWR: u8 = 0x1F;
    pub const VPWR_LOW: u8 = 0x00;

    pub const DPCR: u8 = 0x20;

    pub const FNCR0: u8 = 0x21;
    pub const FNCR1: u8 = 0x22;
    pub const CGSR: u8 = 0x23;

    pub const F_CURXL: u8 = 0x2A;
    pub const F_CURYL: u8 = 0x2C;

    pub const HSAW0: u8 = 0x30;
    pub const VSAW0: u8 = 0x32;
    pub const HEAW0: u8 = 0x34;
    pub const VEAW0: u8 = 0x36;

    pub const MWCR0: u8 = 0x40;
    pub const MWCR1: u8 = 0x41;
    pub const BTCR: u8 = 0x44;
    pub const CURH0: u8 = 0x46;
    pub const CURV0: u8 = 0x48;
    pub const CURHS: u8 = 0x4E;
    pub const CURVS: u8 = 0x4F;

    pub const LTPR0: u8 = 0x52;
    pub const LTPR1: u8 = 0x53;

    pub const BGCR0: u8 = 0x60;
    pub const FGCR0: u8 = 0x63;

    pub const TPCR0: u8 = 0x70;
    pub const TPCR0_ENABLE: u8 = 0x80;
    pub const TPCR0_WAIT_4096CLK: u8 = 0x30;
    pub const TPCR0_WAKEDISABLE: u8 = 0x00;
    pub const TPCR0_ADCCLK_DIV4: u8 = 0x02;
    pub const TPCR1: u8 = 0x71;
    pub const TPCR1_AUTO: u8 = 0x00;
    pub const TPCR1_DEBOUNCE: u8 = 0x04;
    pub const TPXH: u8 = 0x72;
    pub const TPYH: u8 = 0x73;
    pub const TPXYL: u8 = 0x74;

    pub const PLLC1: u8 = 0x88;
    pub const PLLC2: u8 = 0x89;
    pub const PLLC2_DIV2: u8 = 0x01;

    pub const P1CR: u8 = 0x8A;
    pub const P1DCR: u8 = 0x8B;
    pub const P2CR: u8 = 0x8C;
    pub const P2DCR: u8 = 0x8D;
    pub const PXCR_ENABLE: u8 = 0x80;
    pub const PWM_CLK_DIV1024: u8 = 0x0A;

    pub const MCLR: u8 = 0x8E;
    pub const MCLR_START: u8 = 0x80;
    pub const MCLR_STATUS: u8 = 0x80;
    pub const MCLR_FULL: u8 = 0x00;
    pub const MCLR_ACTIVE: u8 = 0x40;

    pub const DCR: u8 = 0x90;
    pub const DCR_LINESQUTRI_START: u8 = 0x80;
    pub const DCR_LINESQUTRI_STATUS: u8 = 0x80;
    pub const DCR_CIRCLE_START: u8 = 0x40;
    pub const DCR_CIRCLE_STATUS: u8 = 0x40;
    pub const DCR_FILL: u8 = 0x20;
    pub const DCR_NOFILL: u8 = 0x00;
    pub const DCR_DRAWSQUARE: u8 = 0x10;
    pub const DCR_DRAWTRIANGLE: u8 = 0x01;

    pub const DLHSR0: u8 = 0x91;
    pub const DLVSR0: u8 = 0x93;
    pub const DLHER0: u8 = 0x95;
    pub const DLVER0: u8 = 0x97;
    pub const DCHR0: u8 = 0x99;
    pub const DCVR0: u8 = 0x9B;
    pub const DCRR: u8 = 0x9D;

    pub const ELLIPSE: u8 = 0xA0;
    pub const ELLIPSE_START: u8 = 0x80;
    pub const ELLIPSE_STATUS: u8 = 0x80;
    pub const ELLIPSE_FILL: u8 = 0x40;
    pub const ELLIPSE_CURVE: u8 = 0x10;
    pub const ELL_A0: u8 = 0xA1;
    pub const ELL_B0: u8 = 0xA3;
    pub const DEHR0: u8 = 0xA5;
    pub const DEVR0: u8 = 0xA7;
    pub const DTPH0: u8 = 0xA9;
    pub const DTPV0: u8 = 0xAB;

    pub const GPIOX: u8 = 0xC7;

    pub const INTC1: u8 = 0xF0;
    pub const INTC1_TP: u8 = 0x04;
    pub const INTC2: u8 = 0xF1;
    pub const INTC2_TP: u8 = 0x04;
}

use self::consts::*;

/// Largest coordinate the 10-bit position registers hold.
pub const COORD_MAX: u16 = 1023;

/// Whether display memory writes are interpreted as pixels or as character codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Graphic,
    Text,
}

/// The destination of display memory writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryTarget {
    Layer1,
    Layer2,
    /// The user-defined character generator RAM.
    Cgram,
    /// The pattern RAM used by block transfers.
    Pattern,
    /// The graphic cursor bitmap.
    Cursor,
}

/// Where character glyphs come from in text mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontSource {
    /// The built-in character ROM.
    InternalRom,
    /// Glyphs uploaded into CGRAM.
    UserRam,
}

/// How the two layers are combined on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerMode {
    OnlyLayer1,
    OnlyLayer2,
    LightenOverlay,
    Transparent,
    BooleanOr,
    BooleanAnd,
    FloatingWindow,
}

impl LayerMode {
    fn bits(self) -> u8 {
        match self {
            LayerMode::OnlyLayer1 => 0,
            LayerMode::OnlyLayer2 => 1,
            LayerMode::LightenOverlay => 2,
            LayerMode::Transparent => 3,
            LayerMode::BooleanOr => 4,
            LayerMode::BooleanAnd => 5,
            LayerMode::FloatingWindow => 6,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x07 {
            0 => Some(LayerMode::OnlyLayer1),
            1 => Some(LayerMode::OnlyLayer2),
            2 => Some(LayerMode::LightenOverlay),
            3 => Some(LayerMode::Transparent),
            4 => Some(LayerMode::BooleanOr),
            5 => Some(LayerMode::BooleanAnd),
            6 => Some(LayerMode::FloatingWindow),
            _ => None,
        }
    }
}

/// Power register states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    DisplayOn,
    DisplayOff,
    Sleep,
    SoftReset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PwmChannel {
    One,
    Two,
}

impl PwmChannel {
    fn registers(self) -> (u8, u8) {
        match self {
            PwmChannel::One => (P1CR, P1DCR),
            PwmChannel::Two => (P2CR, P2DCR),
        }
    }
}

/// A register the driver updates with read-modify-write. `decode` must keep every bit the struct
/// does not name so that `encode` writes it back untouched.
pub trait Register: Copy {
    const ADDRESS: u8;

    fn decode(raw: u8) -> Self;

    fn encode(self) -> u8;
}

/// Memory write control register 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mwcr0 {
    pub text_mode: bool,
    pub cursor_visible: bool,
    pub cursor_blink: bool,
    pub(crate) other: u8,
}

impl Register for Mwcr0 {
    const ADDRESS: u8 = MWCR0;

    fn decode(raw: u8) -> Self {
        Mwcr0 {
            text_mode: raw & 0x80 != 0,
            cursor_visible: raw & 0x40 != 0,
            cursor_blink: raw & 0x20 != 0,
            other: raw & 0x1F,
        }
    }

    fn encode(self) -> u8 {
        let mut raw = self.other;
        if self.text_mode {
            raw |= 0x80;
        }
        if self.cursor_visible {
            raw |= 0x40;
        }
        if self.cursor_blink {
            raw |= 0x20;
        }
        raw
    }
}

/// Memory write control register 1: write destination and layer select.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mwcr1 {
    /// Bits 3:2. 00 layers, 01 CGRAM, 10 graphic cursor, 11 pattern.
    destination: u8,
    layer2: bool,
    pub(crate) other: u8,
}

impl Mwcr1 {
    pub fn with_target(self, target: MemoryTarget) -> Self {
        let (destination, layer2) = match target {
            MemoryTarget::Layer1 => (0b00, false),
            MemoryTarget::Layer2 => (0b00, true),
            MemoryTarget::Cgram => (0b01, self.layer2),
            MemoryTarget::Cursor => (0b10, self.layer2),
            MemoryTarget::Pattern => (0b11, self.layer2),
        };
        Mwcr1 {
            destination,
            layer2,
            ..self
        }
    }
}

impl Register for Mwcr1 {
    const ADDRESS: u8 = MWCR1;

    fn decode(raw: u8) -> Self {
        Mwcr1 {
            destination: (raw >> 2) & 0x03,
            layer2: raw & 0x01 != 0,
            other: raw & 0xF2,
        }
    }

    fn encode(self) -> u8 {
        self.other | self.destination << 2 | self.layer2 as u8
    }
}

/// Font control register 0: glyph source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fncr0 {
    pub cgram: bool,
    pub external_rom: bool,
    pub(crate) other: u8,
}

impl Fncr0 {
    pub fn with_source(self, source: FontSource) -> Self {
        match source {
            FontSource::InternalRom => Fncr0 {
                cgram: false,
                external_rom: false,
                ..self
            },
            FontSource::UserRam => Fncr0 {
                cgram: true,
                ..self
            },
        }
    }
}

impl Register for Fncr0 {
    const ADDRESS: u8 = FNCR0;

    fn decode(raw: u8) -> Self {
        Fncr0 {
            cgram: raw & 0x80 != 0,
            external_rom: raw & 0x20 != 0,
            other: raw & 0x5F,
        }
    }

    fn encode(self) -> u8 {
        let mut raw = self.other;
        if self.cgram {
            raw |= 0x80;
        }
        if self.external_rom {
            raw |= 0x20;
        }
        raw
    }
}

/// Font control register 1: background transparency and glyph enlargement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fncr1 {
    pub transparent: bool,
    pub horizontal_scale: u8,
    pub vertical_scale: u8,
    pub(crate) other: u8,
}

impl Register for Fncr1 {
    const ADDRESS: u8 = FNCR1;

    fn decode(raw: u8) -> Self {
        Fncr1 {
            transparent: raw & 0x40 != 0,
            horizontal_scale: (raw >> 2) & 0x03,
            vertical_scale: raw & 0x03,
            other: raw & 0xB0,
        }
    }

    fn encode(self) -> u8 {
        let mut raw =
            self.other | (self.horizontal_scale & 0x03) << 2 | (self.vertical_scale & 0x03);
        if self.transparent {
            raw |= 0x40;
        }
        raw
    }
}

/// Layer transparency register 0: layer display mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ltpr0 {
    mode: u8,
    pub(crate) other: u8,
}

impl Ltpr0 {
    /// The combination mode, or `None` for the reserved encoding.
    pub fn mode(self) -> Option<LayerMode> {
        LayerMode::from_bits(self.mode)
    }

    pub fn with_mode(self, mode: LayerMode) -> Self {
        Ltpr0 {
            mode: mode.bits(),
            ..self
        }
    }
}

impl Register for Ltpr0 {
    const ADDRESS: u8 = LTPR0;

    fn decode(raw: u8) -> Self {
        Ltpr0 {
            mode: raw & 0x07,
            other: raw & 0xF8,
        }
    }

    fn encode(self) -> u8 {
        self.other | self.mode
    }
}

/// Interrupt control register 1: interrupt enables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intc1 {
    pub touch: bool,
    pub(crate) other: u8,
}

impl Register for Intc1 {
    const ADDRESS: u8 = INTC1;

    fn decode(raw: u8) -> Self {
        Intc1 {
            touch: raw & INTC1_TP != 0,
            other: raw & !INTC1_TP,
        }
    }

    fn encode(self) -> u8 {
        if self.touch {
            self.other | INTC1_TP
        } else {
            self.other
        }
    }
}

/// One encoded register write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegWrite {
    Byte(u8, u8),
    /// A 16-bit value over a register pair, low byte first.
    Word(u8, u16),
}

impl RegWrite {
    pub fn send<DI>(self, iface: &mut DI) -> Result<(), DI::Error>
    where
        DI: DisplayInterface,
    {
        match self {
            RegWrite::Byte(reg, value) => iface.write_register(reg, value),
            RegWrite::Word(reg, value) => iface.write_register16(reg, value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Set the power register: display on or off, sleep, or pulse a software reset.
    SetPower(PowerState),
    /// Drive the extra general purpose output, which enables the panel on common modules.
    SetGpiox(bool),
    /// Configure the PLL: input multiplier (1-31) and output divider exponent (0-7).
    SetPll(u8, u8),
    /// Select 16 bits per pixel color depth and an 8-bit host interface.
    SetSystemConfig,
    /// Set the pixel clock register. Bit 7 selects the fetch edge and bits 1:0 the period.
    SetPixelClock(u8),
    /// Program the horizontal display timing. Widths and sync values are in pixels and, except
    /// for the fine tune (0-15), must be multiples of 8.
    SetHorizontalTiming {
        width: u16,
        nondisplay: u16,
        finetune: u8,
        sync_start: u16,
        pulse_width: u16,
    },
    /// Program the vertical display timing, in lines.
    SetVerticalTiming {
        height: u16,
        nondisplay: u16,
        sync_start: u16,
        pulse_width: u16,
    },
    /// Set one-layer scan with no rotation.
    SetDisplayConfig,
    /// Set the active window as (left, top, right, bottom), inclusive.
    SetActiveWindow(u16, u16, u16, u16),
    /// Set the memory write cursor used in graphic mode.
    SetGraphicCursor(u16, u16),
    /// Set the text write cursor.
    SetTextCursor(u16, u16),
    SetForegroundColor(Rgb565),
    SetBackgroundColor(Rgb565),
    /// Set the text cursor blink period in frames.
    SetCursorBlinkRate(u8),
    /// Set the text cursor width (0-31, in pixels minus one) and height (0-31).
    SetCursorSize(u8, u8),
    /// Select the CGRAM character slot written by the next glyph upload.
    SelectCgramSlot(u8),
    /// Set the transparency of layer 1 and layer 2, each 0 (opaque) to 8 (invisible).
    SetLayerTransparency(u8, u8),
    /// Start a memory clear of the whole screen (`true`) or of the active window.
    ClearMemory(bool),
    /// Enable or disable a PWM channel with a clock divider exponent (0-15).
    SetPwmConfig(PwmChannel, bool, u8),
    SetPwmDuty(PwmChannel, u8),
    /// Power the touch panel ADC in auto mode with debounce.
    EnableTouchPanel,
    DisableTouchPanel,
    /// Acknowledge the interrupts in the mask.
    ClearInterrupts(u8),
}

macro_rules! ok_writes {
    ($buf:ident, [$($write:expr),*]) => {{
        let mut len = 0;
        $(
            $buf[len] = $write;
            len += 1;
        )*
        Ok(&$buf[..len])
    }};
}

impl Command {
    /// Validate and encode into the register writes that implement the command, in order.
    pub fn encode(self, buf: &mut [RegWrite; 6]) -> Result<&[RegWrite], ()> {
        use self::RegWrite::{Byte, Word};

        match self {
            Command::SetPower(state) => {
                let value = match state {
                    PowerState::DisplayOn => PWRR_NORMAL | PWRR_DISPON,
                    PowerState::DisplayOff => PWRR_NORMAL | PWRR_DISPOFF,
                    PowerState::Sleep => PWRR_DISPOFF | PWRR_SLEEP,
                    PowerState::SoftReset => PWRR_SOFTRESET,
                };
                ok_writes!(buf, [Byte(PWRR, value)])
            }
            Command::SetGpiox(on) => ok_writes!(buf, [Byte(GPIOX, on as u8)]),
            Command::SetPll(multiplier, divider) => match (multiplier, divider) {
                (1..=31, 0..=7) => {
                    ok_writes!(buf, [Byte(PLLC1, multiplier), Byte(PLLC2, divider)])
                }
                _ => Err(()),
            },
            Command::SetSystemConfig => ok_writes!(buf, [Byte(SYSR, SYSR_16BPP | SYSR_MCU8)]),
            Command::SetPixelClock(pcsr) => match pcsr & 0x7C {
                0 => ok_writes!(buf, [Byte(PCSR, pcsr)]),
                _ => Err(()),
            },
            Command::SetHorizontalTiming {
                width,
                nondisplay,
                finetune,
                sync_start,
                pulse_width,
            } => {
                let ok = width >= 8
                    && width <= COORD_MAX + 1
                    && width % 8 == 0
                    && finetune <= 15
                    && nondisplay >= finetune as u16 + 2
                    && (nondisplay - finetune as u16 - 2) / 8 <= 0x1F
                    && sync_start >= 8
                    && sync_start / 8 - 1 <= 0x1F
                    && pulse_width >= 8
                    && pulse_width / 8 - 1 <= 0x1F;
                if !ok {
                    return Err(());
                }
                ok_writes!(
                    buf,
                    [
                        Byte(HDWR, (width / 8 - 1) as u8),
                        Byte(HNDFTR, HNDFTR_DE_HIGH | finetune),
                        Byte(HNDR, ((nondisplay - finetune as u16 - 2) / 8) as u8),
                        Byte(HSTR, (sync_start / 8 - 1) as u8),
                        Byte(HPWR, HPWR_LOW | (pulse_width / 8 - 1) as u8)
                    ]
                )
            }
            Command::SetVerticalTiming {
                height,
                nondisplay,
                sync_start,
                pulse_width,
            } => match (height, nondisplay, sync_start, pulse_width) {
                (1..=1024, 1..=512, 1..=512, 1..=128) => ok_writes!(
                    buf,
                    [
                        Word(VDHR0, height - 1),
                        Word(VNDR0, nondisplay - 1),
                        Word(VSTR0, sync_start - 1),
                        Byte(VPWR, VPWR_LOW | (pulse_width - 1) as u8)
                    ]
                ),
                _ => Err(()),
            },
            Command::SetDisplayConfig => ok_writes!(buf, [Byte(DPCR, 0x00)]),
            Command::SetActiveWindow(left, top, right, bottom) => {
                if left > right || top > bottom || right > COORD_MAX || bottom > COORD_MAX {
                    return Err(());
                }
                ok_writes!(
                    buf,
                    [
                        Word(HSAW0, left),
                        Word(HEAW0, right),
                        Word(VSAW0, top),
                        Word(VEAW0, bottom)
                    ]
                )
            }
            Command::SetGraphicCursor(x, y) => match (x, y) {
                (0..=COORD_MAX, 0..=COORD_MAX) => {
                    ok_writes!(buf, [Word(CURH0, x), Word(CURV0, y)])
                }
                _ => Err(()),
            },
            Command::SetTextCursor(x, y) => match (x, y) {
                (0..=COORD_MAX, 0..=COORD_MAX) => {
                    ok_writes!(buf, [Word(F_CURXL, x), Word(F_CURYL, y)])
                }
                _ => Err(()),
            },
            Command::SetForegroundColor(color) => Ok(color_writes(buf, FGCR0, color)),
            Command::SetBackgroundColor(color) => Ok(color_writes(buf, BGCR0, color)),
            Command::SetCursorBlinkRate(rate) => ok_writes!(buf, [Byte(BTCR, rate)]),
            Command::SetCursorSize(w, h) => match (w, h) {
                (0..=31, 0..=31) => ok_writes!(buf, [Byte(CURHS, w), Byte(CURVS, h)]),
                _ => Err(()),
            },
            Command::SelectCgramSlot(slot) => ok_writes!(buf, [Byte(CGSR, slot)]),
            Command::SetLayerTransparency(layer1, layer2) => match (layer1, layer2) {
                (0..=8, 0..=8) => ok_writes!(buf, [Byte(LTPR1, layer2 << 4 | layer1)]),
                _ => Err(()),
            },
            Command::ClearMemory(full) => {
                let area = if full { MCLR_FULL } else { MCLR_ACTIVE };
                ok_writes!(buf, [Byte(MCLR, MCLR_START | area)])
            }
            Command::SetPwmConfig(channel, enabled, clock) => match clock {
                0..=15 => {
                    let (ctrl, _) = channel.registers();
                    let ena = if enabled { PXCR_ENABLE } else { 0x00 };
                    ok_writes!(buf, [Byte(ctrl, ena | clock)])
                }
                _ => Err(()),
            },
            Command::SetPwmDuty(channel, duty) => {
                let (_, duty_reg) = channel.registers();
                ok_writes!(buf, [Byte(duty_reg, duty)])
            }
            Command::EnableTouchPanel => ok_writes!(
                buf,
                [
                    Byte(
                        TPCR0,
                        TPCR0_ENABLE | TPCR0_WAIT_4096CLK | TPCR0_WAKEDISABLE | TPCR0_ADCCLK_DIV4
                    ),
                    Byte(TPCR1, TPCR1_AUTO | TPCR1_DEBOUNCE)
                ]
            ),
            Command::DisableTouchPanel => ok_writes!(buf, [Byte(TPCR0, 0x00)]),
            Command::ClearInterrupts(mask) => ok_writes!(buf, [Byte(INTC2, mask)]),
        }
    }

    /// Validate the command, then transmit it to the display at `iface`. Nothing is sent if
    /// validation fails.
    pub fn send<DI>(self, iface: &mut DI) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
    {
        let mut buf = [RegWrite::Byte(0, 0); 6];
        let writes = self.encode(&mut buf).map_err(|_| Error::OutOfRange)?;
        for write in writes {
            write.send(iface)?;
        }
        Ok(())
    }
}

/// Write the 5/6/5 channel fields of `color` into the three consecutive registers at `base`.
fn color_writes(buf: &mut [RegWrite; 6], base: u8, color: Rgb565) -> &[RegWrite] {
    let channels = color.split();
    for (slot, reg, &value) in izip!(buf.iter_mut(), base.., channels.iter()) {
        *slot = RegWrite::Byte(reg, value);
    }
    &buf[..channels.len()]
}
