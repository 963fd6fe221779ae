//! 16-bit RGB565 colors, the native pixel format of the controller at 16bpp.

/// An RGB565 color: 5 bits red, 6 bits green, 5 bits blue, red in the most significant bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Rgb565 = Rgb565(0x0000);
    pub const BLUE: Rgb565 = Rgb565(0x001F);
    pub const RED: Rgb565 = Rgb565(0xF800);
    pub const GREEN: Rgb565 = Rgb565(0x07E0);
    pub const CYAN: Rgb565 = Rgb565(0x07FF);
    pub const MAGENTA: Rgb565 = Rgb565(0xF81F);
    pub const YELLOW: Rgb565 = Rgb565(0xFFE0);
    pub const WHITE: Rgb565 = Rgb565(0xFFFF);

    /// Build a color from 8-bit channels, dropping the low bits of each.
    pub const fn from_rgb888(red: u8, green: u8, blue: u8) -> Self {
        Rgb565((((red >> 3) as u16) << 11) | (((green >> 2) as u16) << 5) | (blue >> 3) as u16)
    }

    /// Split into the three channel fields in the order the color registers take them:
    /// red (5 bits), green (6 bits), blue (5 bits).
    pub fn split(self) -> [u8; 3] {
        [
            ((self.0 & 0xF800) >> 11) as u8,
            ((self.0 & 0x07E0) >> 5) as u8,
            (self.0 & 0x001F) as u8,
        ]
    }

    /// The two bytes streamed into display memory for this pixel, high byte first.
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl From<u16> for Rgb565 {
    fn from(raw: u16) -> Self {
        Rgb565(raw)
    }
}
