//! Bounded text formatting for the character generator.

use core::fmt::{self, Write};

use heapless::String;

/// Longest rendered string `Display::text_write` accepts, in bytes.
pub const TEXT_CAPACITY: usize = 256;

pub type TextBuffer = String<TEXT_CAPACITY>;

/// Render `args` into a fixed buffer, failing if the output does not fit.
pub fn render(args: fmt::Arguments) -> Result<TextBuffer, fmt::Error> {
    let mut buf = TextBuffer::new();
    buf.write_fmt(args)?;
    Ok(buf)
}

/// The character codes sent for `text`. The controller treats NUL as end of string.
pub fn char_codes(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.bytes().take_while(|&b| b != 0)
}
