//! Error taxonomy shared by every layer of the driver.

use core::fmt;

/// Errors returned by the display driver. `E` is the error type of the underlying bus transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The bus transport could not be opened, configured, or failed mid-transfer. There is no
    /// recovery path at the transport layer: a corrupted frame leaves the controller registers in
    /// an undefined combination, so callers should treat this as fatal for the channel.
    Transport(E),
    /// The identification register did not hold the RA8875 silicon ID during PLL init.
    IdentityMismatch {
        /// The value read back from the identification register.
        found: u8,
    },
    /// The reset line could not be driven.
    ResetPin,
    /// A status poll exceeded the configured `PollPolicy::Bounded` limit.
    Timeout {
        /// The status register that never reported idle.
        register: u8,
    },
    /// Formatted text did not fit in the text buffer.
    TextOverflow,
    /// The controller has not completed initialization.
    NotReady,
    /// A command parameter was outside the range the controller accepts.
    OutOfRange,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Transport(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "bus transport failure: {:?}", e),
            Error::IdentityMismatch { found } => {
                write!(f, "unexpected controller id 0x{:02X}", found)
            }
            Error::Timeout { register } => {
                write!(f, "status register 0x{:02X} never reported idle", register)
            }
            Error::ResetPin => f.write_str("failed to drive the reset line"),
            Error::TextOverflow => f.write_str("formatted text exceeds the text buffer"),
            Error::NotReady => f.write_str("controller is not initialized"),
            Error::OutOfRange => f.write_str("command parameter out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}
