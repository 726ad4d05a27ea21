use thiserror::Error;

use crate::device::BdAddr;

/// Malformed AT payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("indicator list is not bracketed")]
    NotAList,
    #[error("gateway does not report the \"{0}\" indicator")]
    MissingIndicator(&'static str),
    #[error("invalid indicator status {0:?}")]
    InvalidStatus(String),
    #[error("no quoted field in call info")]
    NoQuotedField,
    #[error("invalid Bluetooth address {0:?}")]
    Address(String),
}

/// Failure reported by the Bluetooth transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("link is down")]
    NotConnected,
    #[error("transport busy")]
    Busy,
    #[error("transport failure (code {0})")]
    Code(i32),
}

impl TransportError {
    /// Numeric code carried by the resulting `Failure` event.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotConnected => -1,
            Self::Busy => -2,
            Self::Code(code) => *code,
        }
    }
}

/// Failure reported by the voice channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("voice channel could not be opened (code {0})")]
    Open(i32),
    #[error("voice channel I/O failure (code {0})")]
    Io(i32),
    /// The channel went away without an error, typically because the
    /// gateway took the audio back.
    #[error("voice channel closed")]
    Closed,
}

impl VoiceError {
    pub fn code(&self) -> i32 {
        match self {
            Self::Open(code) | Self::Io(code) => *code,
            Self::Closed => 0,
        }
    }

    /// Whether the host should show this failure to the user.
    pub fn should_report(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Error returned by transition actions. The engine logs it; recovery goes
/// through a `Failure` event raised by the action itself.
#[derive(Debug, Error)]
pub enum HfpError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Voice(#[from] VoiceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no device selected")]
    NoDevice,
    #[error("unknown device {0}")]
    UnknownDevice(BdAddr),
}
