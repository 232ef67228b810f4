//! Error handling.

mod capacity_error;
mod illegal_argument_error;
mod illegal_state_error;
mod protocol_error;

pub use capacity_error::CapacityError;
pub use illegal_argument_error::IllegalArgumentError;
pub use illegal_state_error::IllegalStateError;
pub use protocol_error::ProtocolError;

use std::{fmt, io, result};

/// Result type of all calls into this crate.
pub type Result<T> = result::Result<T, Error>;

/// The error kinds this codec can raise (see SPEC_FULL.md §7): protocol
/// violations by the peer, I/O failures on the underlying stream, a
/// configured size limit being exceeded, and misuse of the reader/writer
/// API by the caller.
pub enum Error {
    /// Input-output error on the underlying source or sink. Includes
    /// truncated reads (`io::ErrorKind::UnexpectedEof`), which this codec
    /// treats as an I/O error rather than a protocol error.
    Io(io::Error),
    /// A malformed frame from the peer.
    Protocol(ProtocolError),
    /// A configured size limit (currently just `ReaderConfig::max_frame_size`)
    /// was exceeded.
    Capacity(CapacityError),
    /// The caller misused the reader or writer.
    IllegalState(IllegalStateError),
    /// The caller passed an invalid argument to a writer operation.
    IllegalArgument(IllegalArgumentError),
}

impl From<io::Error> for Error {
    #[inline]
    fn from(from: io::Error) -> Self {
        Self::Io(from)
    }
}

impl From<ProtocolError> for Error {
    #[inline]
    fn from(from: ProtocolError) -> Self {
        Self::Protocol(from)
    }
}

impl From<CapacityError> for Error {
    #[inline]
    fn from(from: CapacityError) -> Self {
        Self::Capacity(from)
    }
}

impl From<IllegalStateError> for Error {
    #[inline]
    fn from(from: IllegalStateError) -> Self {
        Self::IllegalState(from)
    }
}

impl From<IllegalArgumentError> for Error {
    #[inline]
    fn from(from: IllegalArgumentError) -> Self {
        Self::IllegalArgument(from)
    }
}

impl fmt::Debug for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Io(ref elem) => write!(f, "IO error: {elem}"),
            Self::Protocol(ref elem) => write!(f, "WebSocket protocol error: {elem}"),
            Self::Capacity(ref elem) => write!(f, "Space limit exceeded: {elem}"),
            Self::IllegalState(ref elem) => write!(f, "Illegal state: {elem}"),
            Self::IllegalArgument(ref elem) => write!(f, "Illegal argument: {elem}"),
        }
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}
