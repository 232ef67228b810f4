use std::fmt;

/// Indicates the caller passed an invalid argument to a writer operation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IllegalArgumentError {
    /// A ping/pong/close payload exceeded 125 bytes.
    ControlPayloadTooLarge {
        /// The payload length the caller tried to send.
        len: usize,
    },
    /// `write_close` was called with `code == 0` and a non-null reason.
    CloseCodeZeroWithReason,
}

impl fmt::Display for IllegalArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ControlPayloadTooLarge { len } => write!(
                f,
                "Control frame payload must be 125 bytes or fewer (got {len})."
            ),
            Self::CloseCodeZeroWithReason => {
                write!(f, "Cannot write a close reason without a close code.")
            }
        }
    }
}

impl std::error::Error for IllegalArgumentError {}
