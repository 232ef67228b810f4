use std::fmt;

/// Indicates a configured size limit was exceeded.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CapacityError {
    /// A frame's declared payload length exceeded the reader's configured
    /// `max_frame_size`. Raised as soon as the header is decoded, before any
    /// payload byte is read.
    MessageTooLong {
        /// The size the frame header declared.
        size: u64,
        /// The configured maximum.
        max_size: u64,
    },
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MessageTooLong { size, max_size } => {
                write!(f, "Message too long: {size} > {max_size}")
            }
        }
    }
}

impl std::error::Error for CapacityError {}
