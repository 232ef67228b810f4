use std::fmt;

/// Indicates the caller misused the reader or writer — a bug on the caller's
/// side rather than a peer violating the protocol.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IllegalStateError {
    /// `read_message` was called again without the listener draining and
    /// closing the previous message's payload stream.
    ListenerDidNotClosePayload,
    /// An operation was attempted on a reader that already observed a CLOSE
    /// frame and was marked closed by the session layer.
    ReaderClosed,
    /// An operation was attempted on a writer that already emitted a CLOSE frame.
    WriterClosed,
    /// `new_message_writer` or `send_message` was called while a streamed
    /// message writer was already active.
    AnotherWriterActive,
    /// A control-class opcode with no assigned meaning (11-15) was received.
    UnknownControlOpcode(u8),
}

impl fmt::Display for IllegalStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ListenerDidNotClosePayload => {
                write!(f, "Listener failed to call close on message payload.")
            }
            Self::ReaderClosed => write!(f, "Reader is closed."),
            Self::WriterClosed => write!(f, "Writer is closed."),
            Self::AnotherWriterActive => {
                write!(f, "A streamed message writer is already active.")
            }
            Self::UnknownControlOpcode(opcode) => {
                write!(f, "Unknown control opcode: {opcode:#x}")
            }
        }
    }
}

impl std::error::Error for IllegalStateError {}
