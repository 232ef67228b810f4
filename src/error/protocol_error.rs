use std::fmt;

use crate::frame::OpCode;

/// Indicates the specific type/cause of a protocol error raised by the reader.
///
/// Message text is preserved byte-for-byte for the cases an interoperability
/// test suite might scrape (reserved bits, masking mismatch, control frame
/// size, control frame fragmentation).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolError {
    /// A control frame (CLOSE/PING/PONG) was received with `FIN` unset.
    ControlFrameNotFinal,
    /// RSV1, RSV2, or RSV3 was set; no extension is negotiated by this codec.
    ReservedBitsSet,
    /// A client-role reader saw an unmasked frame, or a server-role reader saw
    /// a masked one.
    MaskMismatch,
    /// A control frame declared a payload longer than 125 bytes.
    ControlFrameTooLarge,
    /// A non-CONTINUATION opcode arrived while a fragmented message was open.
    ExpectedContinuation(OpCode),
    /// A CONTINUATION frame arrived with no message open to continue.
    UnexpectedContinuation,
    /// Byte 0's low nibble did not decode to a known or reserved-but-valid opcode.
    InvalidOpcode(u8),
    /// A CLOSE frame's payload was exactly 1 byte (too short for a status code)
    /// or its reason was not valid UTF-8.
    InvalidCloseSequence,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ControlFrameNotFinal => write!(f, "Control frames must be final."),
            Self::ReservedBitsSet => write!(f, "Reserved flags are unsupported."),
            Self::MaskMismatch => {
                write!(f, "Client-sent frames must be masked. Server sent must not.")
            }
            Self::ControlFrameTooLarge => write!(f, "Control frame must be less than 125B."),
            Self::ExpectedContinuation(opcode) => {
                write!(f, "Expected continuation opcode. Got: {opcode}")
            }
            Self::UnexpectedContinuation => {
                write!(f, "Received continuation frame with nothing to continue.")
            }
            Self::InvalidOpcode(opcode) => write!(f, "Encountered invalid opcode: {opcode}"),
            Self::InvalidCloseSequence => write!(f, "Invalid close sequence"),
        }
    }
}

impl std::error::Error for ProtocolError {}
