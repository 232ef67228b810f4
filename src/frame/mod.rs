//! Bit-level constants and building blocks for RFC 6455 frames: header
//! parsing (`header`), opcode classification (`opcode`), and the XOR mask
//! toggle (`mask`). The reader and writer, at the crate root, own the
//! stateful protocol behaviour; this module only knows about one frame at
//! a time.

pub mod header;
pub mod mask;
pub mod opcode;

pub use header::{read_mask_key, FrameHeader};
pub use mask::{generate_mask, toggle_mask};
pub use opcode::OpCode;

/// Header byte 0: terminal-fragment bit.
pub const FIN: u8 = 0x80;
/// Header byte 0: reserved bit 1, must be zero (no extensions negotiated).
pub const RSV1: u8 = 0x40;
/// Header byte 0: reserved bit 2, must be zero.
pub const RSV2: u8 = 0x20;
/// Header byte 0: reserved bit 3, must be zero.
pub const RSV3: u8 = 0x10;
/// Header byte 0: low nibble carrying the opcode.
pub const OPCODE_MASK: u8 = 0x0F;

/// Header byte 1: MASK bit.
pub const MASK_BIT: u8 = 0x80;
/// Header byte 1: 7-bit inline length (or sentinel).
pub const LENGTH_MASK: u8 = 0x7F;
/// Length-byte sentinel: actual length follows as 2 big-endian bytes.
pub const LEN_16: u8 = 126;
/// Length-byte sentinel: actual length follows as 8 big-endian bytes.
pub const LEN_64: u8 = 127;

/// Control frame payloads must be this size or smaller.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Size of the scratch buffer used to mask/unmask a frame's payload in
/// chunks, so a full message is never materialized in memory by the codec.
pub const MASK_SCRATCH_LEN: usize = 2048;
