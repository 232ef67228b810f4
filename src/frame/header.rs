use log::trace;
use std::io::{Read, Write};

use super::opcode::OpCode;

/// A decoded RFC 6455 frame header, excluding the mask key.
///
/// The mask key is read and written separately (see [`read_mask_key`] and
/// [`FrameHeader::write`]) because the reader must finish validating a
/// header — including the control-frame-length check — before it commits to
/// consuming the four mask-key bytes from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Indicates that the frame is the last one of a possibly fragmented message.
    pub final_flag: bool,
    /// Reserved for protocol extensions; must be zero, no extensions are negotiated.
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    /// WebSocket protocol opcode.
    pub opcode: OpCode,
    /// Whether MASK was set in byte 1.
    pub masked: bool,
    /// Decoded payload length (0 to 2^64-1).
    pub payload_length: u64,
}

impl FrameHeader {
    /// Longest possible encoding: 2 fixed bytes + 8-byte extended length + 4-byte mask key.
    pub(crate) const MAX_SIZE: usize = 14;

    /// Read byte 0, byte 1, and (if present) the extended length from `source`.
    /// Does not read the mask key even if `masked` is true.
    pub fn read(source: &mut impl Read) -> std::io::Result<FrameHeader> {
        let mut head = [0u8; 2];
        source.read_exact(&mut head)?;
        let (first, second) = (head[0], head[1]);
        trace!("frame header bytes: {first:08b} {second:08b}");

        let final_flag = first & super::FIN != 0;
        let rsv1 = first & super::RSV1 != 0;
        let rsv2 = first & super::RSV2 != 0;
        let rsv3 = first & super::RSV3 != 0;
        let opcode = OpCode::from_nibble(first & super::OPCODE_MASK);

        let masked = second & super::MASK_BIT != 0;
        let length_byte = second & super::LENGTH_MASK;

        let payload_length = match length_byte {
            super::LEN_16 => {
                let mut buf = [0u8; 2];
                source.read_exact(&mut buf)?;
                u64::from(u16::from_be_bytes(buf))
            }
            super::LEN_64 => {
                let mut buf = [0u8; 8];
                source.read_exact(&mut buf)?;
                u64::from_be_bytes(buf)
            }
            small => u64::from(small),
        };

        Ok(FrameHeader { final_flag, rsv1, rsv2, rsv3, opcode, masked, payload_length })
    }

    /// Write byte 0, byte 1, extended length, and (if `mask_key` is `Some`) the mask key.
    pub fn write(&self, mask_key: Option<[u8; 4]>, sink: &mut impl Write) -> std::io::Result<()> {
        let one = self.opcode.to_nibble()
            | if self.final_flag { super::FIN } else { 0 }
            | if self.rsv1 { super::RSV1 } else { 0 }
            | if self.rsv2 { super::RSV2 } else { 0 }
            | if self.rsv3 { super::RSV3 } else { 0 };

        let lenfmt = LengthFormat::for_length(self.payload_length);
        let two = lenfmt.length_byte() | if mask_key.is_some() { super::MASK_BIT } else { 0 };

        sink.write_all(&[one, two])?;
        match lenfmt {
            LengthFormat::Inline(_) => (),
            LengthFormat::U16 => sink.write_all(&(self.payload_length as u16).to_be_bytes())?,
            LengthFormat::U64 => sink.write_all(&self.payload_length.to_be_bytes())?,
        }

        if let Some(mask_key) = mask_key {
            sink.write_all(&mask_key)?;
        }

        Ok(())
    }

    /// Size in bytes of this header once encoded (not counting any mask key).
    pub fn encoded_len(&self) -> usize {
        2 + LengthFormat::for_length(self.payload_length).extra_bytes()
    }
}

/// Read the 4-byte mask key that follows a header whose MASK bit was set.
pub fn read_mask_key(source: &mut impl Read) -> std::io::Result<[u8; 4]> {
    let mut key = [0u8; 4];
    source.read_exact(&mut key)?;
    Ok(key)
}

/// The three ways a payload length can be encoded on the wire.
///
/// The boundary between `U16` and `U64` is widened to the full unsigned
/// 16-bit range (65535) rather than the donor's signed-short boundary
/// (32767) — see the length-encoding-threshold decision in SPEC_FULL.md §9.
enum LengthFormat {
    Inline(u8),
    U16,
    U64,
}

impl LengthFormat {
    #[inline]
    fn for_length(length: u64) -> Self {
        if length < 126 {
            LengthFormat::Inline(length as u8)
        } else if length <= 0xFFFF {
            LengthFormat::U16
        } else {
            LengthFormat::U64
        }
    }

    #[inline]
    fn extra_bytes(&self) -> usize {
        match self {
            LengthFormat::Inline(_) => 0,
            LengthFormat::U16 => 2,
            LengthFormat::U64 => 8,
        }
    }

    #[inline]
    fn length_byte(&self) -> u8 {
        match self {
            LengthFormat::Inline(b) => *b,
            LengthFormat::U16 => super::LEN_16,
            LengthFormat::U64 => super::LEN_64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};

    #[test]
    fn reads_inline_length() {
        let mut raw = Cursor::new(vec![0x82u8, 0x07, 0, 0, 0, 0, 0, 0, 0]);
        let header = FrameHeader::read(&mut raw).unwrap();
        assert!(header.final_flag);
        assert_eq!(header.opcode, OpCode::Binary);
        assert!(!header.masked);
        assert_eq!(header.payload_length, 7);
    }

    #[test]
    fn reads_16_bit_extended_length() {
        let mut raw = Cursor::new(vec![0x82u8, 0x7E, 0x01, 0x00]);
        let header = FrameHeader::read(&mut raw).unwrap();
        assert_eq!(header.payload_length, 256);
    }

    #[test]
    fn reads_64_bit_extended_length() {
        let mut raw = Cursor::new(vec![0x82u8, 0x7F, 0, 0, 0, 0, 0, 1, 0, 0]);
        let header = FrameHeader::read(&mut raw).unwrap();
        assert_eq!(header.payload_length, 256);
    }

    #[test]
    fn truncated_header_is_io_error() {
        let mut raw = Cursor::new(vec![0x82u8]);
        let err = FrameHeader::read(&mut raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn write_then_read_round_trips() {
        let header = FrameHeader {
            final_flag: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode: OpCode::Text,
            masked: true,
            payload_length: 70_000,
        };
        let mut buf = Vec::new();
        header.write(Some([1, 2, 3, 4]), &mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = FrameHeader::read(&mut cursor).unwrap();
        assert_eq!(decoded.opcode, OpCode::Text);
        assert_eq!(decoded.payload_length, 70_000);
        assert!(decoded.masked);
        let key = read_mask_key(&mut cursor).unwrap();
        assert_eq!(key, [1, 2, 3, 4]);
    }

    #[test]
    fn widened_threshold_uses_u16_up_to_65535() {
        let header = FrameHeader {
            final_flag: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode: OpCode::Binary,
            masked: false,
            payload_length: 40_000,
        };
        let mut buf = Vec::new();
        header.write(None, &mut buf).unwrap();
        // byte 1 carries the 126 sentinel, not a raw 8-byte length.
        assert_eq!(buf[1], 126);
    }
}
