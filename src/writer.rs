//! Turns application messages and control frames into RFC 6455 bytes.

use std::io::Write;
use std::sync::Mutex;

use log::trace;

use crate::error::{Error, IllegalArgumentError, IllegalStateError, Result};
use crate::frame::{generate_mask, toggle_mask, FrameHeader, OpCode, MASK_SCRATCH_LEN, MAX_CONTROL_PAYLOAD};
use crate::reader::MessageType;
use crate::role::Role;

struct WriterInner<Sink> {
    sink: Sink,
    closed: bool,
    active_writer: bool,
    first_frame: bool,
    current_payload_type: Option<MessageType>,
}

/// Emits RFC 6455 frames to `sink`, masking outbound payloads when acting as
/// a client.
///
/// Every sink-mutating operation is serialized under one lock, so a control
/// frame (ping, pong, or close) can be written from another thread between a
/// streamed message's fragments without interleaving bytes within a frame.
pub struct FrameWriter<Sink> {
    role: Role,
    inner: Mutex<WriterInner<Sink>>,
}

impl<Sink: Write> FrameWriter<Sink> {
    /// Create a writer for the given role.
    pub fn new(sink: Sink, role: Role) -> Self {
        FrameWriter {
            role,
            inner: Mutex::new(WriterInner {
                sink,
                closed: false,
                active_writer: false,
                first_frame: true,
                current_payload_type: None,
            }),
        }
    }

    /// Whether `write_close` has already been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Emit a final PING control frame.
    pub fn write_ping(&self, payload: &[u8]) -> Result<()> {
        self.write_control(OpCode::Ping, payload)
    }

    /// Emit a final PONG control frame.
    pub fn write_pong(&self, payload: &[u8]) -> Result<()> {
        self.write_control(OpCode::Pong, payload)
    }

    fn write_control(&self, opcode: OpCode, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(Error::IllegalArgument(IllegalArgumentError::ControlPayloadTooLarge {
                len: payload.len(),
            }));
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(Error::IllegalState(IllegalStateError::WriterClosed));
        }
        self.write_frame_locked(&mut inner, opcode, true, payload)
    }

    /// Emit a CLOSE control frame, flush the sink, and transition the writer
    /// to `Closed`.
    ///
    /// The payload is empty when `code == 0` and `reason` is `None`, a
    /// 2-byte big-endian code when `reason` is `None`, or the code followed
    /// by UTF-8 `reason` bytes. `code == 0` with `reason.is_some()` is
    /// rejected: a reason with no code to attach it to doesn't decode on the
    /// peer's side. The sink is flushed so a buffered sink (e.g.
    /// `BufWriter<TcpStream>`) doesn't strand the close frame unsent.
    pub fn write_close(&self, code: u16, reason: Option<&str>) -> Result<()> {
        if code == 0 && reason.is_some() {
            return Err(Error::IllegalArgument(IllegalArgumentError::CloseCodeZeroWithReason));
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(Error::IllegalState(IllegalStateError::WriterClosed));
        }

        let mut payload = Vec::new();
        if code != 0 {
            payload.extend_from_slice(&code.to_be_bytes());
            if let Some(reason) = reason {
                payload.extend_from_slice(reason.as_bytes());
            }
        }
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(Error::IllegalArgument(IllegalArgumentError::ControlPayloadTooLarge {
                len: payload.len(),
            }));
        }

        self.write_frame_locked(&mut inner, OpCode::Close, true, &payload)?;
        inner.sink.flush()?;
        inner.closed = true;
        trace!("writer closed after emitting close frame (code={code})");
        Ok(())
    }

    /// Begin a streamed message. Only one may be active at a time; a second
    /// call before the first's `MessageWriter` is closed fails with
    /// `IllegalStateError::AnotherWriterActive`.
    pub fn new_message_writer(&self, message_type: MessageType) -> Result<MessageWriter<'_, Sink>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(Error::IllegalState(IllegalStateError::WriterClosed));
        }
        if inner.active_writer {
            return Err(Error::IllegalState(IllegalStateError::AnotherWriterActive));
        }
        inner.active_writer = true;
        inner.first_frame = true;
        inner.current_payload_type = Some(message_type);
        Ok(MessageWriter { writer: self })
    }

    /// Emit a single-shot message as one final frame.
    pub fn send_message(&self, payload: &[u8], message_type: MessageType) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(Error::IllegalState(IllegalStateError::WriterClosed));
        }
        if inner.active_writer {
            return Err(Error::IllegalState(IllegalStateError::AnotherWriterActive));
        }
        self.write_frame_locked(&mut inner, opcode_for(message_type), true, payload)
    }

    /// Flush the underlying sink.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sink.flush()?;
        Ok(())
    }

    /// Consume the writer and hand back the underlying sink.
    pub fn into_sink(self) -> Sink {
        self.inner.into_inner().unwrap().sink
    }

    /// Write one frame under the sink lock: header, then (if acting as a
    /// client) the masked payload streamed through a scratch buffer, so the
    /// whole payload never needs to sit in memory at once.
    fn write_frame_locked(
        &self,
        inner: &mut WriterInner<Sink>,
        opcode: OpCode,
        final_flag: bool,
        payload: &[u8],
    ) -> Result<()> {
        let mask_key = if self.role.is_client() { Some(generate_mask()) } else { None };
        let header = FrameHeader {
            final_flag,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            masked: mask_key.is_some(),
            payload_length: payload.len() as u64,
        };

        // Encode header + mask key into a stack buffer sized for the worst
        // case (`FrameHeader::MAX_SIZE`) and write it in one call, rather than
        // letting `FrameHeader::write` issue several small writes straight to
        // the sink.
        let header_len = header.encoded_len() + if mask_key.is_some() { 4 } else { 0 };
        let mut head_buf = [0u8; FrameHeader::MAX_SIZE];
        let mut head_cursor: &mut [u8] = &mut head_buf;
        header.write(mask_key, &mut head_cursor)?;
        inner.sink.write_all(&head_buf[..header_len])?;

        if let Some(mask_key) = mask_key {
            let mut scratch = [0u8; MASK_SCRATCH_LEN];
            let mut offset = 0u8;
            for chunk in payload.chunks(MASK_SCRATCH_LEN) {
                scratch[..chunk.len()].copy_from_slice(chunk);
                offset = toggle_mask(&mut scratch[..chunk.len()], mask_key, offset);
                inner.sink.write_all(&scratch[..chunk.len()])?;
            }
        } else {
            inner.sink.write_all(payload)?;
        }

        trace!("wrote frame: opcode={opcode} final={final_flag} len={}", payload.len());
        Ok(())
    }
}

fn opcode_for(message_type: MessageType) -> OpCode {
    match message_type {
        MessageType::Text => OpCode::Text,
        MessageType::Binary => OpCode::Binary,
    }
}

/// A push-sink for one streamed message, returned by
/// [`FrameWriter::new_message_writer`]. Each [`write`](MessageWriter::write)
/// call emits a non-final fragment; [`close`](MessageWriter::close) emits
/// the final fragment and releases the writer for the next message.
pub struct MessageWriter<'a, Sink> {
    writer: &'a FrameWriter<Sink>,
}

impl<'a, Sink: Write> MessageWriter<'a, Sink> {
    /// Emit `chunk` as a non-final fragment. The opening fragment carries
    /// the message's TEXT/BINARY opcode; every later one is CONTINUATION.
    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let mut inner = self.writer.inner.lock().unwrap();
        if inner.closed {
            return Err(Error::IllegalState(IllegalStateError::WriterClosed));
        }
        let opcode = self.next_opcode(&inner);
        self.writer.write_frame_locked(&mut inner, opcode, false, chunk)?;
        inner.first_frame = false;
        Ok(())
    }

    /// Flush the underlying sink without emitting a frame.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }

    /// Emit the final fragment, flush the sink, and release the writer.
    /// Zero-length unless preceded by at least one `write` call; if no
    /// fragment was written yet, this emits a single final frame carrying
    /// the message's own TEXT/BINARY opcode (a message can't open with
    /// CONTINUATION) rather than CONTINUATION.
    pub fn close(self) -> Result<()> {
        let mut inner = self.writer.inner.lock().unwrap();
        if inner.closed {
            inner.active_writer = false;
            return Ok(());
        }
        let opcode = self.next_opcode(&inner);
        self.writer.write_frame_locked(&mut inner, opcode, true, &[])?;
        inner.sink.flush()?;
        inner.active_writer = false;
        inner.first_frame = true;
        inner.current_payload_type = None;
        Ok(())
    }

    fn next_opcode(&self, inner: &WriterInner<Sink>) -> OpCode {
        if inner.first_frame {
            opcode_for(inner.current_payload_type.expect("active writer always carries a payload type"))
        } else {
            OpCode::Continuation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{read_mask_key, MASK_BIT};
    use std::io::Cursor;

    fn decode_all(wire: &[u8]) -> Vec<(FrameHeader, Vec<u8>)> {
        let mut cursor = Cursor::new(wire.to_vec());
        let mut frames = Vec::new();
        while (cursor.position() as usize) < wire.len() {
            let header = FrameHeader::read(&mut cursor).unwrap();
            let mask_key = if header.masked { Some(read_mask_key(&mut cursor).unwrap()) } else { None };
            let mut payload = vec![0u8; header.payload_length as usize];
            std::io::Read::read_exact(&mut cursor, &mut payload).unwrap();
            if let Some(mask_key) = mask_key {
                toggle_mask(&mut payload, mask_key, 0);
            }
            frames.push((header, payload));
        }
        frames
    }

    #[test]
    fn send_message_emits_single_final_frame() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        writer.send_message(b"hello", MessageType::Text).unwrap();
        let wire = writer.inner.into_inner().unwrap().sink;

        let frames = decode_all(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0.opcode, OpCode::Text);
        assert!(frames[0].0.final_flag);
        assert!(!frames[0].0.masked);
        assert_eq!(frames[0].1, b"hello");
    }

    #[test]
    fn client_role_masks_outbound_frames() {
        let writer = FrameWriter::new(Vec::new(), Role::Client);
        writer.send_message(b"hi", MessageType::Binary).unwrap();
        let wire = writer.inner.into_inner().unwrap().sink;
        assert_eq!(wire[1] & MASK_BIT, MASK_BIT);

        let frames = decode_all(&wire);
        assert_eq!(frames[0].1, b"hi");
    }

    #[test]
    fn streamed_message_fragments_then_closes_with_continuation() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        {
            let mut msg = writer.new_message_writer(MessageType::Text).unwrap();
            msg.write(b"hel").unwrap();
            msg.write(b"lo").unwrap();
            msg.close().unwrap();
        }
        let wire = writer.inner.into_inner().unwrap().sink;

        let frames = decode_all(&wire);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].0.opcode, OpCode::Text);
        assert!(!frames[0].0.final_flag);
        assert_eq!(frames[0].1, b"hel");
        assert_eq!(frames[1].0.opcode, OpCode::Continuation);
        assert!(!frames[1].0.final_flag);
        assert_eq!(frames[1].1, b"lo");
        assert_eq!(frames[2].0.opcode, OpCode::Continuation);
        assert!(frames[2].0.final_flag);
        assert_eq!(frames[2].1, b"");
    }

    #[test]
    fn closing_without_prior_write_uses_message_opcode() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        {
            let msg = writer.new_message_writer(MessageType::Binary).unwrap();
            msg.close().unwrap();
        }
        let wire = writer.inner.into_inner().unwrap().sink;

        let frames = decode_all(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0.opcode, OpCode::Binary);
        assert!(frames[0].0.final_flag);
        assert_eq!(frames[0].1, b"");
    }

    #[test]
    fn second_message_writer_rejected_while_one_active() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        let _msg = writer.new_message_writer(MessageType::Text).unwrap();
        let err = writer.new_message_writer(MessageType::Text).unwrap_err();
        assert!(matches!(err, Error::IllegalState(IllegalStateError::AnotherWriterActive)));
    }

    #[test]
    fn oversized_control_payload_is_illegal_argument() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        let err = writer.write_ping(&[0u8; 126]).unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalArgument(IllegalArgumentError::ControlPayloadTooLarge { len: 126 })
        ));
    }

    #[test]
    fn close_code_zero_with_reason_is_illegal_argument() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        let err = writer.write_close(0, Some("bye")).unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalArgument(IllegalArgumentError::CloseCodeZeroWithReason)
        ));
    }

    #[test]
    fn write_close_emits_code_and_reason_then_closes_writer() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        writer.write_close(1000, Some("bye")).unwrap();
        assert!(writer.is_closed());

        let wire = writer.inner.into_inner().unwrap().sink;
        let frames = decode_all(&wire);
        assert_eq!(frames[0].0.opcode, OpCode::Close);
        assert_eq!(&frames[0].1[..2], &1000u16.to_be_bytes());
        assert_eq!(&frames[0].1[2..], b"bye");
    }

    #[test]
    fn operations_after_close_fail() {
        let writer = FrameWriter::new(Vec::new(), Role::Server);
        writer.write_close(1000, None).unwrap();
        let err = writer.write_ping(b"x").unwrap_err();
        assert!(matches!(err, Error::IllegalState(IllegalStateError::WriterClosed)));
    }

    /// Counts `flush` calls so tests can confirm the writer actually flushes
    /// the sink rather than leaving bytes sitting in a buffer.
    #[derive(Default)]
    struct CountingSink {
        written: Vec<u8>,
        flush_calls: usize,
    }

    impl std::io::Write for CountingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flush_calls += 1;
            Ok(())
        }
    }

    #[test]
    fn write_close_flushes_the_sink() {
        let writer = FrameWriter::new(CountingSink::default(), Role::Server);
        writer.write_close(1000, None).unwrap();
        let sink = writer.into_sink();
        assert_eq!(sink.flush_calls, 1);
    }

    #[test]
    fn message_writer_close_flushes_the_sink() {
        let writer = FrameWriter::new(CountingSink::default(), Role::Server);
        {
            let mut msg = writer.new_message_writer(MessageType::Text).unwrap();
            msg.write(b"hi").unwrap();
            msg.close().unwrap();
        }
        let sink = writer.into_sink();
        assert_eq!(sink.flush_calls, 1);
    }
}
