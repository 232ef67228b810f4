//! Turns a byte stream of RFC 6455 frames into whole application messages.

use std::collections::VecDeque;
use std::io::Read;

use log::{debug, trace};

use crate::config::ReaderConfig;
use crate::error::{CapacityError, Error, IllegalStateError, ProtocolError, Result};
use crate::frame::{self, read_mask_key, toggle_mask, FrameHeader, OpCode, MASK_SCRATCH_LEN};
use crate::role::Role;

/// The type of a complete application message delivered to a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// The message's fragments carry a UTF-8 text payload.
    Text,
    /// The message's fragments carry an arbitrary binary payload.
    Binary,
}

/// Hooks a session layer implements to receive decoded messages and control
/// frames from [`FrameReader::read_message`].
///
/// Only `on_message` is required; the control-frame hooks default to no-ops
/// so a listener can implement just what it needs.
pub trait MessageListener<Source: Read> {
    /// Called once per successful [`FrameReader::read_message`].
    /// Implementations must read `payload` to completion and call
    /// [`MessagePayload::close`] before returning, or the reader raises
    /// `IllegalStateError::ListenerDidNotClosePayload` on return.
    fn on_message(
        &mut self,
        payload: &mut MessagePayload<'_, Source>,
        message_type: MessageType,
    ) -> Result<()>;

    /// Invoked with a received PING frame's payload.
    fn on_ping(&mut self, _payload: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Invoked with a received PONG frame's payload.
    fn on_pong(&mut self, _payload: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Invoked with a received CLOSE frame's status code and UTF-8 reason
    /// (code `0` and an empty reason if the peer sent an empty CLOSE frame).
    fn on_close(&mut self, _code: u16, _reason: &str) -> Result<()> {
        Ok(())
    }
}

/// A queued control-frame event, drained by `read_message` once it's safe to
/// call back into the listener. See [`FrameReader::drain_pending_control`].
enum ControlEvent {
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(u16, String),
}

/// Mutable state describing the frame currently being streamed out through a
/// `MessagePayload`.
struct FrameState {
    opcode: OpCode,
    final_flag: bool,
    masked: bool,
    mask_key: [u8; 4],
    mask_offset: u8,
    frame_remaining: u64,
}

impl FrameState {
    fn idle() -> Self {
        FrameState {
            opcode: OpCode::Continuation,
            final_flag: true,
            masked: false,
            mask_key: [0; 4],
            mask_offset: 0,
            frame_remaining: 0,
        }
    }
}

/// Reads RFC 6455 frames from `source` and surfaces whole application
/// messages to a [`MessageListener`], handling fragmentation, interleaved
/// control frames, and masking along the way.
///
/// Single-threaded and blocking: exactly one `read_message` call is in
/// flight at a time, and the listener must fully drain and close the
/// payload stream it's handed before `read_message` returns.
pub struct FrameReader<Source> {
    source: Source,
    role: Role,
    config: ReaderConfig,
    closed: bool,
    message_closed: bool,
    state: FrameState,
    pending_control: VecDeque<ControlEvent>,
    scratch: [u8; MASK_SCRATCH_LEN],
}

impl<Source: Read> FrameReader<Source> {
    /// Create a reader for the given role with default configuration.
    pub fn new(source: Source, role: Role) -> Self {
        Self::with_config(source, role, ReaderConfig::default())
    }

    /// Create a reader with an explicit [`ReaderConfig`].
    pub fn with_config(source: Source, role: Role, config: ReaderConfig) -> Self {
        FrameReader {
            source,
            role,
            config,
            closed: false,
            message_closed: true,
            state: FrameState::idle(),
            pending_control: VecDeque::new(),
            scratch: [0; MASK_SCRATCH_LEN],
        }
    }

    /// Mark the reader closed. The session layer calls this once a CLOSE
    /// frame has been processed; further `read_message` calls then fail.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the reader has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read and deliver exactly one application message to `listener`,
    /// handling any control frames observed along the way.
    pub fn read_message<L: MessageListener<Source>>(&mut self, listener: &mut L) -> Result<()> {
        if self.closed {
            return Err(Error::IllegalState(IllegalStateError::ReaderClosed));
        }

        // Drain before propagating: a control frame (e.g. the peer's CLOSE)
        // can be queued right before the read that follows it hits EOF, and
        // the listener still needs that callback even though the read failed.
        let read_result = self.read_until_non_control();
        self.drain_pending_control(listener)?;
        read_result?;

        let message_type = match self.state.opcode {
            OpCode::Text => MessageType::Text,
            OpCode::Binary => MessageType::Binary,
            OpCode::Continuation => {
                return Err(Error::Protocol(ProtocolError::UnexpectedContinuation))
            }
            other => return Err(Error::Protocol(ProtocolError::ExpectedContinuation(other))),
        };

        self.message_closed = false;
        {
            let mut payload = MessagePayload { reader: self, exhausted: false };
            listener.on_message(&mut payload, message_type)?;
        }

        if !self.message_closed {
            return Err(Error::IllegalState(IllegalStateError::ListenerDidNotClosePayload));
        }

        self.drain_pending_control(listener)
    }

    /// Invoke the listener's control hooks for every control frame observed
    /// since the last drain.
    ///
    /// Control frames encountered mid-message (between the fragments of an
    /// open `on_message` call) can't be delivered right away: doing so would
    /// need a second `&mut` borrow of `listener` while `on_message` already
    /// holds one. They're queued instead and drained here — once before the
    /// next message's frames are read, and once right after `on_message`
    /// returns — which are the only points this reader ever calls back into
    /// the listener for a control frame.
    fn drain_pending_control<L: MessageListener<Source>>(&mut self, listener: &mut L) -> Result<()> {
        while let Some(event) = self.pending_control.pop_front() {
            match event {
                ControlEvent::Ping(payload) => listener.on_ping(&payload)?,
                ControlEvent::Pong(payload) => listener.on_pong(&payload)?,
                ControlEvent::Close(code, reason) => listener.on_close(code, &reason)?,
            }
        }
        Ok(())
    }

    /// Parse headers, dispatching control frames to `read_control_frame`,
    /// until a non-control header is parsed. Leaves `self.state` positioned
    /// at the start of that frame's payload.
    fn read_until_non_control(&mut self) -> Result<()> {
        loop {
            let header = self.read_header()?;
            if header.opcode.is_control() {
                self.read_control_frame(&header)?;
                continue;
            }

            self.state = FrameState {
                opcode: header.opcode,
                final_flag: header.final_flag,
                masked: header.masked,
                mask_key: if header.masked { read_mask_key(&mut self.source)? } else { [0; 4] },
                mask_offset: 0,
                frame_remaining: header.payload_length,
            };
            return Ok(());
        }
    }

    /// Parse and validate one frame header, in the order laid out in
    /// SPEC_FULL.md §4.2.
    fn read_header(&mut self) -> Result<FrameHeader> {
        let header = FrameHeader::read(&mut self.source)?;
        let is_control = header.opcode.is_control();

        if is_control && !header.final_flag {
            return Err(Error::Protocol(ProtocolError::ControlFrameNotFinal));
        }
        if header.rsv1 || header.rsv2 || header.rsv3 {
            return Err(Error::Protocol(ProtocolError::ReservedBitsSet));
        }
        if header.masked == self.role.is_client() {
            return Err(Error::Protocol(ProtocolError::MaskMismatch));
        }
        if is_control && header.payload_length as usize > frame::MAX_CONTROL_PAYLOAD {
            return Err(Error::Protocol(ProtocolError::ControlFrameTooLarge));
        }
        if let OpCode::Reserved(opcode) = header.opcode {
            if is_control {
                return Err(Error::IllegalState(IllegalStateError::UnknownControlOpcode(opcode)));
            }
            return Err(Error::Protocol(ProtocolError::InvalidOpcode(opcode)));
        }
        if let Some(max_size) = self.config.max_frame_size {
            if header.payload_length > max_size {
                return Err(Error::Capacity(CapacityError::MessageTooLong {
                    size: header.payload_length,
                    max_size,
                }));
            }
        }

        trace!(
            "parsed frame header: opcode={:?} final={} masked={} len={}",
            header.opcode, header.final_flag, header.masked, header.payload_length
        );

        Ok(header)
    }

    /// Drain a control frame's payload and queue the listener event it maps to.
    fn read_control_frame(&mut self, header: &FrameHeader) -> Result<()> {
        let len = header.payload_length as usize;
        let mask_key = if header.masked { Some(read_mask_key(&mut self.source)?) } else { None };

        let mut buf = [0u8; frame::MAX_CONTROL_PAYLOAD];
        self.source.read_exact(&mut buf[..len])?;
        if let Some(mask_key) = mask_key {
            toggle_mask(&mut buf[..len], mask_key, 0);
        }

        match header.opcode {
            OpCode::Close => {
                if len == 1 {
                    return Err(Error::Protocol(ProtocolError::InvalidCloseSequence));
                }
                let code = if len >= 2 { u16::from_be_bytes([buf[0], buf[1]]) } else { 0 };
                let reason = if len > 2 {
                    std::str::from_utf8(&buf[2..len])
                        .map_err(|_| Error::Protocol(ProtocolError::InvalidCloseSequence))?
                        .to_owned()
                } else {
                    String::new()
                };
                debug!("received close frame: code={code} reason={reason:?}");
                self.pending_control.push_back(ControlEvent::Close(code, reason));
            }
            OpCode::Ping => {
                self.pending_control.push_back(ControlEvent::Ping(buf[..len].to_vec()))
            }
            OpCode::Pong => {
                self.pending_control.push_back(ControlEvent::Pong(buf[..len].to_vec()))
            }
            other => unreachable!("read_control_frame called with data opcode {other:?}"),
        }

        Ok(())
    }

    /// Pull up to `buf.len()` bytes of the current message's payload,
    /// crossing into the next fragment (draining any control frames ahead
    /// of it) as needed. Returns `Ok(0)` once the final fragment is exhausted.
    fn read_payload(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            if self.state.frame_remaining == 0 {
                if self.state.final_flag {
                    return Ok(0);
                }
                self.read_until_non_control()?;
                if self.state.opcode != OpCode::Continuation {
                    return Err(Error::Protocol(ProtocolError::ExpectedContinuation(self.state.opcode)));
                }
                continue;
            }

            let want = buf.len().min(self.state.frame_remaining as usize);
            let n = if self.state.masked {
                let chunk = want.min(MASK_SCRATCH_LEN);
                self.source.read_exact(&mut self.scratch[..chunk])?;
                self.state.mask_offset =
                    toggle_mask(&mut self.scratch[..chunk], self.state.mask_key, self.state.mask_offset);
                buf[..chunk].copy_from_slice(&self.scratch[..chunk]);
                chunk
            } else {
                self.source.read_exact(&mut buf[..want])?;
                want
            };

            self.state.frame_remaining -= n as u64;
            return Ok(n);
        }
    }

    /// Skip the remainder of the current frame and any subsequent fragments
    /// (and the control frames interleaved among them) up to and including
    /// the final one.
    fn skip_payload(&mut self) -> Result<()> {
        loop {
            while self.state.frame_remaining > 0 {
                let chunk = (self.state.frame_remaining as usize).min(self.scratch.len());
                self.source.read_exact(&mut self.scratch[..chunk])?;
                self.state.frame_remaining -= chunk as u64;
            }
            if self.state.final_flag {
                return Ok(());
            }
            self.read_until_non_control()?;
            if self.state.opcode != OpCode::Continuation {
                return Err(Error::Protocol(ProtocolError::ExpectedContinuation(self.state.opcode)));
            }
        }
    }
}

/// A pull-stream over one message's payload, valid for the duration of a
/// single [`MessageListener::on_message`] callback. The listener must fully
/// read it and then call [`close`](MessagePayload::close).
pub struct MessagePayload<'a, Source> {
    reader: &'a mut FrameReader<Source>,
    exhausted: bool,
}

impl<'a, Source: Read> MessagePayload<'a, Source> {
    /// Read up to `buf.len()` bytes, returning `Ok(0)` at end of message.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.exhausted || buf.is_empty() {
            return Ok(0);
        }
        let n = self.reader.read_payload(buf)?;
        if n == 0 {
            self.exhausted = true;
        }
        Ok(n)
    }

    /// Drain and discard the rest of the message, then mark it closed. A
    /// no-op if the message (or the reader itself) is already closed.
    pub fn close(&mut self) -> Result<()> {
        if self.reader.message_closed {
            return Ok(());
        }
        if !self.exhausted {
            self.reader.skip_payload()?;
        }
        self.reader.message_closed = true;
        Ok(())
    }
}
