//! A streaming RFC 6455 WebSocket frame codec.
//!
//! This crate covers framing only: parsing and emitting the wire format,
//! fragment reassembly, control-frame interleaving, and endpoint-aware
//! masking. It does not perform the opening handshake, negotiate
//! extensions, or manage TLS — bring your own `Read + Write` stream (a
//! `TcpStream`, a TLS stream, an in-memory buffer for tests) and a
//! higher-level session type to own the handshake and close-handshake policy.
#![deny(
    missing_copy_implementations,
    trivial_casts, trivial_numeric_casts,
    unstable_features,
    unused_must_use,
    unused_mut,
    unused_imports,
    unused_import_braces)]

pub mod error;
pub mod frame;
pub mod reader;
pub mod writer;

mod config;
mod role;

pub use config::ReaderConfig;
pub use error::{Error, Result};
pub use reader::{FrameReader, MessageListener, MessagePayload, MessageType};
pub use role::Role;
pub use writer::{FrameWriter, MessageWriter};
