/// Reader-side knobs. Handshake-only settings the donor exposes on
/// `WebSocketConfig` (accept-unmasked-frames, header size limits) are
/// dropped here since the handshake is out of this codec's scope.
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    /// Maximum allowed `payload_length` for a single frame, checked against
    /// the header as soon as it's decoded, before any payload byte is read.
    /// `None` disables the check. Defaults to 64 MiB, matching the donor's
    /// default max message size.
    pub max_frame_size: Option<u64>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig { max_frame_size: Some(64 << 20) }
    }
}
