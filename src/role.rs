/// Which side of the connection this codec instance plays.
///
/// Governs the masking invariant in both directions: a client must mask
/// every frame it writes and must reject any masked frame it reads; a
/// server mirrors that (write unmasked, reject unmasked reads).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This endpoint is a server.
    Server,
    /// This endpoint is a client.
    Client,
}

impl Role {
    #[inline]
    pub(crate) fn is_client(self) -> bool {
        matches!(self, Role::Client)
    }
}
