//! The messaging session seam: everything the core needs from the network.

use {async_trait::async_trait, voxrelay_common::Jid};

use crate::{
    error::SessionError,
    types::{InboundEvent, OutgoingMessage, PresenceState, SentMessage, UploadKind, UploadedMedia},
};

/// A connected messaging account.
///
/// Pairing, encryption and the socket live behind this trait.
#[async_trait]
pub trait MessagingSession: Send + Sync {
    /// Fetch and decrypt the media attached to `event`.
    async fn download(&self, event: &InboundEvent) -> Result<Vec<u8>, SessionError>;

    async fn upload(&self, data: &[u8], kind: UploadKind) -> Result<UploadedMedia, SessionError>;

    async fn send(&self, to: &Jid, message: OutgoingMessage) -> Result<SentMessage, SessionError>;

    async fn set_presence(&self, chat: &Jid, state: PresenceState) -> Result<(), SessionError>;

    /// Display name from the address book, if known.
    async fn contact_name(&self, _jid: &Jid) -> Option<String> {
        None
    }

    /// The account's own identity, once paired.
    fn own_jid(&self) -> Option<Jid> {
        None
    }
}
