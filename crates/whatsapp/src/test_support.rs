//! In-process fakes for the session seam.

use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
};

use {async_trait::async_trait, chrono::Utc, voxrelay_common::Jid};

use crate::{
    error::SessionError,
    session::MessagingSession,
    types::{
        InboundEvent, OutgoingMessage, PresenceState, SentMessage, UploadKind, UploadedMedia,
        VoiceNote,
    },
};

#[derive(Default)]
pub(crate) struct FakeSession {
    pub failing_uploads: u32,
    pub fail_sends: bool,
    pub fail_download: bool,
    pub audio: Vec<u8>,
    pub contact: Option<String>,
    pub(crate) uploads: AtomicU32,
    pub(crate) sent: Mutex<Vec<(Jid, OutgoingMessage)>>,
    /// Each presence update with the number of messages sent before it.
    pub(crate) presence: Mutex<Vec<(PresenceState, usize)>>,
}

impl FakeSession {
    pub fn upload_calls(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(Jid, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|(_, m)| match m {
                OutgoingMessage::Text(t) => Some(t),
                OutgoingMessage::Voice(_) => None,
            })
            .collect()
    }

    pub fn voice_notes(&self) -> Vec<VoiceNote> {
        self.sent()
            .into_iter()
            .filter_map(|(_, m)| match m {
                OutgoingMessage::Voice(v) => Some(v),
                OutgoingMessage::Text(_) => None,
            })
            .collect()
    }

    pub fn presence(&self) -> Vec<PresenceState> {
        self.presence_marks().into_iter().map(|(p, _)| p).collect()
    }

    pub fn presence_marks(&self) -> Vec<(PresenceState, usize)> {
        self.presence.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingSession for FakeSession {
    async fn download(&self, _event: &InboundEvent) -> Result<Vec<u8>, SessionError> {
        if self.fail_download {
            return Err(SessionError::Media("media expired".into()));
        }
        Ok(self.audio.clone())
    }

    async fn upload(&self, data: &[u8], _kind: UploadKind) -> Result<UploadedMedia, SessionError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        if n < self.failing_uploads {
            return Err(SessionError::Media(format!("upload {n} refused")));
        }
        Ok(UploadedMedia {
            url: format!("https://mmg.example/{}", data.len()),
            direct_path: "/v/t62".into(),
            ..Default::default()
        })
    }

    async fn send(&self, to: &Jid, message: OutgoingMessage) -> Result<SentMessage, SessionError> {
        if self.fail_sends {
            return Err(SessionError::Disconnected);
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.clone(), message));
        Ok(SentMessage {
            id: format!("OUT{}", sent.len()),
            timestamp: Utc::now(),
        })
    }

    async fn set_presence(&self, _chat: &Jid, state: PresenceState) -> Result<(), SessionError> {
        let sent = self.sent.lock().unwrap().len();
        self.presence.lock().unwrap().push((state, sent));
        Ok(())
    }

    async fn contact_name(&self, _jid: &Jid) -> Option<String> {
        self.contact.clone()
    }

    fn own_jid(&self) -> Option<Jid> {
        Jid::parse("15559990000@s.whatsapp.net").ok()
    }
}
