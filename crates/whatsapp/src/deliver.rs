//! Outbound delivery: voice notes with upload retry, and plain text.

use std::{path::Path, sync::Arc, time::Duration};

use {
    tracing::{debug, info, warn},
    voxrelay_common::{Jid, MessageKind},
    voxrelay_config::DeliveryConfig,
    voxrelay_media::{DurationProbe, Ffprobe, audio_mime_type, probe_or_estimate},
    voxrelay_store::{MessageRecord, Store},
};

use crate::{
    error::{DeliveryError, SessionError},
    history::record_message,
    session::MessagingSession,
    types::{OutgoingMessage, SentMessage, UploadKind, UploadedMedia, VoiceNote},
};

/// Bounded, fixed-delay retry for media uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl From<&DeliveryConfig> for RetryPolicy {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            attempts: config.upload_attempts.max(1),
            delay: Duration::from_millis(config.upload_retry_delay_ms),
        }
    }
}

pub struct OutboundDeliverer {
    session: Arc<dyn MessagingSession>,
    store: Arc<dyn Store>,
    probe: Option<Arc<dyn DurationProbe>>,
    retry: RetryPolicy,
}

impl OutboundDeliverer {
    /// Deliverer with the default retry policy and no duration probe.
    #[must_use]
    pub fn new(session: Arc<dyn MessagingSession>, store: Arc<dyn Store>) -> Self {
        Self {
            session,
            store,
            probe: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Deliverer configured from `[delivery]`, probing with ffprobe when found.
    #[must_use]
    pub fn from_config(
        session: Arc<dyn MessagingSession>,
        store: Arc<dyn Store>,
        config: &DeliveryConfig,
    ) -> Self {
        let probe = match Ffprobe::discover(config.ffprobe_path.as_deref()) {
            Ok(p) => Some(Arc::new(p) as Arc<dyn DurationProbe>),
            Err(e) => {
                warn!(error = %e, "ffprobe not available, voice durations will be estimated");
                None
            },
        };
        Self::new(session, store)
            .with_retry(RetryPolicy::from(config))
            .with_probe(probe)
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Option<Arc<dyn DurationProbe>>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Upload `audio` and send it to `to` as a push-to-talk voice note.
    pub async fn send_voice(&self, to: &Jid, audio: &Path) -> Result<SentMessage, DeliveryError> {
        let data = tokio::fs::read(audio)
            .await
            .map_err(|source| DeliveryError::Read {
                path: audio.display().to_string(),
                source,
            })?;
        if data.is_empty() {
            return Err(DeliveryError::InvalidInput(format!(
                "audio file is empty: {}",
                audio.display()
            )));
        }

        let mime = audio_mime_type(audio);
        let seconds = probe_or_estimate(self.probe.as_deref(), audio).await;
        debug!(to = %to, size = data.len(), mime, seconds, "prepared voice note");

        let media = self.upload_with_retry(&data, UploadKind::Audio).await?;

        let note = VoiceNote {
            media,
            mime: mime.to_string(),
            seconds,
            file_length: data.len() as u64,
            ptt: true,
        };
        let sent = self
            .session
            .send(to, OutgoingMessage::Voice(note))
            .await
            .map_err(DeliveryError::Send)?;
        info!(to = %to, message_id = %sent.id, seconds, "voice note sent");

        self.persist_sent(to, &sent, MessageKind::Voice, String::new())
            .await;
        Ok(sent)
    }

    /// Send a plain text message to `to`.
    pub async fn send_text(&self, to: &Jid, text: &str) -> Result<SentMessage, DeliveryError> {
        if text.trim().is_empty() {
            return Err(DeliveryError::InvalidInput("text message is empty".into()));
        }
        let sent = self
            .session
            .send(to, OutgoingMessage::Text(text.to_string()))
            .await
            .map_err(DeliveryError::Send)?;
        debug!(to = %to, message_id = %sent.id, "text sent");

        self.persist_sent(to, &sent, MessageKind::Text, text.to_string())
            .await;
        Ok(sent)
    }

    async fn upload_with_retry(
        &self,
        data: &[u8],
        kind: UploadKind,
    ) -> Result<UploadedMedia, DeliveryError> {
        let attempts = self.retry.attempts.max(1);
        let mut last = SessionError::Disconnected;

        for attempt in 1..=attempts {
            match self.session.upload(data, kind).await {
                Ok(media) => {
                    debug!(attempt, url = %media.url, "upload succeeded");
                    return Ok(media);
                },
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "upload attempt failed");
                    last = e;
                },
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        Err(DeliveryError::Upload { attempts, last })
    }

    async fn persist_sent(&self, to: &Jid, sent: &SentMessage, kind: MessageKind, text: String) {
        let content = kind
            .placeholder()
            .map_or(text, str::to_string);
        let record = MessageRecord {
            id: sent.id.clone(),
            chat: to.clone(),
            sender: self.session.own_jid().unwrap_or_else(|| to.clone()),
            timestamp: sent.timestamp,
            content,
            kind,
            filename: None,
            is_from_me: true,
        };
        record_message(self.store.as_ref(), self.session.as_ref(), &record, None).await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::FakeSession,
        voxrelay_store::MemoryStore,
    };

    fn jid() -> Jid {
        Jid::parse("15550001111@s.whatsapp.net").unwrap()
    }

    struct FixedProbe(f64);

    #[async_trait::async_trait]
    impl DurationProbe for FixedProbe {
        async fn duration_secs(&self, _path: &Path) -> voxrelay_media::Result<f64> {
            Ok(self.0)
        }
    }

    async fn audio_file(dir: &tempfile::TempDir, name: &str, size: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, vec![7u8; size]).await.unwrap();
        path
    }

    #[tokio::test]
    async fn voice_note_uses_probe_and_persists_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(&dir, "reply.ogg", 4_000).await;
        let session = Arc::new(FakeSession::default());
        let store = Arc::new(MemoryStore::new());
        let deliverer = OutboundDeliverer::new(session.clone(), store.clone())
            .with_probe(Some(Arc::new(FixedProbe(6.6))));

        let sent = deliverer.send_voice(&jid(), &path).await.unwrap();

        let notes = session.voice_notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].mime, "audio/ogg");
        assert_eq!(notes[0].seconds, 7);
        assert_eq!(notes[0].file_length, 4_000);
        assert!(notes[0].ptt);

        let record = store.get_message(&sent.id).await.unwrap().unwrap();
        assert!(record.is_from_me);
        assert_eq!(record.kind, MessageKind::Voice);
        assert_eq!(record.content, "[Voice Message]");
        let chat = store.get_chat(&jid()).await.unwrap().unwrap();
        assert_eq!(chat.last_message, "[Voice Message]");
    }

    #[tokio::test]
    async fn duration_falls_back_to_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(&dir, "reply.opus", 48_000).await;
        let session = Arc::new(FakeSession::default());
        let deliverer = OutboundDeliverer::new(session.clone(), Arc::new(MemoryStore::new()));

        deliverer.send_voice(&jid(), &path).await.unwrap();
        assert_eq!(session.voice_notes()[0].seconds, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_retries_three_times_with_fixed_delay() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(&dir, "reply.ogg", 100).await;
        let session = Arc::new(FakeSession {
            failing_uploads: u32::MAX,
            ..Default::default()
        });
        let store = Arc::new(MemoryStore::new());
        let deliverer = OutboundDeliverer::new(session.clone(), store.clone());

        let start = tokio::time::Instant::now();
        let err = deliverer.send_voice(&jid(), &path).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, DeliveryError::Upload { attempts: 3, .. }));
        assert_eq!(session.upload_calls(), 3);
        assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
        assert!(session.sent().is_empty());
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_stops_at_first_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(&dir, "reply.ogg", 100).await;
        let session = Arc::new(FakeSession {
            failing_uploads: 1,
            ..Default::default()
        });
        let deliverer = OutboundDeliverer::new(session.clone(), Arc::new(MemoryStore::new()));

        deliverer.send_voice(&jid(), &path).await.unwrap();
        assert_eq!(session.upload_calls(), 2);
    }

    #[tokio::test]
    async fn retry_policy_from_config() {
        let config = DeliveryConfig {
            upload_attempts: 5,
            upload_retry_delay_ms: 250,
            ..DeliveryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&config), RetryPolicy {
            attempts: 5,
            delay: Duration::from_millis(250),
        });
        assert_eq!(RetryPolicy::from(&DeliveryConfig::default()), RetryPolicy::default());
    }

    #[tokio::test]
    async fn missing_or_empty_audio_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(FakeSession::default());
        let deliverer = OutboundDeliverer::new(session.clone(), Arc::new(MemoryStore::new()));

        let missing = deliverer
            .send_voice(&jid(), &dir.path().join("nope.ogg"))
            .await
            .unwrap_err();
        assert!(matches!(missing, DeliveryError::Read { .. }));

        let empty = audio_file(&dir, "empty.ogg", 0).await;
        let err = deliverer.send_voice(&jid(), &empty).await.unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidInput(_)));
        assert_eq!(session.upload_calls(), 0);
    }

    #[tokio::test]
    async fn text_is_sent_and_persisted() {
        let session = Arc::new(FakeSession::default());
        let store = Arc::new(MemoryStore::new());
        let deliverer = OutboundDeliverer::new(session.clone(), store.clone());

        let sent = deliverer.send_text(&jid(), "Pong! 🏓").await.unwrap();
        assert_eq!(session.texts(), vec!["Pong! 🏓".to_string()]);

        let record = store.get_message(&sent.id).await.unwrap().unwrap();
        assert_eq!(record.content, "Pong! 🏓");
        assert_eq!(record.kind, MessageKind::Text);
        assert_eq!(record.sender, session.own_jid().unwrap());
    }

    #[tokio::test]
    async fn send_failure_is_reported() {
        let session = Arc::new(FakeSession {
            fail_sends: true,
            ..Default::default()
        });
        let deliverer = OutboundDeliverer::new(session, Arc::new(MemoryStore::new()));
        let err = deliverer.send_text(&jid(), "hi").await.unwrap_err();
        assert_eq!(err.kind(), voxrelay_common::ErrorKind::Unavailable);
    }
}
