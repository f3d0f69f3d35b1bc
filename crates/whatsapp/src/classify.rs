//! Entry point for inbound message events.

use std::sync::Arc;

use {
    tracing::{debug, info},
    voxrelay_config::VoxrelayConfig,
    voxrelay_store::{MessageRecord, SqliteStore, Store},
};

use crate::{
    error::SetupError, history::record_message, pipeline::VoicePipeline,
    session::MessagingSession, types::InboundEvent,
};

/// Classifies, persists, and routes inbound messages.
///
/// Shared across event callbacks; events are handled independently.
pub struct EventClassifier {
    session: Arc<dyn MessagingSession>,
    store: Arc<dyn Store>,
    pipeline: Option<Arc<VoicePipeline>>,
}

impl EventClassifier {
    #[must_use]
    pub fn new(session: Arc<dyn MessagingSession>, store: Arc<dyn Store>) -> Self {
        Self {
            session,
            store,
            pipeline: None,
        }
    }

    /// Open the `[storage]` database and, when `[pipeline] enabled`, attach
    /// a voice pipeline built from the rest of `config`.
    pub async fn from_config(
        session: Arc<dyn MessagingSession>,
        config: &VoxrelayConfig,
    ) -> Result<Self, SetupError> {
        let store: Arc<dyn Store> =
            Arc::new(SqliteStore::connect(&config.storage.database_url()).await?);
        let classifier = Self::new(Arc::clone(&session), Arc::clone(&store));
        if !config.pipeline.enabled {
            info!("voice pipeline disabled by config");
            return Ok(classifier);
        }
        let pipeline = VoicePipeline::from_config(session, store, config)?;
        Ok(classifier.with_pipeline(Arc::new(pipeline)))
    }

    /// Whether voice notes are answered.
    #[must_use]
    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Route voice notes from other people through `pipeline`.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Arc<VoicePipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Handle one event. Persistence and pipeline failures are logged, never
    /// returned. Returns the stored record.
    pub async fn handle(&self, event: &InboundEvent) -> MessageRecord {
        let payload = event.payload();
        let record = MessageRecord {
            id: event.id.clone(),
            chat: event.chat.clone(),
            sender: event.sender.clone(),
            timestamp: event.timestamp,
            content: payload.content(),
            kind: payload.kind(),
            filename: payload.filename(),
            is_from_me: event.is_from_me,
        };
        info!(
            message_id = %event.id,
            chat = %event.chat,
            sender = %event.sender,
            kind = %record.kind,
            "message received"
        );

        record_message(
            self.store.as_ref(),
            self.session.as_ref(),
            &record,
            event.push_name.as_deref(),
        )
        .await;

        if payload.is_voice_note() && !self.is_from_self(event) {
            match &self.pipeline {
                Some(pipeline) => {
                    pipeline.run(event).await;
                },
                None => debug!(message_id = %event.id, "voice pipeline disabled"),
            }
        }

        record
    }

    fn is_from_self(&self, event: &InboundEvent) -> bool {
        event.is_from_me || self.session.own_jid().is_some_and(|own| own == event.sender)
    }
}
