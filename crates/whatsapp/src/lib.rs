//! WhatsApp-side core of voxrelay.
//!
//! The protocol session is consumed through [`MessagingSession`]. Inbound
//! events go through [`EventClassifier`]; voice notes from other people run
//! through [`VoicePipeline`] and are answered with a synthesized voice note.

pub mod classify;
pub mod deliver;
pub mod error;
mod history;
pub mod pipeline;
pub mod session;
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_support;

pub use {
    classify::EventClassifier,
    deliver::{OutboundDeliverer, RetryPolicy},
    error::{DeliveryError, SessionError, SetupError},
    pipeline::{RunReport, Stage, VoicePipeline},
    session::MessagingSession,
    types::{
        AudioInfo, DocumentInfo, ExtendedText, InboundEvent, MediaInfo, MessageContent,
        MessagePayload, OutgoingMessage, PresenceState, SentMessage, UploadKind, UploadedMedia,
        VoiceNote,
    },
};
