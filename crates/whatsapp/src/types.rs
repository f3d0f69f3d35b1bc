//! Inbound event model and outbound message types exchanged with the session.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    voxrelay_common::{Jid, MessageKind},
};

/// A message event as delivered by the messaging session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: String,
    pub chat: Jid,
    pub sender: Jid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_from_me: bool,
    #[serde(default)]
    pub push_name: Option<String>,
    pub message: MessageContent,
}

impl InboundEvent {
    #[must_use]
    pub fn payload(&self) -> MessagePayload {
        MessagePayload::from_content(&self.message)
    }
}

/// Raw message body. Several parts may be set at once; [`MessagePayload`]
/// picks one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageContent {
    pub conversation: Option<String>,
    pub extended_text: Option<ExtendedText>,
    pub image: Option<MediaInfo>,
    pub video: Option<MediaInfo>,
    pub audio: Option<AudioInfo>,
    pub document: Option<DocumentInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedText {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    pub caption: String,
    pub mime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioInfo {
    /// Push-to-talk voice note.
    pub ptt: bool,
    pub seconds: u32,
    pub mime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    pub caption: String,
    pub filename: String,
    pub mime: String,
}

/// The one branch an event is handled as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    Text(String),
    ExtendedText(String),
    Image(MediaInfo),
    Video(MediaInfo),
    Audio(AudioInfo),
    Document(DocumentInfo),
    Unknown,
}

impl MessagePayload {
    /// First match wins: text, extended text, image, video, audio, document.
    #[must_use]
    pub fn from_content(content: &MessageContent) -> Self {
        if let Some(text) = content.conversation.as_ref().filter(|t| !t.is_empty()) {
            Self::Text(text.clone())
        } else if let Some(ext) = &content.extended_text {
            Self::ExtendedText(ext.text.clone())
        } else if let Some(image) = &content.image {
            Self::Image(image.clone())
        } else if let Some(video) = &content.video {
            Self::Video(video.clone())
        } else if let Some(audio) = &content.audio {
            Self::Audio(audio.clone())
        } else if let Some(doc) = &content.document {
            Self::Document(doc.clone())
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text(_) | Self::ExtendedText(_) => MessageKind::Text,
            Self::Image(_) => MessageKind::Image,
            Self::Video(_) => MessageKind::Video,
            Self::Audio(a) if a.ptt => MessageKind::Voice,
            Self::Audio(_) => MessageKind::Audio,
            Self::Document(_) => MessageKind::Document,
            Self::Unknown => MessageKind::Unknown,
        }
    }

    /// Text persisted for this payload.
    #[must_use]
    pub fn content(&self) -> String {
        match self {
            Self::Text(text) | Self::ExtendedText(text) => text.clone(),
            Self::Image(m) | Self::Video(m) => m.caption.clone(),
            Self::Document(d) => d.caption.clone(),
            Self::Audio(_) | Self::Unknown => self
                .kind()
                .placeholder()
                .unwrap_or_default()
                .to_string(),
        }
    }

    #[must_use]
    pub fn filename(&self) -> Option<String> {
        match self {
            Self::Document(d) if !d.filename.is_empty() => Some(d.filename.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_voice_note(&self) -> bool {
        matches!(self, Self::Audio(a) if a.ptt)
    }
}

/// Chat presence shown to the other party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
    /// "recording audio…"
    Recording,
    Paused,
}

/// Media class for uploads; selects the encryption context on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Image,
    Video,
    Audio,
    Document,
}

/// Result of a media upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
}

/// Outbound voice note referencing uploaded media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceNote {
    pub media: UploadedMedia,
    pub mime: String,
    pub seconds: u32,
    pub file_length: u64,
    pub ptt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    Text(String),
    Voice(VoiceNote),
}

/// Acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> MediaInfo {
        MediaInfo {
            caption: "sunset".into(),
            mime: "image/jpeg".into(),
        }
    }

    #[test]
    fn text_takes_precedence_over_media() {
        let content = MessageContent {
            conversation: Some("hello".into()),
            image: Some(image()),
            ..Default::default()
        };
        assert_eq!(
            MessagePayload::from_content(&content),
            MessagePayload::Text("hello".into())
        );
    }

    #[test]
    fn empty_conversation_falls_through() {
        let content = MessageContent {
            conversation: Some(String::new()),
            extended_text: Some(ExtendedText {
                text: "with link https://example.com".into(),
            }),
            ..Default::default()
        };
        let payload = MessagePayload::from_content(&content);
        assert_eq!(payload.kind(), MessageKind::Text);
        assert_eq!(payload.content(), "with link https://example.com");
    }

    #[test]
    fn image_before_video_before_audio() {
        let content = MessageContent {
            video: Some(MediaInfo::default()),
            audio: Some(AudioInfo::default()),
            image: Some(image()),
            ..Default::default()
        };
        assert_eq!(MessagePayload::from_content(&content).kind(), MessageKind::Image);

        let content = MessageContent {
            video: Some(MediaInfo::default()),
            audio: Some(AudioInfo::default()),
            ..Default::default()
        };
        assert_eq!(MessagePayload::from_content(&content).kind(), MessageKind::Video);
    }

    #[test]
    fn audio_labels_depend_on_ptt() {
        let voice = MessagePayload::Audio(AudioInfo {
            ptt: true,
            seconds: 4,
            mime: "audio/ogg; codecs=opus".into(),
        });
        assert_eq!(voice.kind(), MessageKind::Voice);
        assert_eq!(voice.content(), "[Voice Message]");
        assert!(voice.is_voice_note());

        let audio = MessagePayload::Audio(AudioInfo::default());
        assert_eq!(audio.kind(), MessageKind::Audio);
        assert_eq!(audio.content(), "[Audio Message]");
        assert!(!audio.is_voice_note());
    }

    #[test]
    fn document_records_filename_and_caption() {
        let doc = MessagePayload::Document(DocumentInfo {
            caption: "Q3 numbers".into(),
            filename: "report.pdf".into(),
            mime: "application/pdf".into(),
        });
        assert_eq!(doc.content(), "Q3 numbers");
        assert_eq!(doc.filename().as_deref(), Some("report.pdf"));
    }

    #[test]
    fn nothing_set_is_unknown() {
        let payload = MessagePayload::from_content(&MessageContent::default());
        assert_eq!(payload, MessagePayload::Unknown);
        assert_eq!(payload.content(), "[Unknown Message Type]");
    }

    #[test]
    fn event_deserializes_from_json() {
        let event: InboundEvent = serde_json::from_value(serde_json::json!({
            "id": "3EB0",
            "chat": "15550001111@s.whatsapp.net",
            "sender": "15550001111@s.whatsapp.net",
            "timestamp": "2024-05-17T12:00:00Z",
            "message": {"audio": {"ptt": true, "seconds": 3, "mime": "audio/ogg"}}
        }))
        .unwrap();
        assert!(!event.is_from_me);
        assert!(event.payload().is_voice_note());
    }
}
