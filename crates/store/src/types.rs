use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    voxrelay_common::{Jid, MessageKind},
};

/// A persisted message, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Network message id; unique across the store.
    pub id: String,
    pub chat: Jid,
    pub sender: Jid,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub kind: MessageKind,
    pub filename: Option<String>,
    pub is_from_me: bool,
}

/// Last-message view of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub jid: Jid,
    pub name: String,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub is_group: bool,
}

impl ChatSummary {
    /// Summary for `jid` ending with `record`. Falls back to the JID as the
    /// display name.
    #[must_use]
    pub fn for_message(jid: &Jid, name: Option<String>, record: &MessageRecord) -> Self {
        Self {
            jid: jid.clone(),
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| jid.to_string()),
            last_message: record.content.clone(),
            last_message_time: record.timestamp,
            is_group: jid.is_group(),
        }
    }
}
