//! Identity and message-kind types shared by the store and the channel.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Server part of a group chat JID.
pub const GROUP_SERVER: &str = "g.us";

/// A messaging identity of the form `user@server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid {
    user: String,
    server: String,
}

impl Jid {
    /// Parse a JID, rejecting empty input and missing user/server parts.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::invalid_input("JID cannot be empty"));
        }
        let Some((user, server)) = raw.split_once('@') else {
            return Err(Error::invalid_input(format!(
                "JID must be in the form user@server: {raw}"
            )));
        };
        if user.is_empty() || server.is_empty() || server.contains('@') {
            return Err(Error::invalid_input(format!("malformed JID: {raw}")));
        }
        Ok(Self {
            user: user.to_string(),
            server: server.to_string(),
        })
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.server)
    }
}

impl FromStr for Jid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Jid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}

/// Media kind recorded on a persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    /// Push-to-talk voice note.
    Voice,
    Document,
    Unknown,
}

impl MessageKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Document => "document",
            Self::Unknown => "unknown",
        }
    }

    /// Synthetic content stored for kinds that carry no text of their own.
    #[must_use]
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Audio => Some("[Audio Message]"),
            Self::Voice => Some("[Voice Message]"),
            Self::Unknown => Some("[Unknown Message Type]"),
            Self::Text | Self::Image | Self::Video | Self::Document => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "voice" => Ok(Self::Voice),
            "document" => Ok(Self::Document),
            "unknown" => Ok(Self::Unknown),
            other => Err(Error::invalid_input(format!("unknown message kind: {other}"))),
        }
    }
}
