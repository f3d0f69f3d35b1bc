use std::error::Error as StdError;

use voxrelay_common::{ErrorKind, FromMessage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("{message}")]
    InvalidInput { message: String },
    /// A required external tool (ffmpeg, ffprobe) is missing.
    #[error("{tool} not available: {message}")]
    Unavailable { tool: &'static str, message: String },
    /// A tool ran but exited unsuccessfully or produced nothing.
    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(tool: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            tool,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
            Self::External { .. } | Self::Message { .. } => ErrorKind::UpstreamFailure,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

voxrelay_common::impl_context!();
