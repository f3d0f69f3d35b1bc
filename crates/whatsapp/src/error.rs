use voxrelay_common::ErrorKind;

/// Failure reported by the messaging session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("messaging session is not connected")]
    Disconnected,

    #[error("messaging session timed out")]
    Timeout,

    /// Media download or upload failed.
    #[error("media transfer failed: {0}")]
    Media(String),

    /// The network refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Disconnected => ErrorKind::Unavailable,
            Self::Timeout => ErrorKind::Timeout,
            Self::Media(_) | Self::Rejected(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// Failure to deliver an outbound message.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upload failed after {attempts} attempts: {last}")]
    Upload { attempts: u32, last: SessionError },

    #[error("send failed: {0}")]
    Send(#[source] SessionError),
}

impl DeliveryError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } | Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Upload { .. } => ErrorKind::UpstreamFailure,
            Self::Send(e) => e.kind(),
        }
    }
}

/// Failure to build the event handling stack from configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("message store: {0}")]
    Store(#[from] voxrelay_store::Error),

    #[error("agent client: {0}")]
    Agent(#[from] voxrelay_agents::AgentError),
}

impl SetupError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => e.kind(),
            Self::Agent(e) => e.kind(),
        }
    }
}
