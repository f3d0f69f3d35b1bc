use voxrelay_common::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent service could not be reached.
    #[error("agent service unavailable: {0}")]
    Unavailable(String),

    #[error("agent request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("agent service returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The turn stream broke or reported an error event.
    #[error("agent stream error: {0}")]
    Stream(String),

    /// The turn finished without an assistant answer.
    #[error("agent produced no response")]
    NoResponse,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AgentError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Timeout => ErrorKind::Timeout,
            Self::Upstream { .. } | Self::Stream(_) => ErrorKind::UpstreamFailure,
            Self::NoResponse => ErrorKind::NoResponse,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Unavailable(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Upstream {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            Self::Stream(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
