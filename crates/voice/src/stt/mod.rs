//! Speech-to-Text engines and the policy that picks one.

mod whisper;
mod whisper_cli;

use std::{path::Path, sync::Arc, time::Duration};

use {
    async_trait::async_trait, tracing::info, voxrelay_common::ErrorKind,
    voxrelay_config::SttConfig,
};

pub use {whisper::WhisperStt, whisper_cli::WhisperCliStt};

/// Deadline applied to a single transcription.
pub const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    /// Binary, model, or credentials missing, or the service unreachable.
    #[error("speech engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("transcription timed out after {0:?}")]
    Timeout(Duration),

    /// The engine ran but failed or produced unusable output.
    #[error("speech engine failed: {0}")]
    EngineFailure(String),
}

impl SttError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineUnavailable(_) => ErrorKind::Unavailable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::EngineFailure(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// Speech-to-Text engine.
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Engine identifier (e.g., "whisper-cli").
    fn id(&self) -> &'static str;

    /// Check if the engine has everything it needs to run.
    fn is_configured(&self) -> bool;

    /// Transcribe the audio file at `audio`, returning the trimmed text.
    ///
    /// An empty string is a valid result; callers decide what silence means.
    async fn transcribe(&self, audio: &Path) -> Result<String, SttError>;
}

/// Pick the engine for `config`: the cloud API when a key is configured,
/// otherwise the local whisper.cpp CLI.
#[must_use]
pub fn select_provider(config: &SttConfig) -> Arc<dyn SttProvider> {
    if config.cloud.api_key.is_some() {
        info!(model = %config.cloud.model, "using cloud speech-to-text");
        Arc::new(WhisperStt::new(&config.cloud))
    } else {
        info!("using local whisper-cli speech-to-text");
        Arc::new(WhisperCliStt::new(&config.whisper_cli))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    #[test]
    fn cloud_key_selects_cloud_engine() {
        let mut config = SttConfig::default();
        assert_eq!(select_provider(&config).id(), "whisper-cli");

        config.cloud.api_key = Some(Secret::new("sk-test".into()));
        assert_eq!(select_provider(&config).id(), "whisper");
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            SttError::EngineUnavailable("no model".into()).kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(
            SttError::Timeout(TRANSCRIBE_TIMEOUT).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            SttError::EngineFailure("exit 1".into()).kind(),
            ErrorKind::UpstreamFailure
        );
    }
}
