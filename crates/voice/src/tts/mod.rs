//! Text-to-Speech engines producing voice-note ready audio files.

mod piper;

use std::path::{Path, PathBuf};

use {async_trait::async_trait, voxrelay_common::ErrorKind};

pub use piper::PiperTts;

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("speech synthesizer unavailable: {0}")]
    EngineUnavailable(String),

    #[error("speech synthesis failed: {0}")]
    EngineFailure(String),
}

impl TtsError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::EngineUnavailable(_) => ErrorKind::Unavailable,
            Self::EngineFailure(_) => ErrorKind::UpstreamFailure,
        }
    }
}

impl From<voxrelay_media::Error> for TtsError {
    fn from(e: voxrelay_media::Error) -> Self {
        match e.kind() {
            ErrorKind::Unavailable => Self::EngineUnavailable(e.to_string()),
            ErrorKind::InvalidInput => Self::InvalidInput(e.to_string()),
            _ => Self::EngineFailure(e.to_string()),
        }
    }
}

/// Text-to-Speech engine.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Engine identifier (e.g., "piper").
    fn id(&self) -> &'static str;

    /// Check if the engine has everything it needs to run.
    fn is_configured(&self) -> bool;

    /// Synthesize `text` into an Opus/OGG file inside `out_dir` and return
    /// its path. Intermediate files are also kept inside `out_dir`.
    async fn synthesize(&self, text: &str, out_dir: &Path) -> Result<PathBuf, TtsError>;
}
