//! whisper-cli (whisper.cpp) STT engine.
//!
//! whisper.cpp is a port of OpenAI's Whisper model to C/C++, offering
//! fast local inference on CPU or GPU. This engine wraps the CLI tool.
//!
//! Installation:
//! - macOS: `brew install whisper-cpp`
//! - From source: https://github.com/ggerganov/whisper.cpp
//!
//! Models can be downloaded from:
//! https://huggingface.co/ggerganov/whisper.cpp

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, warn},
    voxrelay_config::WhisperCliConfig,
    voxrelay_media::tools::{expand_tilde, find_any_binary},
};

use super::{SttError, SttProvider, TRANSCRIBE_TIMEOUT};

/// Binary names tried in order (some installations ship `whisper`).
const BINARY_NAMES: &[&str] = &["whisper-cli", "whisper"];

/// whisper-cli (whisper.cpp) STT engine.
#[derive(Clone, Debug)]
pub struct WhisperCliStt {
    binary_path: Option<String>,
    model_path: Option<String>,
    language: Option<String>,
    output_dir: Option<PathBuf>,
    timeout: Duration,
}

impl WhisperCliStt {
    #[must_use]
    pub fn new(config: &WhisperCliConfig) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
            model_path: config.model_path.clone(),
            language: config.language.clone(),
            output_dir: config.output_dir.clone(),
            timeout: TRANSCRIBE_TIMEOUT,
        }
    }

    /// Override the transcription deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn find_binary(&self) -> Option<PathBuf> {
        find_any_binary(BINARY_NAMES, self.binary_path.as_deref())
    }

    fn model_path(&self) -> Result<PathBuf, SttError> {
        self.model_path
            .as_deref()
            .map(expand_tilde)
            .filter(|p| p.exists())
            .ok_or_else(|| {
                SttError::EngineUnavailable(
                    "whisper-cli model path not configured or file not found".into(),
                )
            })
    }

    /// Directory the transcript is written to: the configured one, or the
    /// directory holding the audio.
    fn output_dir_for(&self, audio: &Path) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            audio
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        })
    }
}

#[async_trait]
impl SttProvider for WhisperCliStt {
    fn id(&self) -> &'static str {
        "whisper-cli"
    }

    fn is_configured(&self) -> bool {
        self.find_binary().is_some() && self.model_path().is_ok()
    }

    async fn transcribe(&self, audio: &Path) -> Result<String, SttError> {
        let binary = self.find_binary().ok_or_else(|| {
            SttError::EngineUnavailable("whisper-cli binary not found in PATH".into())
        })?;
        let model_path = self.model_path()?;

        let output_dir = self.output_dir_for(audio);
        tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
            SttError::EngineFailure(format!(
                "failed to create output dir {}: {e}",
                output_dir.display()
            ))
        })?;
        // One private directory per call: concurrent runs may share both the
        // output dir and the audio file name.
        let scratch = tempfile::Builder::new()
            .prefix("stt-")
            .tempdir_in(&output_dir)
            .map_err(|e| {
                SttError::EngineFailure(format!(
                    "failed to create transcript dir in {}: {e}",
                    output_dir.display()
                ))
            })?;
        let stem = audio
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("transcript");
        let output_base = scratch.path().join(stem);
        let mut transcript_path = output_base.clone().into_os_string();
        transcript_path.push(".txt");
        let transcript_path = PathBuf::from(transcript_path);

        let mut cmd = Command::new(&binary);
        cmd.arg("-m").arg(&model_path);
        cmd.arg("-f").arg(audio);
        cmd.arg("-otxt");
        cmd.arg("-of").arg(&output_base);
        cmd.arg("--no-prints");
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!(binary = %binary.display(), audio = %audio.display(), "running whisper-cli");

        // Dropping the output future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SttError::EngineFailure(format!(
                    "failed to execute whisper-cli: {e}"
                )));
            },
            Err(_) => {
                warn!(timeout = ?self.timeout, audio = %audio.display(), "whisper-cli timed out");
                return Err(SttError::Timeout(self.timeout));
            },
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SttError::EngineFailure(format!(
                "whisper-cli exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = tokio::fs::read_to_string(&transcript_path)
            .await
            .map_err(|e| {
                SttError::EngineFailure(format!(
                    "failed to read transcript {}: {e}",
                    transcript_path.display()
                ))
            })?;
        if let Err(e) = scratch.close() {
            warn!(error = %e, "failed to remove transcript dir");
        }

        Ok(text.trim().to_string())
    }
}
