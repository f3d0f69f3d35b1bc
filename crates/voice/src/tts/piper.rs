//! Piper TTS (local) engine.
//!
//! Piper is a fast, local neural text-to-speech system.
//! Install: pip install piper-tts
//! Or download pre-built binaries from: https://github.com/rhasspy/piper/releases
//!
//! Piper writes WAV; the result is transcoded to Opus with ffmpeg so it can be
//! sent as a voice note.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use {
    async_trait::async_trait,
    tokio::{io::AsyncWriteExt, process::Command},
    tracing::debug,
    voxrelay_config::PiperTtsConfig,
    voxrelay_media::{
        Ffmpeg,
        tools::{expand_tilde, find_binary, model_exists},
    },
};

use super::{TtsError, TtsProvider};

const WAV_NAME: &str = "reply.wav";
const OGG_NAME: &str = "reply.ogg";

/// Piper TTS (local) engine.
#[derive(Debug, Clone)]
pub struct PiperTts {
    binary_path: Option<String>,
    model_path: Option<String>,
    config_path: Option<String>,
    speaker_id: Option<u32>,
    length_scale: f32,
    ffmpeg_path: Option<String>,
}

impl PiperTts {
    #[must_use]
    pub fn new(config: &PiperTtsConfig, ffmpeg_path: Option<String>) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
            model_path: config.model_path.clone(),
            config_path: config.config_path.clone(),
            speaker_id: config.speaker_id,
            length_scale: config.length_scale.unwrap_or(1.0),
            ffmpeg_path,
        }
    }

    fn find_binary(&self) -> Option<PathBuf> {
        find_binary("piper", self.binary_path.as_deref())
    }

    async fn run_piper(&self, binary: &Path, text: &str, wav: &Path) -> Result<(), TtsError> {
        let model_path = self
            .model_path
            .as_deref()
            .map(expand_tilde)
            .ok_or_else(|| TtsError::EngineUnavailable("piper model path not configured".into()))?;

        let mut cmd = Command::new(binary);
        cmd.arg("--model").arg(&model_path);
        if let Some(config_path) = &self.config_path {
            cmd.arg("--config").arg(expand_tilde(config_path));
        }
        if let Some(speaker_id) = self.speaker_id {
            cmd.arg("--speaker").arg(speaker_id.to_string());
        }
        cmd.arg("--length-scale").arg(self.length_scale.to_string());
        cmd.arg("--output_file").arg(wav);

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            TtsError::EngineUnavailable(format!(
                "failed to spawn piper binary '{}': {e}",
                binary.display()
            ))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| TtsError::EngineFailure(format!("failed to write to piper: {e}")))?;
            stdin
                .shutdown()
                .await
                .map_err(|e| TtsError::EngineFailure(format!("failed to close piper stdin: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TtsError::EngineFailure(format!("piper did not finish: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TtsError::EngineFailure(format!(
                "piper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TtsProvider for PiperTts {
    fn id(&self) -> &'static str {
        "piper"
    }

    fn is_configured(&self) -> bool {
        model_exists(self.model_path.as_deref()) && self.find_binary().is_some()
    }

    async fn synthesize(&self, text: &str, out_dir: &Path) -> Result<PathBuf, TtsError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TtsError::InvalidInput("nothing to synthesize".into()));
        }
        let binary = self
            .find_binary()
            .ok_or_else(|| TtsError::EngineUnavailable("piper binary not found in PATH".into()))?;
        let ffmpeg = Ffmpeg::discover(self.ffmpeg_path.as_deref())?;

        let wav = out_dir.join(WAV_NAME);
        let ogg = out_dir.join(OGG_NAME);

        self.run_piper(&binary, text, &wav).await?;

        let wav_size = tokio::fs::metadata(&wav).await.map(|m| m.len()).unwrap_or(0);
        if wav_size == 0 {
            return Err(TtsError::EngineFailure("piper produced an empty file".into()));
        }
        debug!(wav = %wav.display(), size = wav_size, "piper synthesized speech");

        ffmpeg.to_voice_opus(&wav, &ogg).await?;
        Ok(ogg)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn not_configured_without_model() {
        let tts = PiperTts::new(&PiperTtsConfig::default(), None);
        assert_eq!(tts.id(), "piper");
        assert!(!tts.is_configured());
    }

    #[tokio::test]
    async fn empty_text_is_invalid_input() {
        let tts = PiperTts::new(&PiperTtsConfig::default(), None);
        let dir = tempfile::tempdir().unwrap();
        let err = tts.synthesize("   \n", dir.path()).await.unwrap_err();
        assert!(matches!(err, TtsError::InvalidInput(_)));
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Fake piper copying stdin to `--output_file`, and a fake ffmpeg writing
    /// an OGG header to its last argument.
    #[cfg(unix)]
    fn engine(dir: &Path, piper_body: &str) -> PiperTts {
        let piper = script(dir, "piper", piper_body);
        let ffmpeg = script(
            dir,
            "ffmpeg",
            "for last; do :; done\nprintf 'OggS' > \"$last\"",
        );
        PiperTts::new(
            &PiperTtsConfig {
                binary_path: Some(piper),
                model_path: Some("/models/en_US-lessac-medium.onnx".into()),
                ..Default::default()
            },
            Some(ffmpeg),
        )
    }

    #[cfg(unix)]
    const COPY_STDIN: &str = "while [ $# -gt 0 ]; do\n  case \"$1\" in --output_file) out=\"$2\"; shift;; esac\n  shift\ndone\ncat > \"$out\"";

    #[cfg(unix)]
    #[tokio::test]
    async fn synthesizes_and_transcodes() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let tts = engine(bin.path(), COPY_STDIN);

        let ogg = tts
            .synthesize("It is five o'clock.", work.path())
            .await
            .unwrap();
        assert_eq!(ogg, work.path().join("reply.ogg"));
        assert_eq!(std::fs::read(&ogg).unwrap(), b"OggS");
        assert_eq!(
            std::fs::read_to_string(work.path().join("reply.wav")).unwrap(),
            "It is five o'clock."
        );
    }

    #[cfg(unix)]
    #[test]
    fn configured_only_with_existing_model() {
        let bin = tempfile::tempdir().unwrap();
        let tts = engine(bin.path(), COPY_STDIN);
        assert!(!tts.is_configured());

        let model = bin.path().join("voice.onnx");
        std::fs::write(&model, b"onnx").unwrap();
        let tts = PiperTts::new(
            &PiperTtsConfig {
                binary_path: Some(script(bin.path(), "piper", COPY_STDIN)),
                model_path: Some(model.to_string_lossy().into_owned()),
                ..Default::default()
            },
            None,
        );
        assert!(tts.is_configured());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_wav_is_engine_failure() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let tts = engine(bin.path(), "cat > /dev/null");

        let err = tts.synthesize("hello", work.path()).await.unwrap_err();
        assert!(matches!(err, TtsError::EngineFailure(ref m) if m.contains("empty")));
        assert!(!work.path().join("reply.ogg").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn piper_crash_is_engine_failure() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let tts = engine(bin.path(), "cat > /dev/null\necho 'onnx load failed' >&2\nexit 1");

        let err = tts.synthesize("hello", work.path()).await.unwrap_err();
        assert!(matches!(err, TtsError::EngineFailure(ref m) if m.contains("onnx load failed")));
    }
}
