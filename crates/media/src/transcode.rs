//! ffmpeg transcoding into the voice-note format (Opus in OGG, mono).

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use {tokio::process::Command, tracing::debug};

use crate::{
    error::{Error, Result},
    tools::find_binary,
};

pub const VOICE_SAMPLE_RATE: u32 = 48_000;
pub const VOICE_CHANNELS: u32 = 1;
pub const VOICE_BITRATE: &str = "64k";

/// Thin wrapper around an `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    /// Locate `ffmpeg` at the configured path or in PATH.
    pub fn discover(config_path: Option<&str>) -> Result<Self> {
        find_binary("ffmpeg", config_path)
            .map(Self::with_binary)
            .ok_or_else(|| Error::unavailable("ffmpeg", "not found in PATH"))
    }

    #[must_use]
    pub fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Transcode `input` into a mono 48 kHz 64 kbps Opus file at `output`.
    ///
    /// Fails if ffmpeg exits non-zero or leaves an empty file.
    pub async fn to_voice_opus(&self, input: &Path, output: &Path) -> Result<()> {
        let sample_rate = VOICE_SAMPLE_RATE.to_string();
        let channels = VOICE_CHANNELS.to_string();
        let result = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c:a", "libopus", "-b:a", VOICE_BITRATE])
            .args(["-ar", &sample_rate, "-ac", &channels])
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::external("failed to run ffmpeg", e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::message(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let size = tokio::fs::metadata(output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if size == 0 {
            return Err(Error::message("ffmpeg produced an empty file"));
        }

        debug!(input = %input.display(), output = %output.display(), size, "transcoded to opus");
        Ok(())
    }
}
