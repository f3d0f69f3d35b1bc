//! Audio duration measurement with a size-based fallback.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use {
    async_trait::async_trait,
    serde::Deserialize,
    tokio::process::Command,
    tracing::{debug, warn},
};

use crate::{
    error::{Context, Error, Result},
    tools::find_binary,
};

/// Bytes per second assumed by [`estimate_duration_secs`].
pub const ESTIMATE_BYTES_PER_SEC: u64 = 16_000;

/// Measures the playback length of an audio file.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds.
    async fn duration_secs(&self, path: &Path) -> Result<f64>;
}

/// Heuristic duration for when no probe is available or it fails.
///
/// Assumes roughly 16 kB per second of encoded audio, which is close for
/// 64 kbps Opus plus container overhead but can be far off for other codecs.
/// Never returns less than one second.
#[must_use]
pub fn estimate_duration_secs(size_bytes: u64) -> u32 {
    let secs = (size_bytes / ESTIMATE_BYTES_PER_SEC).max(1);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// Probe the file, falling back to the size estimate on any failure.
pub async fn probe_or_estimate(probe: Option<&dyn DurationProbe>, path: &Path) -> u32 {
    if let Some(probe) = probe {
        match probe.duration_secs(path).await {
            Ok(secs) if secs.is_finite() && secs > 0.0 => {
                debug!(path = %path.display(), secs, "probed audio duration");
                return whole_seconds(secs);
            },
            Ok(secs) => warn!(path = %path.display(), secs, "probe returned unusable duration"),
            Err(e) => warn!(path = %path.display(), error = %e, "duration probe failed"),
        }
    }
    let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
    let estimate = estimate_duration_secs(size);
    debug!(path = %path.display(), size, estimate, "estimated audio duration");
    estimate
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(secs: f64) -> u32 {
    secs.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

// ── ffprobe ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// [`DurationProbe`] backed by `ffprobe`.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    binary: PathBuf,
}

impl Ffprobe {
    /// Locate `ffprobe` at the configured path or in PATH.
    pub fn discover(config_path: Option<&str>) -> Result<Self> {
        find_binary("ffprobe", config_path)
            .map(Self::with_binary)
            .ok_or_else(|| Error::unavailable("ffprobe", "not found in PATH"))
    }

    #[must_use]
    pub fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }
}

#[async_trait]
impl DurationProbe for Ffprobe {
    async fn duration_secs(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.binary)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::external("failed to run ffprobe", e))?;

        if !output.status.success() {
            return Err(Error::message(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }

        parse_probe_output(&output.stdout)
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<f64> {
    let parsed: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| Error::external("invalid ffprobe output", e))?;
    let raw = parsed
        .format
        .duration
        .context("ffprobe output has no duration")?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("failed to parse duration {raw:?}"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(Result<f64>);

    #[async_trait]
    impl DurationProbe for FixedProbe {
        async fn duration_secs(&self, _path: &Path) -> Result<f64> {
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(e) => Err(Error::message(e.to_string())),
            }
        }
    }

    #[test]
    fn estimate_is_at_least_one_second() {
        assert_eq!(estimate_duration_secs(0), 1);
        assert_eq!(estimate_duration_secs(15_999), 1);
        assert_eq!(estimate_duration_secs(16_000), 1);
        assert_eq!(estimate_duration_secs(160_000), 10);
        assert_eq!(estimate_duration_secs(175_999), 10);
    }

    #[test]
    fn parses_ffprobe_json() {
        let out = br#"{"format":{"filename":"x.ogg","duration":"12.480000"}}"#;
        assert!((parse_probe_output(out).unwrap() - 12.48).abs() < 1e-9);
    }

    #[test]
    fn rejects_ffprobe_json_without_duration() {
        assert!(parse_probe_output(br#"{"format":{}}"#).is_err());
        assert!(parse_probe_output(b"not json").is_err());
        assert!(parse_probe_output(br#"{"format":{"duration":"N/A"}}"#).is_err());
    }

    #[tokio::test]
    async fn uses_probe_when_it_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reply.ogg");
        std::fs::write(&path, vec![0u8; 320_000]).unwrap();

        let probe = FixedProbe(Ok(3.6));
        assert_eq!(probe_or_estimate(Some(&probe), &path).await, 4);
    }

    #[tokio::test]
    async fn falls_back_to_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reply.ogg");
        std::fs::write(&path, vec![0u8; 320_000]).unwrap();

        let failing = FixedProbe(Err(Error::message("boom")));
        assert_eq!(probe_or_estimate(Some(&failing), &path).await, 20);

        let zero = FixedProbe(Ok(0.0));
        assert_eq!(probe_or_estimate(Some(&zero), &path).await, 20);

        assert_eq!(probe_or_estimate(None, &path).await, 20);
    }

    #[tokio::test]
    async fn missing_file_estimates_one_second() {
        let path = Path::new("/definitely/not/here.ogg");
        assert_eq!(probe_or_estimate(None, path).await, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_ffprobe_binary() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffprobe");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"format\":{\"duration\":\"7.4\"}}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = Ffprobe::with_binary(script);
        let secs = probe
            .duration_secs(&dir.path().join("any.ogg"))
            .await
            .unwrap();
        assert!((secs - 7.4).abs() < 1e-9);
    }
}
