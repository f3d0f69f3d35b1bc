//! Per-run scratch directories, removed when dropped.

use std::path::{Path, PathBuf};

use {tempfile::TempDir, tracing::debug};

use crate::error::{Error, Result};

/// A private working directory for one pipeline run.
///
/// The directory and everything in it is deleted when the value is dropped,
/// including during unwinding.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create a fresh directory under `root`, named after the message id and
    /// the current time plus a random suffix.
    pub fn create(root: &Path, message_id: &str) -> Result<Self> {
        std::fs::create_dir_all(root)
            .map_err(|e| Error::external(format!("create {}", root.display()), e))?;
        let prefix = format!(
            "voice-{}-{}-",
            file_stem_for(message_id),
            chrono::Utc::now().timestamp_millis()
        );
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(root)
            .map_err(|e| Error::external("create run workspace", e))?;
        debug!(path = %dir.path().display(), "created run workspace");
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the workspace.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `bytes` to `name` inside the workspace and return its path.
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.file(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::external(format!("write {}", path.display()), e))?;
        Ok(path)
    }
}

/// File-name-safe form of a message id.
#[must_use]
pub fn file_stem_for(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "msg".to_string()
    } else {
        cleaned
    }
}
