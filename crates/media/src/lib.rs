//! Media helpers: MIME detection, duration probing, Opus transcoding, and
//! per-run scratch directories.

pub mod error;
pub mod mime;
pub mod probe;
pub mod tools;
pub mod transcode;
pub mod workspace;

pub use {
    error::{Error, Result},
    mime::{MediaType, audio_mime_type, resolve_extension},
    probe::{DurationProbe, Ffprobe, estimate_duration_secs, probe_or_estimate},
    transcode::Ffmpeg,
    workspace::{RunWorkspace, file_stem_for},
};
