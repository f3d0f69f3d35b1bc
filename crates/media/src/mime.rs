//! Extension to media kind / MIME type resolution.

use std::path::Path;

use voxrelay_common::MessageKind;

/// MIME used for voice notes and for audio of unknown type.
pub const VOICE_MIME: &str = "audio/ogg";

/// MIME used for anything that is not recognised media.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Classification of a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaType {
    pub kind: MessageKind,
    pub mime: &'static str,
}

fn normalize(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Resolve a file extension (case-insensitive, leading dot tolerated) into a
/// media kind and MIME type. Unrecognised extensions are documents.
#[must_use]
pub fn resolve_extension(ext: &str) -> MediaType {
    let ext = normalize(ext);
    let (kind, mime) = match ext.as_str() {
        "jpg" | "jpeg" => (MessageKind::Image, "image/jpeg"),
        "png" => (MessageKind::Image, "image/png"),
        "gif" => (MessageKind::Image, "image/gif"),
        "webp" => (MessageKind::Image, "image/webp"),
        "mp4" => (MessageKind::Video, "video/mp4"),
        "avi" => (MessageKind::Video, "video/x-msvideo"),
        "mov" => (MessageKind::Video, "video/quicktime"),
        "mkv" => (MessageKind::Video, "video/x-matroska"),
        "ogg" | "opus" | "mp3" | "wav" | "m4a" | "aac" | "flac" | "wma" | "3gp" | "amr" => {
            (MessageKind::Audio, audio_mime_for_extension(&ext))
        },
        _ => (MessageKind::Document, FALLBACK_MIME),
    };
    MediaType { kind, mime }
}

/// Audio MIME type for a file path, defaulting to `audio/ogg`.
#[must_use]
pub fn audio_mime_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(VOICE_MIME, |ext| audio_mime_for_extension(&normalize(ext)))
}

fn audio_mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "ogg" | "opus" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wma" => "audio/x-ms-wma",
        "3gp" => "audio/3gpp",
        "amr" => "audio/amr",
        _ => VOICE_MIME,
    }
}
