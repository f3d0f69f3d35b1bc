//! Configuration validation engine.
//!
//! Validates TOML configuration files against the known schema, detects
//! unknown/misspelled fields, and reports engine setup problems.

use std::{collections::HashMap, path::Path};

use crate::schema::VoxrelayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "engine", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "agent.modle"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar or list of scalars, stop recursion.
    Leaf,
}

/// Build the schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let agent = Struct(HashMap::from([
        ("base_url", Leaf),
        ("model", Leaf),
        ("instructions", Leaf),
        ("toolgroups", Leaf),
        ("tool_choice", Leaf),
        ("temperature", Leaf),
        ("max_tokens", Leaf),
        ("max_infer_iters", Leaf),
        ("request_timeout_secs", Leaf),
        ("mcp_endpoint", Leaf),
        ("toolgroup_id", Leaf),
    ]));

    let stt = Struct(HashMap::from([
        (
            "cloud",
            Struct(HashMap::from([
                ("api_key", Leaf),
                ("base_url", Leaf),
                ("model", Leaf),
                ("language", Leaf),
            ])),
        ),
        (
            "whisper_cli",
            Struct(HashMap::from([
                ("binary_path", Leaf),
                ("model_path", Leaf),
                ("language", Leaf),
                ("output_dir", Leaf),
            ])),
        ),
    ]));

    let tts = Struct(HashMap::from([
        (
            "piper",
            Struct(HashMap::from([
                ("binary_path", Leaf),
                ("model_path", Leaf),
                ("config_path", Leaf),
                ("speaker_id", Leaf),
                ("length_scale", Leaf),
            ])),
        ),
        ("ffmpeg_path", Leaf),
    ]));

    Struct(HashMap::from([
        ("agent", agent),
        ("voice", Struct(HashMap::from([("stt", stt), ("tts", tts)]))),
        (
            "delivery",
            Struct(HashMap::from([
                ("upload_attempts", Leaf),
                ("upload_retry_delay_ms", Leaf),
                ("ffprobe_path", Leaf),
            ])),
        ),
        (
            "pipeline",
            Struct(HashMap::from([
                ("enabled", Leaf),
                ("debug_echo", Leaf),
                ("work_dir", Leaf),
            ])),
        ),
        (
            "storage",
            Struct(HashMap::from([("database_path", Leaf)])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Best match for `needle` among `candidates` within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            check_file_references(&content, &mut result.diagnostics);
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate TOML text without touching the filesystem.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    match toml::from_str::<VoxrelayConfig>(toml_str) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the TOML value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message: msg.trim().to_string(),
        });
    }
}

/// Run semantic checks on a successfully parsed config.
fn check_semantic_warnings(config: &VoxrelayConfig, diagnostics: &mut Vec<Diagnostic>) {
    let stt = &config.voice.stt;
    if stt.cloud.api_key.is_none() && stt.whisper_cli.model_path.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "engine",
            path: "voice.stt".into(),
            message: "no speech-to-text engine configured; set voice.stt.cloud.api_key \
                      or voice.stt.whisper_cli.model_path"
                .into(),
        });
    }

    if config.voice.tts.piper.model_path.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "engine",
            path: "voice.tts.piper.model_path".into(),
            message: "no piper voice model configured; voice replies fall back to text".into(),
        });
    }

    if config.delivery.upload_attempts == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: "delivery.upload_attempts".into(),
            message: "upload_attempts must be at least 1".into(),
        });
    }

    if !(0.0..=2.0).contains(&config.agent.temperature) {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "engine",
            path: "agent.temperature".into(),
            message: format!(
                "temperature {} is outside the usual 0.0..=2.0 range",
                config.agent.temperature
            ),
        });
    }

    if config.pipeline.debug_echo {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "engine",
            path: "pipeline.debug_echo".into(),
            message: "transcripts will be echoed back to senders as text".into(),
        });
    }
}

/// Check that model files referenced by the voice engines exist on disk.
fn check_file_references(toml_str: &str, diagnostics: &mut Vec<Diagnostic>) {
    let Ok(config) = toml::from_str::<VoxrelayConfig>(toml_str) else {
        return;
    };

    let file_refs: &[(&str, &Option<String>)] = &[
        (
            "voice.stt.whisper_cli.model_path",
            &config.voice.stt.whisper_cli.model_path,
        ),
        ("voice.tts.piper.model_path", &config.voice.tts.piper.model_path),
        ("voice.tts.piper.config_path", &config.voice.tts.piper.config_path),
    ];

    for (path_name, value) in file_refs {
        if let Some(file_path) = value
            && !Path::new(file_path).exists()
        {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "file-ref",
                path: (*path_name).into(),
                message: format!("file not found: {file_path}"),
            });
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("model", "model"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("modle", "model"), 2);
        assert_eq!(levenshtein("agnt", "agent"), 1);
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = validate_toml_str("[agnt]\nmodel = \"x\"\n");
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field" && d.path == "agnt")
            .expect("unknown-field diagnostic for 'agnt'");
        assert_eq!(d.severity, Severity::Error);
        assert!(d.message.contains("\"agent\""), "message: {}", d.message);
    }

    #[test]
    fn unknown_nested_key_with_suggestion() {
        let toml = r#"
[delivery]
upload_attempt = 5
"#;
        let result = validate_toml_str(toml);
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.path == "delivery.upload_attempt")
            .expect("unknown-field diagnostic");
        assert!(d.message.contains("upload_attempts"));
    }

    #[test]
    fn type_errors_are_reported() {
        let result = validate_toml_str("[agent]\nmax_tokens = \"lots\"\n");
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }

    #[test]
    fn syntax_error_short_circuits() {
        let result = validate_toml_str("[agent\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn missing_engines_warn() {
        let result = validate_toml_str("");
        assert!(!result.has_errors());
        assert!(result.count(Severity::Warning) >= 2);
        assert!(result.diagnostics.iter().any(|d| d.path == "voice.stt"));
    }

    #[test]
    fn zero_upload_attempts_is_an_error() {
        let result = validate_toml_str("[delivery]\nupload_attempts = 0\n");
        assert!(result.has_errors());
    }

    #[test]
    fn missing_model_file_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxrelay.toml");
        std::fs::write(
            &path,
            "[voice.tts.piper]\nmodel_path = \"/nonexistent/voice.onnx\"\n",
        )
        .unwrap();
        let result = validate(Some(&path));
        assert!(result.diagnostics.iter().any(|d| {
            d.category == "file-ref" && d.path == "voice.tts.piper.model_path"
        }));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }
}
