//! Config schema types (agent, voice engines, delivery, pipeline, storage).

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxrelayConfig {
    pub agent: AgentConfig,
    pub voice: VoiceConfig,
    pub delivery: DeliveryConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

// ── Agent ───────────────────────────────────────────────────────────────────

/// Tool selection policy sent with the agent configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
    Required,
}

impl ToolChoice {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Required => "required",
        }
    }
}

/// Conversational agent service (Llama Stack agents API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of the agent service, without the `/v1` suffix.
    pub base_url: String,

    /// Model identifier registered with the service.
    pub model: String,

    /// System instructions attached to every agent.
    pub instructions: String,

    /// Toolgroups enabled on the agent (e.g. "builtin::websearch").
    pub toolgroups: Vec<String>,

    pub tool_choice: ToolChoice,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Upper bound on inference/tool iterations within one turn.
    pub max_infer_iters: u32,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// MCP SSE endpoint to register as a toolgroup before creating the agent.
    pub mcp_endpoint: Option<String>,

    /// Identifier used for the MCP toolgroup registration.
    pub toolgroup_id: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8321".into(),
            model: "vllm-inference/llama-3-2-3b-instruct".into(),
            instructions: DEFAULT_INSTRUCTIONS.into(),
            toolgroups: Vec::new(),
            tool_choice: ToolChoice::Auto,
            temperature: 0.7,
            max_tokens: 200,
            max_infer_iters: 10,
            request_timeout_secs: 120,
            mcp_endpoint: None,
            toolgroup_id: "mcp::whatsapp".into(),
        }
    }
}

const DEFAULT_INSTRUCTIONS: &str = "You are a helpful WhatsApp assistant answering voice notes. \
Keep your answers short, friendly and easy to listen to: no markdown, no lists, no emoji.";

// ── Voice ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub stt: SttConfig,
    pub tts: TtsConfig,
}

/// Speech-to-Text configuration. The cloud engine wins when it has a key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub cloud: CloudSttConfig,
    pub whisper_cli: WhisperCliConfig,
}

/// OpenAI-compatible transcription API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSttConfig {
    /// API key (from OPENAI_API_KEY env or config).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret",
        deserialize_with = "deserialize_option_secret"
    )]
    pub api_key: Option<Secret<String>>,

    pub base_url: String,

    /// Model to use (whisper-1).
    pub model: String,

    /// Language hint (ISO 639-1 code).
    pub language: Option<String>,
}

impl Default for CloudSttConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            model: "whisper-1".into(),
            language: None,
        }
    }
}

/// whisper-cli (whisper.cpp) configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperCliConfig {
    /// Path to whisper-cli binary. If not set, looks in PATH.
    pub binary_path: Option<String>,

    /// Path to the GGML model file (e.g., "~/.voxrelay/models/ggml-base.bin").
    pub model_path: Option<String>,

    /// Language hint (ISO 639-1 code).
    pub language: Option<String>,

    /// Directory the engine writes its `.txt` transcripts into.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub piper: PiperTtsConfig,

    /// ffmpeg binary used to transcode to Opus. Defaults to `ffmpeg` on PATH.
    pub ffmpeg_path: Option<String>,
}

/// Piper (local) TTS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PiperTtsConfig {
    /// Path to piper binary. If not set, looks in PATH.
    pub binary_path: Option<String>,

    /// Path to the ONNX voice model.
    pub model_path: Option<String>,

    /// Path to the model config JSON (defaults to `<model>.json`).
    pub config_path: Option<String>,

    /// Speaker ID for multi-speaker models.
    pub speaker_id: Option<u32>,

    /// Speaking rate (1.0 = normal).
    pub length_scale: Option<f32>,
}

// ── Delivery / pipeline / storage ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Upload attempts before a voice delivery is abandoned.
    pub upload_attempts: u32,

    /// Fixed delay between upload attempts, in milliseconds.
    pub upload_retry_delay_ms: u64,

    /// ffprobe binary used to measure audio duration.
    pub ffprobe_path: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            upload_attempts: 3,
            upload_retry_delay_ms: 2000,
            ffprobe_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Answer inbound voice notes at all.
    pub enabled: bool,

    /// Also send the transcript and reply as plain text after a voice reply.
    pub debug_echo: bool,

    /// Root directory for per-run working files. Defaults to the system temp dir.
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug_echo: false,
            work_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Resolved working root (`<tmp>/voxrelay` unless configured).
    #[must_use]
    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("voxrelay"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding messages and chat summaries.
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("voxrelay.db"),
        }
    }
}

impl StorageConfig {
    /// sqlx connection URL for the configured database.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.database_path.display())
    }
}

// ── Secret helpers ──────────────────────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_option_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.is_empty()).map(Secret::new))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_deployment() {
        let config = VoxrelayConfig::default();
        assert_eq!(config.agent.tool_choice, ToolChoice::Auto);
        assert_eq!(config.agent.max_tokens, 200);
        assert_eq!(config.delivery.upload_attempts, 3);
        assert_eq!(config.delivery.upload_retry_delay_ms, 2000);
        assert!(config.pipeline.enabled);
        assert!(!config.pipeline.debug_echo);
        assert!(config.voice.stt.cloud.api_key.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: VoxrelayConfig = toml::from_str(
            r#"
            [agent]
            model = "meta-llama/Llama-3.1-8B-Instruct"
            tool_choice = "required"

            [pipeline]
            debug_echo = true
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.model, "meta-llama/Llama-3.1-8B-Instruct");
        assert_eq!(config.agent.tool_choice, ToolChoice::Required);
        assert_eq!(config.agent.base_url, "http://localhost:8321");
        assert!(config.pipeline.debug_echo);
        assert_eq!(config.delivery.upload_attempts, 3);
    }

    #[test]
    fn empty_api_key_is_treated_as_unset() {
        let config: VoxrelayConfig = toml::from_str(
            r#"
            [voice.stt.cloud]
            api_key = ""
            "#,
        )
        .unwrap();
        assert!(config.voice.stt.cloud.api_key.is_none());
    }

    #[test]
    fn api_key_survives_serialization() {
        let mut config = VoxrelayConfig::default();
        config.voice.stt.cloud.api_key = Some(Secret::new("sk-test".into()));
        let raw = toml::to_string(&config).unwrap();
        let parsed: VoxrelayConfig = toml::from_str(&raw).unwrap();
        assert_eq!(
            parsed
                .voice
                .stt
                .cloud
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().clone()),
            Some("sk-test".to_string())
        );
    }

    #[test]
    fn database_url_uses_rwc_mode() {
        let storage = StorageConfig {
            database_path: PathBuf::from("/var/lib/voxrelay/messages.db"),
        };
        assert_eq!(
            storage.database_url(),
            "sqlite:///var/lib/voxrelay/messages.db?mode=rwc"
        );
    }
}
