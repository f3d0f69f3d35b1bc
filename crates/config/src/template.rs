//! Default configuration template with all options documented.
//!
//! Written by `voxrelay config init`. Every option is listed with its default
//! so users can see what can be configured without reading the source.

/// Generate the default config template.
#[must_use]
pub fn default_config_template() -> String {
    r##"# voxrelay configuration
# ======================
# Uncomment and modify settings as needed.
#
# Environment variable substitution is supported: ${ENV_VAR}
# Example: api_key = "${OPENAI_API_KEY}"
#
# The deployment variables LLAMASTACK_BASE_URL, LLAMASTACK_MODEL,
# LLAMASTACK_TEMPERATURE, LLAMASTACK_MAX_TOKENS, WHATSAPP_MCP_SSE_URL,
# WHATSAPP_DB_PATH, WHATSAPP_MEDIA_DIR and OPENAI_API_KEY override this file.

# ══════════════════════════════════════════════════════════════════════════════
# AGENT
# ══════════════════════════════════════════════════════════════════════════════
# Llama Stack agents API used to answer transcribed voice notes.

[agent]
base_url = "http://localhost:8321"           # Service root, without /v1
model = "vllm-inference/llama-3-2-3b-instruct"
# instructions = "You are a helpful WhatsApp assistant..."
toolgroups = []                              # e.g. ["builtin::websearch"]
tool_choice = "auto"                         # "auto" or "required"
temperature = 0.7
max_tokens = 200
max_infer_iters = 10
request_timeout_secs = 120
# mcp_endpoint = "http://localhost:8080/sse" # Register an MCP server as a toolgroup
toolgroup_id = "mcp::whatsapp"

# ══════════════════════════════════════════════════════════════════════════════
# VOICE
# ══════════════════════════════════════════════════════════════════════════════

[voice.stt.cloud]
# api_key = "${OPENAI_API_KEY}"              # When set, the cloud engine is used
base_url = "https://api.openai.com/v1"
model = "whisper-1"
# language = "en"

[voice.stt.whisper_cli]
# binary_path = "/usr/local/bin/whisper-cli" # Defaults to whisper-cli on PATH
# model_path = "~/.voxrelay/models/ggml-base.bin"
# language = "en"
# output_dir = "/tmp/voxrelay-stt"           # Defaults to the audio file's directory

[voice.tts]
# ffmpeg_path = "/usr/bin/ffmpeg"            # Defaults to ffmpeg on PATH

[voice.tts.piper]
# binary_path = "/usr/local/bin/piper"       # Defaults to piper on PATH
# model_path = "~/.voxrelay/voices/en_US-lessac-medium.onnx"
# config_path = "~/.voxrelay/voices/en_US-lessac-medium.onnx.json"
# speaker_id = 0
# length_scale = 1.0                         # Speaking rate (1.0 = normal)

# ══════════════════════════════════════════════════════════════════════════════
# DELIVERY
# ══════════════════════════════════════════════════════════════════════════════

[delivery]
upload_attempts = 3
upload_retry_delay_ms = 2000
# ffprobe_path = "/usr/bin/ffprobe"          # Defaults to ffprobe on PATH

# ══════════════════════════════════════════════════════════════════════════════
# PIPELINE
# ══════════════════════════════════════════════════════════════════════════════

[pipeline]
enabled = true
debug_echo = false                           # Also send transcript and reply as text
# work_dir = "/var/tmp/voxrelay"             # Defaults to <tmp>/voxrelay

# ══════════════════════════════════════════════════════════════════════════════
# STORAGE
# ══════════════════════════════════════════════════════════════════════════════

[storage]
database_path = "voxrelay.db"
"##
    .to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config: crate::VoxrelayConfig = toml::from_str(&default_config_template()).unwrap();
        let defaults = crate::VoxrelayConfig::default();
        assert_eq!(config.agent.model, defaults.agent.model);
        assert_eq!(config.agent.toolgroup_id, defaults.agent.toolgroup_id);
        assert_eq!(
            config.delivery.upload_attempts,
            defaults.delivery.upload_attempts
        );
        assert_eq!(config.storage.database_path, defaults.storage.database_path);
    }

    #[test]
    fn template_has_no_unknown_fields() {
        let result = crate::validate::validate_toml_str(&default_config_template());
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }
}
