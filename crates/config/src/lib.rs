//! Configuration loading, validation, and environment overrides.
//!
//! Config files: `voxrelay.toml`, `voxrelay.yaml`, or `voxrelay.json`
//! Searched in `./` then `~/.config/voxrelay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, apply_env_overrides_with, config_dir, discover_and_load,
        find_or_default_config_path, load_config, save_config,
    },
    schema::{
        AgentConfig, CloudSttConfig, DeliveryConfig, PipelineConfig, PiperTtsConfig,
        StorageConfig, SttConfig, ToolChoice, TtsConfig, VoiceConfig, VoxrelayConfig,
        WhisperCliConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
