use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::VoxrelayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "voxrelay.toml",
    "voxrelay.yaml",
    "voxrelay.yml",
    "voxrelay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<VoxrelayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./voxrelay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/voxrelay/voxrelay.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `VoxrelayConfig::default()` if no file is found or it fails
/// to parse.
pub fn discover_and_load() -> VoxrelayConfig {
    let mut config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                VoxrelayConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        VoxrelayConfig::default()
    };
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/voxrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "voxrelay").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxrelay.toml")
}

/// Serialize `config` to TOML and write it to `path`, creating parent
/// directories if needed.
pub fn save_config(config: &VoxrelayConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Apply the deployment environment variables on top of a loaded config.
pub fn apply_env_overrides(config: &mut VoxrelayConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Apply environment overrides using a custom lookup function.
///
/// Empty values are ignored. Numeric values that fail to parse are logged and
/// skipped.
pub fn apply_env_overrides_with(
    config: &mut VoxrelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("LLAMASTACK_BASE_URL") {
        config.agent.base_url = v;
    }
    if let Some(v) = get("LLAMASTACK_MODEL") {
        config.agent.model = v;
    }
    if let Some(v) = get("LLAMASTACK_TEMPERATURE") {
        match v.trim().parse::<f32>() {
            Ok(t) => config.agent.temperature = t,
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid LLAMASTACK_TEMPERATURE"),
        }
    }
    if let Some(v) = get("LLAMASTACK_MAX_TOKENS") {
        match v.trim().parse::<u32>() {
            Ok(n) => config.agent.max_tokens = n,
            Err(e) => warn!(value = %v, error = %e, "ignoring invalid LLAMASTACK_MAX_TOKENS"),
        }
    }
    if let Some(v) = get("WHATSAPP_MCP_SSE_URL") {
        config.agent.mcp_endpoint = Some(v);
    }
    if let Some(v) = get("WHATSAPP_DB_PATH") {
        config.storage.database_path = PathBuf::from(v);
    }
    if let Some(v) = get("WHATSAPP_MEDIA_DIR") {
        config.pipeline.work_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = get("OPENAI_API_KEY") {
        config.voice.stt.cloud.api_key = Some(Secret::new(v));
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<VoxrelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
