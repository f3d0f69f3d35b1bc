//! Discovery of the command-line tools the relay shells out to.

use std::path::PathBuf;

/// Find a binary at an explicit path or in PATH.
///
/// If `config_path` is Some, it's checked first. If None or not found,
/// searches the system PATH.
pub fn find_binary(name: &str, config_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path_str) = config_path {
        let path = expand_tilde(path_str);
        if path.is_file() {
            return Some(path);
        }
    }

    which::which(name).ok()
}

/// First of `names` that resolves, honouring an explicit path.
pub fn find_any_binary(names: &[&str], config_path: Option<&str>) -> Option<PathBuf> {
    names
        .iter()
        .find_map(|name| find_binary(name, config_path))
}

/// Expand `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

/// Check if a model file or directory exists.
pub fn model_exists(path_str: Option<&str>) -> bool {
    path_str.map(expand_tilde).is_some_and(|p| p.exists())
}
