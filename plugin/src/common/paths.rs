//! Path Utilities
//!
//! Home-relative path expansion and the well-known token location.

use std::path::PathBuf;

use super::error::PluginError;
use super::result::AppResult;

pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| PluginError::config("Could not determine home directory"))
}

/// Expand a leading `~` to the user's home directory.
///
/// Other users' homes (`~name/...`) cannot be resolved and are rejected.
pub fn expand_tilde(path: &str) -> AppResult<PathBuf> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };
    if rest.is_empty() {
        return home_dir();
    }
    match rest.strip_prefix('/') {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None => Err(PluginError::config(format!(
            "cannot expand user-specific home directory in {}",
            path
        ))),
    }
}

/// Get the previously issued OAuth token (`~/.steampipe/token.json`)
pub fn steampipe_token_path() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".steampipe").join("token.json"))
}
