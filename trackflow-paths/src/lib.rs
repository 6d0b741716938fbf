//! XDG Base Directory paths for trackflow.
//!
//! The CLI resolves its config and data locations through XDG paths on every
//! platform, so a `~/.config/trackflow/config.toml` written on Linux behaves
//! the same on macOS.

use std::path::PathBuf;

/// Application directory name under the XDG roots.
const APP_DIR: &str = "trackflow";

/// Get the trackflow config directory.
///
/// Returns `$XDG_CONFIG_HOME/trackflow` if set, otherwise `~/.config/trackflow`.
///
/// # Examples
///
/// ```
/// use trackflow_paths::config_dir;
///
/// let config = config_dir();
/// let file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the trackflow data directory.
///
/// Returns `$XDG_DATA_HOME/trackflow` if set, otherwise `~/.local/share/trackflow`.
/// Touchpoints and credit allocations recorded by the CLI live here.
///
/// # Examples
///
/// ```
/// use trackflow_paths::data_dir;
///
/// let data = data_dir();
/// let store = data.join("store.json");
/// ```
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

fn xdg_dir(env_var: &str, home_relative: &str) -> PathBuf {
    if let Ok(root) = std::env::var(env_var) {
        PathBuf::from(root).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}
