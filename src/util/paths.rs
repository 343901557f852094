//! Path utilities for pagewire configuration

use std::path::PathBuf;

/// Get the pagewire configuration directory (`$XDG_CONFIG_HOME/pagewire`).
///
/// Falls back to `~/.pagewire` on platforms without a config directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("pagewire"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".pagewire")))
        .unwrap_or_else(|| PathBuf::from(".pagewire"))
}

/// Get the default configuration file path (`config.toml` in [`config_dir`]).
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}
