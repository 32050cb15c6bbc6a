// src/infra/paths.rs — Config and scratch locations
//
// All paths respect the CHATGATE_HOME environment variable for isolation.
// When unset, config lives under ~/.chatgate/ and scratch audio goes to the
// platform cache directory.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the CHATGATE_HOME override, if set.
fn chatgate_home() -> Option<PathBuf> {
    std::env::var_os("CHATGATE_HOME").map(PathBuf::from)
}

/// Configuration directory: $CHATGATE_HOME/ or ~/.chatgate/
pub fn config_dir() -> PathBuf {
    if let Some(home) = chatgate_home() {
        return home;
    }
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(".chatgate"),
        None => PathBuf::from(".chatgate"),
    }
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Scratch directory for downloaded and converted voice recordings.
pub fn voice_dir() -> PathBuf {
    if let Some(home) = chatgate_home() {
        return home.join("voices");
    }
    match ProjectDirs::from("", "", "chatgate") {
        Some(dirs) => dirs.cache_dir().join("voices"),
        None => std::env::temp_dir().join("chatgate").join("voices"),
    }
}
