// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory and config file resolution.

use std::path::PathBuf;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "STRUK_CONFIG";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = dirs_fallback().join("struk");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::debug!(path = %dir.display(), error = %e, "could not create data dir");
    }
    dir
}

/// `$STRUK_CONFIG` if set, otherwise `config.json` in the data dir.
pub fn config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => data_dir().join("config.json"),
    }
}

fn dirs_fallback() -> PathBuf {
    // XDG data dir, then ~/.local/share
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
