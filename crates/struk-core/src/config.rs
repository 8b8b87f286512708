// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Serial Port Profile service class identifier.
pub const SERIAL_PORT_PROFILE_UUID: &str = "00001101-0000-1000-8000-00805F9B34FB";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Business name used when a request carries none.
    pub default_business_name: String,
    /// Service identifier used for the primary session negotiation.
    pub service_uuid: String,
    /// Channel tried when service negotiation fails and the adapter supports it.
    pub fallback_channel: u8,
    /// Upper bound on transmission attempts per job.
    pub max_attempts: u32,
    /// Hardware settle times around each attempt.
    pub pacing: PacingConfig,
    /// Printers reachable through RFCOMM device files.
    pub devices: Vec<DeviceBinding>,
    /// Host platform API level, used to pick authorization scopes.
    pub platform_api_level: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_business_name: crate::types::DEFAULT_BUSINESS_NAME.to_owned(),
            service_uuid: SERIAL_PORT_PROFILE_UUID.to_owned(),
            fallback_channel: 1,
            max_attempts: 2,
            pacing: PacingConfig::default(),
            devices: Vec::new(),
            platform_api_level: None,
        }
    }
}

impl AppConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Read a JSON config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            Self::default()
        })
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Empirically tuned pauses around a transmission attempt, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// After cancelling discovery, before connecting.
    pub settle_ms: u64,
    /// After write + flush, before the write counts as delivered.
    pub drain_ms: u64,
    /// After closing the session, before the next attempt may open one.
    pub cooldown_ms: u64,
    /// Between a failed attempt and the next one.
    pub backoff_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 120,
            drain_ms: 150,
            cooldown_ms: 80,
            backoff_ms: 200,
        }
    }
}

impl PacingConfig {
    /// All pauses zero. Used by tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            drain_ms: 0,
            cooldown_ms: 0,
            backoff_ms: 0,
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Maps a printer address to the character device the OS bound it to
/// (e.g. `rfcomm bind 0 AA:BB:...` creates `/dev/rfcomm0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBinding {
    pub name: String,
    pub address: String,
    pub path: std::path::PathBuf,
}
