// ABOUTME: Store configuration loaded from TOML files
// ABOUTME: Covers the tunable parts of connection setup and import behaviour

use crate::error::{Result, StoreError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Compact the freshly imported database before handing it back
    ///
    /// Import always compacts by contract; `false` departs from that and only
    /// exists to skip the rebuild when the file is thrown away immediately.
    pub vacuum_after_import: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            vacuum_after_import: true,
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

pub fn load_config_from_file(path: &Path) -> Result<StoreConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|e| StoreError::io_at("read config file", path, e))?;
    toml::from_str(&raw).map_err(|e| {
        StoreError::Argument(format!(
            "Failed to parse TOML config at {}: {}",
            path.display(),
            e
        ))
    })
}
