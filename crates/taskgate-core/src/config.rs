use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ports::SequentialIdGenerator;
use crate::queue::RateLimiter;

/// How the dispatcher treats a task whose resource is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Pick the earliest task whose resource is free; sleep until a push or
    /// a release when none is.
    #[default]
    SkipBlocked,
    /// Re-queue a blocked head task and retry it after `deferral_delay_ms`.
    /// A blocked head stalls everything behind it.
    RetryHead,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
    /// Pause after a deferral in `retry_head` mode.
    pub deferral_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            deferral_delay_ms: 100,
        }
    }
}

impl DispatchConfig {
    pub fn deferral_delay(&self) -> Duration {
        Duration::from_millis(self.deferral_delay_ms)
    }
}

/// Server configuration.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "listen_addr": "127.0.0.1:2600", "dispatch": { "mode": "retry_head" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Executable run once per connection; exit code 0 admits the client.
    pub validator: PathBuf,
    /// Directory holding the task scripts, named by resource key.
    pub script_dir: PathBuf,
    pub rate_limit_window_ms: u64,
    /// The first task id issued is `id_seed + 1`.
    pub id_seed: u64,
    pub dispatch: DispatchConfig,
    /// `None` = one worker per dispatched task, no cap.
    pub max_concurrent_workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 2500)),
            validator: PathBuf::from("./Network.sh"),
            script_dir: PathBuf::from("."),
            rate_limit_window_ms: RateLimiter::DEFAULT_WINDOW_MS,
            id_seed: SequentialIdGenerator::DEFAULT_SEED,
            dispatch: DispatchConfig::default(),
            max_concurrent_workers: None,
        }
    }
}

impl ServerConfig {
    pub fn from_json_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(path, &raw)
    }

    pub fn rate_limit_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.rate_limit_window_ms).unwrap_or(i64::MAX))
    }

    /// Path of the script for a resource key.
    pub fn script_path(&self, resource: &str) -> PathBuf {
        self.script_dir.join(resource)
    }
}
