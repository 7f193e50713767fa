//! Runtime configuration
//!
//! Loaded from JSON. Every field is optional in the file; missing fields take
//! their defaults.

use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use services_global_manager::GlobalManagerConfig;
use services_local_manager::{LocalManagerConfig, DEFAULT_MAILBOX_SIZE};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name this process registers under
    pub process_name: String,
    /// Capacity of every mailbox
    pub mailbox_size: usize,
    /// Lifetime of a pending cross-process connection
    pub network_connect_timeout_ms: u64,
    /// Lifetime of a pending same-process connection; `None` never expires
    pub local_connect_timeout_ms: Option<u64>,
    /// Period of the connect-timeout sweep
    pub sweep_period_ms: u64,
    /// Bound on waits for queued commands to execute
    pub blocking_call_timeout_ms: u64,
    /// `tracing` filter directive, e.g. `info` or `services_global_manager=debug`
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            process_name: "LCM".to_string(),
            mailbox_size: DEFAULT_MAILBOX_SIZE,
            network_connect_timeout_ms: 5000,
            local_connect_timeout_ms: None,
            sweep_period_ms: 100,
            blocking_call_timeout_ms: 1000,
            log_filter: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(text: &str) -> Result<Self, RuntimeError> {
        let config: RuntimeConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let text = fs::read_to_string(path).map_err(|source| RuntimeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), RuntimeError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| RuntimeError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.process_name.is_empty() {
            return Err(RuntimeError::InvalidConfig(
                "process_name must not be empty".to_string(),
            ));
        }
        if self.mailbox_size == 0 {
            return Err(RuntimeError::InvalidConfig(
                "mailbox_size must be at least 1".to_string(),
            ));
        }
        if self.sweep_period_ms == 0 {
            return Err(RuntimeError::InvalidConfig(
                "sweep_period_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn global_manager_config(&self) -> GlobalManagerConfig {
        GlobalManagerConfig {
            network_connect_timeout: Duration::from_millis(self.network_connect_timeout_ms),
            local_connect_timeout: self.local_connect_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn local_manager_config(&self) -> LocalManagerConfig {
        LocalManagerConfig {
            mailbox_size: self.mailbox_size,
        }
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_millis(self.sweep_period_ms)
    }

    pub fn blocking_call_timeout(&self) -> Duration {
        Duration::from_millis(self.blocking_call_timeout_ms)
    }
}
