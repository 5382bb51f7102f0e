//! Server configuration, loaded from YAML and overridden from the command line.

use serde::Deserialize;
use std::{fs, path::Path, time::Duration};
use thiserror::Error;
use tripledice_execution::{RetryPolicy, Timing};
use tripledice_types::game::{RESOLVING_SECS, SELECTING_SECS};

use crate::auth::MAX_SESSIONS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where accounts live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    #[default]
    Memory,
    Remote {
        url: String,
        #[serde(default = "default_max_attempts")]
        max_attempts: usize,
    },
}

fn default_max_attempts() -> usize {
    RetryPolicy::default().max_attempts
}

/// Per-client request limit.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub selecting_secs: u64,
    pub resolving_secs: u64,
    pub tick_ms: u64,
    /// Fixed seed for reproducible rolls
    pub dice_seed: Option<u64>,
    pub seed_demo_accounts: bool,
    pub rate_limit: Option<RateLimitConfig>,
    /// Live session tokens kept before the oldest are evicted
    pub max_sessions: usize,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            json_logs: false,
            selecting_secs: SELECTING_SECS,
            resolving_secs: RESOLVING_SECS,
            tick_ms: 250,
            dice_seed: None,
            seed_demo_accounts: true,
            rate_limit: None,
            max_sessions: MAX_SESSIONS,
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selecting_secs == 0 || self.resolving_secs == 0 {
            return Err(ConfigError::Invalid(
                "phase durations must be positive".to_string(),
            ));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".to_string()));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "max_sessions must be positive".to_string(),
            ));
        }
        if let Some(limit) = &self.rate_limit {
            if limit.per_second == 0 || limit.burst == 0 {
                return Err(ConfigError::Invalid(
                    "rate limit must allow at least one request".to_string(),
                ));
            }
        }
        if let StoreConfig::Remote { max_attempts, .. } = &self.store {
            if *max_attempts == 0 {
                return Err(ConfigError::Invalid(
                    "max_attempts must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            selecting: Duration::from_secs(self.selecting_secs),
            resolving: Duration::from_secs(self.resolving_secs),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
