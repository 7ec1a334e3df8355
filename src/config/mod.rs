// ABOUTME: Configuration for stevedore.yml: engine selection and batch defaults.
// ABOUTME: Handles YAML parsing, file discovery, and environment overrides.

use crate::error::{Error, Result};
use crate::rpc::Address;
use crate::runtime::EngineConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "stevedore.yml";
pub const CONFIG_FILENAME_ALT: &str = "stevedore.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".stevedore/config.yml";

/// Replaces `engine.remote_address` when set.
pub const REMOTE_ADDRESS_ENV: &str = "STEVEDORE_REMOTE_ADDRESS";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    /// Worker bound for batch commands; unset or 0 uses the per-command default.
    #[serde(default)]
    pub max_workers: Option<usize>,

    #[serde(default = "default_wait_interval", with = "humantime_serde")]
    pub wait_interval: Duration,
}

fn default_wait_interval() -> Duration {
    Duration::from_millis(250)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            max_workers: None,
            wait_interval: default_wait_interval(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first config file found in `dir`, or defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Load `explicit` if given, else discover in `dir`; then apply the environment.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::discover(dir)?,
        };
        config.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        match std::env::var(REMOTE_ADDRESS_ENV) {
            Ok(address) if !address.trim().is_empty() => {
                self.engine.remote_address = address;
                self.validate()?;
            }
            _ => {}
        }
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.wait_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "wait_interval must be greater than 0".to_string(),
            ));
        }
        self.engine
            .remote_address
            .parse::<Address>()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(())
    }
}
