// Configuration structs

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::constants::{
    DEFAULT_INTERPRETER, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
    MAX_ATTEMPTS_LIMIT,
};
use super::provider::ProviderEntry;
use crate::providers::GenerationOptions;

/// How scripts are run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Wall-clock limit per run
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Fix attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// HTTP timeout for each completion request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Transport-level retries inside the provider (1 = no retry)
    #[serde(default = "default_request_retries")]
    pub request_retries: u32,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_request_retries() -> u32 {
    3
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            request_timeout_seconds: default_request_timeout(),
            request_retries: default_request_retries(),
        }
    }
}

/// Feature flags configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Write fixes back without asking
    /// ⚠️  Overwrites the target file (a .bak copy is kept)
    #[serde(default)]
    pub auto_apply: bool,

    /// Stream analyze/explain output as it is generated
    #[serde(default = "default_true")]
    pub streaming_enabled: bool,

    /// Enable debug logging for troubleshooting
    #[serde(default)]
    pub debug_logging: bool,

    /// Append one JSONL record per repair under metrics_dir
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            auto_apply: false, // Safe default: ask before overwriting
            streaming_enabled: true,
            debug_logging: false,
            metrics_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub provider: ProviderEntry,
    pub generation: GenerationOptions,
    pub executor: ExecutorConfig,
    pub repair: RepairConfig,
    pub features: FeaturesConfig,

    /// Directory for metrics storage
    pub metrics_dir: PathBuf,
}

impl Config {
    /// Defaults rooted at `config_dir` (normally ~/.mender)
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            provider: ProviderEntry::default(),
            generation: GenerationOptions::default(),
            executor: ExecutorConfig::default(),
            repair: RepairConfig::default(),
            features: FeaturesConfig::default(),
            metrics_dir: config_dir.join("metrics"),
        }
    }

    pub fn with_provider(mut self, provider: ProviderEntry) -> Self {
        self.provider = provider;
        self
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.executor.timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.repair.request_timeout_seconds)
    }

    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> Result<()> {
        if self.executor.timeout_seconds == 0 {
            bail!("executor.timeout_seconds must be greater than 0");
        }

        if self.executor.interpreter.trim().is_empty() {
            bail!("executor.interpreter must not be empty");
        }

        if self.repair.max_attempts == 0 {
            bail!("repair.max_attempts must be at least 1");
        }

        if self.repair.max_attempts > MAX_ATTEMPTS_LIMIT {
            bail!(
                "repair.max_attempts ({}) is unreasonably high\n\n\
                 Recommended range: 1-{}. Each attempt is a full model round trip.",
                self.repair.max_attempts,
                MAX_ATTEMPTS_LIMIT
            );
        }

        if self.repair.request_timeout_seconds == 0 {
            bail!("repair.request_timeout_seconds must be greater than 0");
        }

        if self.provider.model().trim().is_empty() {
            bail!(
                "No model configured for the {} provider\n\n\
                 Set `model` under [provider] in ~/.mender/config.toml or pass --model",
                self.provider.provider_type()
            );
        }

        let url = self.provider.base_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!(
                "Invalid base URL: '{}'\n\n\
                 Base URL should include the scheme, e.g. http://localhost:11434",
                url
            );
        }

        Ok(())
    }
}
