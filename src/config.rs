//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserialises into strongly-typed sections.
//! Secrets (the SMTP password) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::poller::{Granularity, PollerConfig};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub poller: PollerSection,
    pub source: SourceConfig,
    pub mail: MailConfig,
    pub report: ReportConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerSection {
    /// Delay between polling passes. Zero means a tight re-poll loop;
    /// the retry budget applies either way.
    pub retry_delay_secs: u64,
    pub max_retries: u32,
    /// `"flat"` notifies everyone once the whole run completes;
    /// `"owner-grouped"` notifies each owner the moment they complete.
    pub grouping: Granularity,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    /// Per-request timeout. A hung fetch must not stall the pass.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub use_starttls: bool,
    pub from_address: String,
    pub username: String,
    /// Name of the env var holding the SMTP password.
    pub password_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    pub subject: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub snapshot_path: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Scheduler configuration derived from the `[poller]` section.
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            retry_delay: Duration::from_secs(self.poller.retry_delay_secs),
            max_retries: self.poller.max_retries,
            granularity: self.poller.grouping,
        }
    }
}

impl MailConfig {
    /// Resolve the SMTP password from the env var named in the config.
    pub fn password(&self) -> Result<SecretString> {
        let value = std::env::var(&self.password_env)
            .with_context(|| format!("Environment variable not set: {}", self.password_env))?;
        Ok(SecretString::new(value))
    }
}
