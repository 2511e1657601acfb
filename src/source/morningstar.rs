//! Morningstar UK fund snapshot pages.
//!
//! One GET per fund against the public snapshot endpoint; no auth, no
//! rate-limit handling. The per-request timeout is set on the client so a
//! hung fetch cannot stall the rest of a polling pass.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::QuoteSource;
use crate::config::SourceConfig;
use crate::types::FundwatchError;

const SNAPSHOT_PATH: &str = "/uk/funds/snapshot/snapshot.aspx";
const USER_AGENT: &str = concat!("fundwatch/", env!("CARGO_PKG_VERSION"));

/// HTTP client for Morningstar fund snapshot pages.
pub struct MorningstarClient {
    http: Client,
    base_url: String,
}

impl MorningstarClient {
    pub fn new(cfg: &SourceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn snapshot_url(&self, fund_id: &str) -> String {
        format!("{}{}?id={}", self.base_url, SNAPSHOT_PATH, fund_id)
    }
}

#[async_trait]
impl QuoteSource for MorningstarClient {
    async fn fetch_page(&self, fund_id: &str) -> Result<String, FundwatchError> {
        let url = self.snapshot_url(fund_id);
        debug!(fund_id, %url, "Fetching snapshot page");

        let unavailable = |message: String| FundwatchError::SourceUnavailable {
            fund_id: fund_id.to_string(),
            message,
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| unavailable(e.to_string()))?;

        response.text().await.map_err(|e| unavailable(e.to_string()))
    }
}
