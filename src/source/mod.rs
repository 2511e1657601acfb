//! Quote source boundary.
//!
//! Defines the `QuoteSource` trait (fetch raw page content for a fund) and
//! provides the Morningstar implementation plus the extractor that turns
//! page content into a fresh `(date, value)` quote.

pub mod extract;
pub mod morningstar;

use async_trait::async_trait;

use crate::types::FundwatchError;

/// Abstraction over the external per-fund quote source.
///
/// Implementors fetch raw page content for one fund identifier. Transport
/// failures surface as [`FundwatchError::SourceUnavailable`]; interpreting
/// the content is the extractor's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the raw snapshot page for a fund.
    async fn fetch_page(&self, fund_id: &str) -> Result<String, FundwatchError>;
}
