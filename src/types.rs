//! Core domain types: the persisted snapshot records, the transient run
//! state, the aggregated report, and the error taxonomy.
//!
//! Persisted types carry only confirmed previous-run data. Everything the
//! current run collects (fresh quotes, completion) lives in [`Run`]'s
//! lookup, so the snapshot on disk never contains transient fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// A single tracked fund holding, as persisted between runs.
///
/// `previous_date` / `previous_value` are the last confirmed snapshot and
/// are `None` on a first-ever run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    /// Opaque identifier understood by the quote source.
    pub id: String,
    pub name: String,
    /// Number of units held.
    pub holdings: Decimal,
    #[serde(default)]
    pub previous_date: Option<String>,
    /// Last confirmed valuation, in minor units (pence).
    #[serde(default)]
    pub previous_value: Option<Decimal>,
}

/// A grouping of funds sharing one notification address and one set of
/// cash-flow aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub notify_address: String,
    pub cash_on_hand: Decimal,
    pub cash_payments: Vec<Decimal>,
    pub investment_payments: Vec<Decimal>,
    pub funds: Vec<FundRecord>,
}

/// The durable representation persisted across runs: an ordered sequence
/// of owners, each with an ordered sequence of funds.
pub type Snapshot = Vec<OwnerRecord>;

// ---------------------------------------------------------------------------
// Transient run state
// ---------------------------------------------------------------------------

/// A fresh `(date, value)` pair extracted from the quote source. The date
/// is the source's own label, compared as opaque text; the value is in
/// minor units (pence).
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub date: String,
    pub value: Decimal,
}

/// The in-memory state of one poll-until-complete execution.
///
/// Completion is a separate lookup keyed by fund id rather than a flag on
/// the records themselves: a fund is complete exactly when `quotes`
/// contains an entry for it, which keeps the persisted representation pure
/// data.
#[derive(Debug, Clone)]
pub struct Run {
    pub owners: Vec<OwnerRecord>,
    quotes: HashMap<String, Quote>,
}

impl Run {
    /// Seed a run from the persisted snapshot. Nothing is complete yet.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            owners: snapshot,
            quotes: HashMap::new(),
        }
    }

    /// Record a fresh quote for a fund. A second quote for the same fund
    /// is ignored: once settled, a fund's recorded date and value never
    /// change within a run.
    pub fn record_quote(&mut self, fund_id: &str, quote: Quote) {
        self.quotes.entry(fund_id.to_string()).or_insert(quote);
    }

    pub fn quote(&self, fund_id: &str) -> Option<&Quote> {
        self.quotes.get(fund_id)
    }

    pub fn is_fund_complete(&self, fund_id: &str) -> bool {
        self.quotes.contains_key(fund_id)
    }

    pub fn is_owner_complete(&self, owner: &OwnerRecord) -> bool {
        owner.funds.iter().all(|f| self.is_fund_complete(&f.id))
    }

    pub fn is_complete(&self) -> bool {
        self.owners.iter().all(|o| self.is_owner_complete(o))
    }

    pub fn fund_count(&self) -> usize {
        self.owners.iter().map(|o| o.funds.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Aggregated report
// ---------------------------------------------------------------------------

/// One fund's line in an owner's report.
#[derive(Debug, Clone, PartialEq)]
pub struct FundLine {
    pub name: String,
    /// Day-over-day change, in percent (unrounded).
    pub daily_change_pct: Decimal,
    /// Holding value in whole currency units.
    pub current_value: Decimal,
}

/// Aggregated figures for one completed owner. Plain immutable data;
/// rendering and delivery live elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// The valuation date, as reported by the source for the first fund.
    pub date: String,
    pub funds: Vec<FundLine>,
    pub cash_on_hand: Decimal,
    pub fees: Decimal,
    pub total_investment_value: Decimal,
    pub grand_total: Decimal,
    pub total_payments: Decimal,
    pub profit_or_loss: Decimal,
    pub overall_change_pct: Decimal,
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Summary of a finished run, for logging and exit-status decisions.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    /// Polling passes performed (always at least one).
    pub passes: u32,
    /// Retry rounds consumed (passes minus one on a completed run).
    pub retries: u32,
    pub owners_notified: usize,
    /// Delivery errors, one per owner whose report could not be sent.
    /// Delivery failure does not undo completion or block the roll-over.
    pub delivery_failures: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            passes: 0,
            retries: 0,
            owners_notified: 0,
            delivery_failures: Vec::new(),
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "passes={} retries={} notified={} delivery_failures={}",
            self.passes,
            self.retries,
            self.owners_notified,
            self.delivery_failures.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain errors. "No update yet" is deliberately absent: a stale page is
/// an ordinary `Ok(None)` from the extractor, never an error.
#[derive(Debug, thiserror::Error)]
pub enum FundwatchError {
    #[error("Quote source unavailable for {fund_id}: {message}")]
    SourceUnavailable { fund_id: String, message: String },

    #[error("Malformed quote: {0}")]
    MalformedQuote(String),

    #[error("Report delivery to {address} failed: {message}")]
    DeliveryFailed { address: String, message: String },

    #[error("Retry budget exhausted after {retries} retry rounds")]
    RetryBudgetExhausted { retries: u32 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
