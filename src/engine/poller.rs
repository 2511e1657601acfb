//! The completion scheduler: poll every incomplete fund once per pass,
//! dispatch reports as owners complete, back off between passes, and give
//! up once the retry budget is spent.
//!
//! State machine: polling either ends in completion (every fund has a
//! fresh quote) or aborts with [`FundwatchError::RetryBudgetExhausted`].
//! An aborted run's progress is deliberately discarded by the caller —
//! partial runs are never persisted.

use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::engine::aggregator;
use crate::report::ReportDispatcher;
use crate::source::{extract, QuoteSource};
use crate::types::{FundwatchError, Quote, Run, RunReport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When owners are notified relative to run completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// Dispatch every owner's report only once the whole run completes.
    Flat,
    /// Dispatch each owner's report the moment that owner completes;
    /// owners settle and notify independently.
    OwnerGrouped,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Suspension between passes. Zero re-polls in a tight loop.
    pub retry_delay: Duration,
    /// Retry rounds allowed after the first pass. The budget is enforced
    /// in every configuration; an unbounded loop is not an option.
    pub max_retries: u32,
    pub granularity: Granularity,
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct Poller<'a> {
    source: &'a dyn QuoteSource,
    dispatcher: &'a dyn ReportDispatcher,
    config: PollerConfig,
}

impl<'a> Poller<'a> {
    pub fn new(
        source: &'a dyn QuoteSource,
        dispatcher: &'a dyn ReportDispatcher,
        config: PollerConfig,
    ) -> Self {
        Self {
            source,
            dispatcher,
            config,
        }
    }

    /// Drive the run to completion or abort.
    ///
    /// On completion returns the run summary (including any delivery
    /// failures, which do not fail the run). On an exhausted retry budget
    /// returns [`FundwatchError::RetryBudgetExhausted`]; the caller must
    /// not persist anything in that case.
    pub async fn run(&self, run: &mut Run) -> Result<RunReport, FundwatchError> {
        let mut report = RunReport::new();
        let mut notified: HashSet<usize> = HashSet::new();
        let mut retries = 0u32;

        loop {
            report.passes += 1;
            debug!(pass = report.passes, "Starting polling pass");
            self.pass(run).await;

            if self.config.granularity == Granularity::OwnerGrouped {
                self.dispatch_completed(run, &mut notified, &mut report).await;
            }

            if run.is_complete() {
                if self.config.granularity == Granularity::Flat {
                    self.dispatch_completed(run, &mut notified, &mut report).await;
                }
                report.retries = retries;
                info!(
                    passes = report.passes,
                    retries,
                    notified = report.owners_notified,
                    "Run complete"
                );
                return Ok(report);
            }

            retries += 1;
            if retries > self.config.max_retries {
                error!(
                    retries = retries - 1,
                    pending = pending_fund_ids(run).len(),
                    "Retry budget exhausted, abandoning run"
                );
                return Err(FundwatchError::RetryBudgetExhausted {
                    retries: retries - 1,
                });
            }

            debug!(
                retry = retries,
                delay_secs = self.config.retry_delay.as_secs(),
                "Pass incomplete, backing off"
            );
            if !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }
    }

    /// One polling pass: every incomplete fund is fetched and extracted
    /// exactly once, concurrently. Completed funds are skipped entirely.
    /// A per-fund failure degrades to "no update this pass" and is logged;
    /// it never marks the fund complete.
    async fn pass(&self, run: &mut Run) {
        let pending: Vec<(String, Option<String>)> = run
            .owners
            .iter()
            .flat_map(|o| o.funds.iter())
            .filter(|f| !run.is_fund_complete(&f.id))
            .map(|f| (f.id.clone(), f.previous_date.clone()))
            .collect();

        if pending.is_empty() {
            return;
        }

        let polls = pending
            .iter()
            .map(|(id, previous)| self.poll_one(id, previous.as_deref()));

        for (fund_id, result) in join_all(polls).await {
            match result {
                Ok(Some(quote)) => {
                    info!(
                        fund_id = %fund_id,
                        date = %quote.date,
                        value = %quote.value,
                        "Fresh quote"
                    );
                    run.record_quote(&fund_id, quote);
                }
                Ok(None) => debug!(fund_id = %fund_id, "No update yet"),
                Err(e) => warn!(
                    fund_id = %fund_id,
                    error = %e,
                    "Poll failed, fund stays pending this pass"
                ),
            }
        }
    }

    async fn poll_one(
        &self,
        fund_id: &str,
        previous_date: Option<&str>,
    ) -> (String, Result<Option<Quote>, FundwatchError>) {
        let page = match self.source.fetch_page(fund_id).await {
            Ok(page) => page,
            Err(e) => return (fund_id.to_string(), Err(e)),
        };
        (fund_id.to_string(), extract::extract(&page, previous_date))
    }

    /// Aggregate and dispatch every owner that is complete and not yet
    /// notified. Delivery failure is recorded but final: the owner stays
    /// notified so no duplicate report can follow, and completion stands.
    async fn dispatch_completed(
        &self,
        run: &Run,
        notified: &mut HashSet<usize>,
        report: &mut RunReport,
    ) {
        for (index, owner) in run.owners.iter().enumerate() {
            if notified.contains(&index) || !run.is_owner_complete(owner) {
                continue;
            }
            notified.insert(index);

            let Some(summary) = aggregator::aggregate(owner, run) else {
                error!(
                    owner = %owner.notify_address,
                    "Owner complete but a quote is missing; skipping report"
                );
                continue;
            };

            match self.dispatcher.dispatch(&owner.notify_address, &summary).await {
                Ok(()) => {
                    report.owners_notified += 1;
                    info!(owner = %owner.notify_address, "Report dispatched");
                }
                Err(e) => {
                    error!(owner = %owner.notify_address, error = %e, "Report delivery failed");
                    report.delivery_failures.push(e.to_string());
                }
            }
        }
    }
}

fn pending_fund_ids(run: &Run) -> Vec<String> {
    run.owners
        .iter()
        .flat_map(|o| o.funds.iter())
        .filter(|f| !run.is_fund_complete(&f.id))
        .map(|f| f.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
