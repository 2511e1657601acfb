//! Entry point. Loads configuration, initialises structured logging,
//! seeds a run from the persisted snapshot, drives the poller to
//! completion, rolls the snapshot over, and maps every failure mode to a
//! non-zero exit with a diagnostic.

use anyhow::Result;
use tracing::{error, info, warn};

use fundwatch::config::AppConfig;
use fundwatch::engine::poller::Poller;
use fundwatch::report::mailer::SmtpMailer;
use fundwatch::source::morningstar::MorningstarClient;
use fundwatch::storage;
use fundwatch::types::Run;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;
    init_logging();

    info!(
        snapshot = %cfg.storage.snapshot_path,
        retry_delay_secs = cfg.poller.retry_delay_secs,
        max_retries = cfg.poller.max_retries,
        grouping = ?cfg.poller.grouping,
        "fundwatch starting up"
    );

    // -- Seed the run from the persisted snapshot ------------------------

    let snapshot = storage::load_snapshot(&cfg.storage.snapshot_path)?;
    let mut run = Run::from_snapshot(snapshot);
    info!(
        owners = run.owners.len(),
        funds = run.fund_count(),
        "Run seeded from snapshot"
    );

    // -- Initialise collaborators ----------------------------------------

    let source = MorningstarClient::new(&cfg.source)?;
    let mailer = SmtpMailer::new(&cfg.mail, &cfg.report.subject)?;
    let poller = Poller::new(&source, &mailer, cfg.poller_config());

    // -- Run to completion, cancellable between passes -------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let report = tokio::select! {
        result = poller.run(&mut run) => result?,
        _ = &mut shutdown => {
            // Partial runs are never persisted; stopping mid-run is
            // equivalent to abort-without-save.
            warn!("Shutdown signal received mid-run; collected progress discarded");
            anyhow::bail!("interrupted before completion, nothing persisted");
        }
    };

    // -- Persist the roll-over -------------------------------------------

    storage::save_snapshot(&cfg.storage.snapshot_path, &run)?;
    info!(summary = %report, "Snapshot rolled over");

    if !report.delivery_failures.is_empty() {
        for failure in &report.delivery_failures {
            error!(error = %failure, "Report delivery failed");
        }
        anyhow::bail!(
            "{} of {} report(s) could not be delivered (data was collected and persisted)",
            report.delivery_failures.len(),
            report.delivery_failures.len() + report.owners_notified,
        );
    }

    info!("fundwatch finished cleanly");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fundwatch=info"));

    let json_logging = std::env::var("FUNDWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
