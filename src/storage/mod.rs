//! Snapshot persistence.
//!
//! The snapshot JSON file doubles as the portfolio definition, so unlike a
//! cache it must exist before the first run; a missing file is a hard
//! error. Saving applies the roll-over rule: each fund's fresh quote
//! becomes its confirmed previous date and value. The caller only saves a
//! run the scheduler reported complete — an aborted run's collected
//! progress is discarded by design.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::types::{Run, Snapshot};

/// Load the snapshot that seeds a run.
pub fn load_snapshot(path: &str) -> Result<Snapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {path}"))?;

    let snapshot: Snapshot =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse snapshot from {path}"))?;

    info!(
        path,
        owners = snapshot.len(),
        funds = snapshot.iter().map(|o| o.funds.len()).sum::<usize>(),
        "Snapshot loaded"
    );

    Ok(snapshot)
}

/// Persist the rolled-over snapshot for the next run.
pub fn save_snapshot(path: &str, run: &Run) -> Result<()> {
    let snapshot = roll_over(run);

    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialise snapshot")?;
    std::fs::write(path, &json).with_context(|| format!("Failed to write snapshot to {path}"))?;

    debug!(path, owners = snapshot.len(), "Snapshot saved");
    Ok(())
}

/// Fold the run's collected quotes back into persisted form:
/// fresh date/value become the previous date/value, and the completion
/// lookup is simply not carried over.
fn roll_over(run: &Run) -> Snapshot {
    run.owners
        .iter()
        .map(|owner| {
            let mut owner = owner.clone();
            for fund in &mut owner.funds {
                if let Some(quote) = run.quote(&fund.id) {
                    fund.previous_date = Some(quote.date.clone());
                    fund.previous_value = Some(quote.value);
                }
            }
            owner
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FundRecord, OwnerRecord, Quote};
    use rust_decimal_macros::dec;

    fn temp_path() -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("fundwatch_test_snapshot_{}.json", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn sample_snapshot() -> Snapshot {
        vec![OwnerRecord {
            notify_address: "a@example.com".to_string(),
            cash_on_hand: dec!(200),
            cash_payments: vec![dec!(500), dec!(300)],
            investment_payments: vec![dec!(100)],
            funds: vec![FundRecord {
                id: "F1".to_string(),
                name: "Global Index".to_string(),
                holdings: dec!(10),
                previous_date: Some("20/08/2026".to_string()),
                previous_value: Some(dec!(1000)),
            }],
        }]
    }

    #[test]
    fn test_save_and_load_rolls_over() {
        let path = temp_path();

        let mut run = Run::from_snapshot(sample_snapshot());
        run.record_quote(
            "F1",
            Quote {
                date: "21/08/2026".to_string(),
                value: dec!(1050),
            },
        );

        save_snapshot(&path, &run).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        let fund = &loaded[0].funds[0];
        assert_eq!(fund.previous_date.as_deref(), Some("21/08/2026"));
        assert_eq!(fund.previous_value, Some(dec!(1050)));

        // Owner-level fields survive untouched.
        assert_eq!(loaded[0].notify_address, "a@example.com");
        assert_eq!(loaded[0].cash_payments, vec![dec!(500), dec!(300)]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_saved_json_has_no_transient_fields() {
        let path = temp_path();

        let mut run = Run::from_snapshot(sample_snapshot());
        run.record_quote(
            "F1",
            Quote {
                date: "21/08/2026".to_string(),
                value: dec!(1050),
            },
        );
        save_snapshot(&path, &run).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(!json.contains("new_date"));
        assert!(!json.contains("new_value"));
        assert!(!json.contains("complete"));
        assert!(!json.contains("done"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_fund_without_quote_keeps_previous_values() {
        // save_snapshot is only called on completed runs, but roll_over is
        // total: an unquoted fund keeps its confirmed snapshot.
        let run = Run::from_snapshot(sample_snapshot());
        let snapshot = roll_over(&run);
        let fund = &snapshot[0].funds[0];
        assert_eq!(fund.previous_date.as_deref(), Some("20/08/2026"));
        assert_eq!(fund.previous_value, Some(dec!(1000)));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = load_snapshot("/tmp/fundwatch_nonexistent_snapshot_xyz.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_malformed_json_is_error() {
        let path = temp_path();
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_snapshot(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
