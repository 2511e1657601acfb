//! Aggregation of a completed owner's quotes into a [`Report`].
//!
//! Pure calculation, no side effects. All money stays in `Decimal`;
//! stored values are pence, reported holding values are whole pounds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{FundLine, OwnerRecord, Report, Run};

/// Build the report for one owner from the run's collected quotes.
///
/// Returns `None` if any of the owner's funds is still missing a quote —
/// the scheduler only calls this once the owner is complete, so `None`
/// indicates a scheduling bug rather than an expected state.
pub fn aggregate(owner: &OwnerRecord, run: &Run) -> Option<Report> {
    let mut funds = Vec::with_capacity(owner.funds.len());
    let mut total_investment_value = Decimal::ZERO;
    let mut date = String::new();

    for fund in &owner.funds {
        let quote = run.quote(&fund.id)?;
        if date.is_empty() {
            date = quote.date.clone();
        }

        // First-ever run has no previous value; report zero change rather
        // than a meaningless jump from nothing.
        let daily_change_pct = match fund.previous_value {
            Some(previous) => change_percent(previous, quote.value),
            None => Decimal::ZERO,
        };

        // Stored values are pence; holding value is a real-money figure.
        let current_value = quote.value / dec!(100) * fund.holdings;
        total_investment_value += current_value;

        funds.push(FundLine {
            name: fund.name.clone(),
            daily_change_pct,
            current_value,
        });
    }

    let cash_paid: Decimal = owner.cash_payments.iter().copied().sum();
    let invested_paid: Decimal = owner.investment_payments.iter().copied().sum();

    let fees = cash_paid - owner.cash_on_hand;
    let grand_total = owner.cash_on_hand + total_investment_value;
    let total_payments = cash_paid + invested_paid;
    let profit_or_loss = grand_total - total_payments;
    let overall_change_pct = change_percent(total_payments, grand_total);

    Some(Report {
        date,
        funds,
        cash_on_hand: owner.cash_on_hand,
        fees,
        total_investment_value,
        grand_total,
        total_payments,
        profit_or_loss,
        overall_change_pct,
    })
}

/// `(1 - from/to) * 100`, with a zero-change sentinel when `to` is zero.
fn change_percent(from: Decimal, to: Decimal) -> Decimal {
    match from.checked_div(to) {
        Some(ratio) => (Decimal::ONE - ratio) * dec!(100),
        None => Decimal::ZERO,
    }
}
