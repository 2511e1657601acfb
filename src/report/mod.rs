//! Report rendering and the delivery boundary.
//!
//! `render` turns an aggregated [`Report`] into the HTML email body and is
//! pure, so it tests in isolation from any transport. Delivery goes
//! through the [`ReportDispatcher`] trait; the SMTP implementation lives
//! in [`mailer`].

pub mod mailer;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt::Write;

use crate::types::{FundwatchError, Report};

/// Delivery seam for finished reports.
///
/// The scheduler only needs a send capability; connection lifecycle,
/// authentication and transport details stay behind this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportDispatcher: Send + Sync {
    /// Render and deliver one owner's report.
    async fn dispatch(&self, address: &str, report: &Report) -> Result<(), FundwatchError>;
}

/// Render the HTML email body for one owner's report.
pub fn render(report: &Report) -> String {
    let mut fund_rows = String::new();
    for fund in &report.funds {
        let _ = write!(
            fund_rows,
            "<tr><td>{}</td><td>{}%</td><td>{}</td></tr>",
            fund.name,
            format_percentage(fund.daily_change_pct),
            format_money(fund.current_value),
        );
    }

    format!(
        "<html><body>\
         <h2>Investments report for {date}</h2>\
         <table>\
         <tr><th>Fund</th><th>Daily change</th><th>Value</th></tr>\
         {fund_rows}\
         </table>\
         <table>\
         <tr><td>Cash on hand</td><td>{cash}</td></tr>\
         <tr><td>Fees paid</td><td>{fees}</td></tr>\
         <tr><td>Total investment value</td><td>{total_investment}</td></tr>\
         <tr><td>Grand total</td><td>{grand_total}</td></tr>\
         <tr><td>Total paid in</td><td>{total_payments}</td></tr>\
         <tr><td>Total {outcome}</td><td>{outcome_amount}</td></tr>\
         <tr><td>Overall change</td><td>{overall}%</td></tr>\
         </table>\
         </body></html>",
        date = report.date,
        fund_rows = fund_rows,
        cash = format_money(report.cash_on_hand),
        fees = format_money(report.fees),
        total_investment = format_money(report.total_investment_value),
        grand_total = format_money(report.grand_total),
        total_payments = format_money(report.total_payments),
        outcome = profit_or_loss_word(report.profit_or_loss),
        outcome_amount = format_money(report.profit_or_loss),
        overall = format_percentage(report.overall_change_pct),
    )
}

/// Two decimal places, no sign for positives.
pub fn format_money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Two decimal places with an explicit sign for change percentages.
pub fn format_percentage(value: Decimal) -> String {
    let mut rounded = value.round_dp(2);
    if rounded.is_zero() {
        // Avoid a negative-zero "-0.00" when a tiny negative rounds away.
        rounded = Decimal::ZERO;
    }
    if rounded.is_sign_negative() {
        format!("{rounded:.2}")
    } else {
        format!("+{rounded:.2}")
    }
}

fn profit_or_loss_word(value: Decimal) -> &'static str {
    if value > Decimal::ZERO {
        "profit"
    } else {
        "loss"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
