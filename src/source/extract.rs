//! Quote extraction from a fund snapshot page.
//!
//! The page carries a quick-stats block whose second table row is the
//! latest close: a `span.heading` with the valuation date and a `td.text`
//! with the value as `UNIT NUMBER` (e.g. `"GBX 105.0"` or `"GBP 1.05"`).
//!
//! A missing block and a date equal to the previously confirmed one both
//! mean "no update yet" and return `Ok(None)` — the page may be transiently
//! malformed or still showing yesterday's close, and the scheduler retries.
//! A value that is present but unparseable is a hard [`MalformedQuote`]
//! error; it must never be mistaken for either "no update" or success.
//!
//! [`MalformedQuote`]: FundwatchError::MalformedQuote

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scraper::{ElementRef, Html, Selector};

use crate::types::{FundwatchError, Quote};

const QUICKSTATS_ROW_SELECTOR: &str = "#overviewQuickstatsDiv tr";
const DATE_SELECTOR: &str = "span.heading";
const VALUE_SELECTOR: &str = "td.text";

/// Unit prefix meaning whole pounds; scaled ×100 so every stored value is
/// in pence. `GBX` quotes are already pence and pass through unscaled.
const WHOLE_UNIT: &str = "GBP";

/// Extract the latest-close quote from raw page content.
///
/// Returns `Ok(None)` when the page holds no update relative to
/// `previous_date`, `Ok(Some(quote))` on a fresh close, and an error only
/// when the value text violates the source's data contract.
pub fn extract(page: &str, previous_date: Option<&str>) -> Result<Option<Quote>, FundwatchError> {
    let document = Html::parse_document(page);

    // Second row of the quick-stats table is the latest close.
    let Some(row) = select_nth(&document, QUICKSTATS_ROW_SELECTOR, 1) else {
        return Ok(None);
    };

    let Some(date) = select_text(&row, DATE_SELECTOR) else {
        return Ok(None);
    };
    if previous_date == Some(date.as_str()) {
        // Still showing the last confirmed close.
        return Ok(None);
    }

    let Some(value_text) = select_text(&row, VALUE_SELECTOR) else {
        return Ok(None);
    };
    let value = parse_value(&value_text)?;

    Ok(Some(Quote { date, value }))
}

/// Parse a `UNIT NUMBER` value string into pence.
fn parse_value(text: &str) -> Result<Decimal, FundwatchError> {
    let text = text.trim();
    let (unit, number) = text
        .split_once(' ')
        .ok_or_else(|| FundwatchError::MalformedQuote(format!("value {text:?} has no unit prefix")))?;

    if unit.len() != 3 || !unit.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(FundwatchError::MalformedQuote(format!(
            "value {text:?} has unit {unit:?}, expected a three-letter currency code"
        )));
    }

    let value: Decimal = number.trim().parse().map_err(|e| {
        FundwatchError::MalformedQuote(format!("bad numeric literal {number:?}: {e}"))
    })?;

    if unit == WHOLE_UNIT {
        Ok(value * dec!(100))
    } else {
        Ok(value)
    }
}

fn select_nth<'a>(document: &'a Html, css: &str, n: usize) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).nth(n)
}

fn select_text(element: &ElementRef, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    element
        .select(&selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
}
