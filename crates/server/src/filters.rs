//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::NaiveDate;

use hire_purchase_core::Money;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Amount with thousands separators and two decimals.
///
/// Usage in templates: `{{ purchase.outstanding|money }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_money(&value.to_string()))
}

/// Calendar date as `05 Mar 2025`.
///
/// Accepts dates and timestamps; anything else is shown unchanged.
///
/// Usage in templates: `{{ payment.paid_at|date }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_date(&value.to_string()))
}

fn format_money(text: &str) -> String {
    text.parse::<Money>()
        .map_or_else(|_| text.to_string(), |amount| amount.grouped())
}

fn format_date(text: &str) -> String {
    text.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .map_or_else(|| text.to_string(), |d| d.format("%d %b %Y").to_string())
}
