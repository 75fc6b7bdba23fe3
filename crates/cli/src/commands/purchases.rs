//! Purchase maintenance.

use chrono::{NaiveDate, Utc};

use hire_purchase_server::services::PurchaseService;

use super::{CommandError, connect};

/// Run the overdue sweep as of `date` (default: today in UTC).
///
/// Safe to run repeatedly; purchases already in the right state are left
/// untouched.
pub async fn refresh_overdue(date: Option<NaiveDate>) -> Result<(), CommandError> {
    let today = date.unwrap_or_else(|| Utc::now().date_naive());
    let pool = connect().await?;

    let report = PurchaseService::new(&pool).refresh_overdue(today).await?;

    tracing::info!(
        %today,
        checked = report.checked,
        updated = report.updated,
        skipped = report.skipped,
        "Overdue sweep complete"
    );
    Ok(())
}
