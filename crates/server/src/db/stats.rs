//! Dashboard aggregates.

use chrono::{Datelike, Months, NaiveDate};
use sqlx::PgPool;

use hire_purchase_core::{BusinessId, MembershipId, Money, PurchaseStatus, ShopId};

use super::RepositoryError;
use crate::models::{BusinessStats, CollectorStats, MonthlyTotal, ShopStats, StatsScope, StatusSlice};

#[derive(Debug, sqlx::FromRow)]
struct ShopStatsRow {
    customers: i64,
    open_purchases: i64,
    overdue_purchases: i64,
    outstanding: Money,
    collected_this_month: Money,
    pending_count: i64,
    pending_amount: Money,
}

#[derive(Debug, sqlx::FromRow)]
struct BusinessStatsRow {
    shops: i64,
    active_shops: i64,
    customers: i64,
    open_purchases: i64,
    overdue_purchases: i64,
    outstanding: Money,
    collected_this_month: Money,
    pending_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct CollectorStatsRow {
    assigned_customers: i64,
    collected_today: Money,
    collected_this_month: Money,
    pending_count: i64,
    pending_amount: Money,
}

fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

impl StatsScope {
    // Every stats query joins `shops s`, so the scope filters on it.
    const fn clause(self) -> &'static str {
        match self {
            Self::Business(_) => "s.business_id = $1",
            Self::Shop(_) => "s.id = $1",
        }
    }

    const fn id(self) -> i32 {
        match self {
            Self::Business(id) => id.as_i32(),
            Self::Shop(id) => id.as_i32(),
        }
    }
}

/// Read-only aggregates for the dashboards.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Headline numbers for a shop admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shop_stats(
        &self,
        shop_id: ShopId,
        today: NaiveDate,
    ) -> Result<ShopStats, RepositoryError> {
        let row = sqlx::query_as::<_, ShopStatsRow>(
            r"
            SELECT
                (SELECT COUNT(*) FROM customers WHERE shop_id = $1) AS customers,
                (SELECT COUNT(*) FROM purchases
                  WHERE shop_id = $1 AND status IN ('PENDING', 'ACTIVE', 'OVERDUE')) AS open_purchases,
                (SELECT COUNT(*) FROM purchases
                  WHERE shop_id = $1 AND status = 'OVERDUE') AS overdue_purchases,
                (SELECT COALESCE(SUM(outstanding_balance), 0) FROM purchases
                  WHERE shop_id = $1 AND status <> 'COMPLETED') AS outstanding,
                (SELECT COALESCE(SUM(amount), 0) FROM payments
                  WHERE shop_id = $1 AND is_confirmed AND paid_at::date >= $2) AS collected_this_month,
                (SELECT COUNT(*) FROM payments
                  WHERE shop_id = $1 AND status = 'PENDING') AS pending_count,
                (SELECT COALESCE(SUM(amount), 0) FROM payments
                  WHERE shop_id = $1 AND status = 'PENDING') AS pending_amount
            ",
        )
        .bind(shop_id)
        .bind(month_start(today))
        .fetch_one(self.pool)
        .await?;

        Ok(ShopStats {
            customers: row.customers,
            open_purchases: row.open_purchases,
            overdue_purchases: row.overdue_purchases,
            outstanding: row.outstanding,
            collected_this_month: row.collected_this_month,
            pending_count: row.pending_count,
            pending_amount: row.pending_amount,
        })
    }

    /// Headline numbers across every shop of a business.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn business_stats(
        &self,
        business_id: BusinessId,
        today: NaiveDate,
    ) -> Result<BusinessStats, RepositoryError> {
        let row = sqlx::query_as::<_, BusinessStatsRow>(
            r"
            WITH scoped AS (SELECT id FROM shops WHERE business_id = $1)
            SELECT
                (SELECT COUNT(*) FROM shops WHERE business_id = $1) AS shops,
                (SELECT COUNT(*) FROM shops WHERE business_id = $1 AND is_active) AS active_shops,
                (SELECT COUNT(*) FROM customers
                  WHERE shop_id IN (SELECT id FROM scoped)) AS customers,
                (SELECT COUNT(*) FROM purchases
                  WHERE shop_id IN (SELECT id FROM scoped)
                    AND status IN ('PENDING', 'ACTIVE', 'OVERDUE')) AS open_purchases,
                (SELECT COUNT(*) FROM purchases
                  WHERE shop_id IN (SELECT id FROM scoped) AND status = 'OVERDUE') AS overdue_purchases,
                (SELECT COALESCE(SUM(outstanding_balance), 0) FROM purchases
                  WHERE shop_id IN (SELECT id FROM scoped) AND status <> 'COMPLETED') AS outstanding,
                (SELECT COALESCE(SUM(amount), 0) FROM payments
                  WHERE shop_id IN (SELECT id FROM scoped)
                    AND is_confirmed AND paid_at::date >= $2) AS collected_this_month,
                (SELECT COUNT(*) FROM payments
                  WHERE shop_id IN (SELECT id FROM scoped) AND status = 'PENDING') AS pending_count
            ",
        )
        .bind(business_id)
        .bind(month_start(today))
        .fetch_one(self.pool)
        .await?;

        Ok(BusinessStats {
            shops: row.shops,
            active_shops: row.active_shops,
            customers: row.customers,
            open_purchases: row.open_purchases,
            overdue_purchases: row.overdue_purchases,
            outstanding: row.outstanding,
            collected_this_month: row.collected_this_month,
            pending_count: row.pending_count,
        })
    }

    /// Numbers for one collector's dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn collector_stats(
        &self,
        shop_id: ShopId,
        collector: MembershipId,
        today: NaiveDate,
    ) -> Result<CollectorStats, RepositoryError> {
        let row = sqlx::query_as::<_, CollectorStatsRow>(
            r"
            SELECT
                (SELECT COUNT(*) FROM customers
                  WHERE shop_id = $1 AND collector_membership_id = $2) AS assigned_customers,
                (SELECT COALESCE(SUM(amount), 0) FROM payments
                  WHERE shop_id = $1 AND collector_id = $2 AND is_confirmed
                    AND paid_at::date = $3) AS collected_today,
                (SELECT COALESCE(SUM(amount), 0) FROM payments
                  WHERE shop_id = $1 AND collector_id = $2 AND is_confirmed
                    AND paid_at::date >= $4) AS collected_this_month,
                (SELECT COUNT(*) FROM payments
                  WHERE shop_id = $1 AND collector_id = $2 AND status = 'PENDING') AS pending_count,
                (SELECT COALESCE(SUM(amount), 0) FROM payments
                  WHERE shop_id = $1 AND collector_id = $2 AND status = 'PENDING') AS pending_amount
            ",
        )
        .bind(shop_id)
        .bind(collector)
        .bind(today)
        .bind(month_start(today))
        .fetch_one(self.pool)
        .await?;

        Ok(CollectorStats {
            assigned_customers: row.assigned_customers,
            collected_today: row.collected_today,
            collected_this_month: row.collected_this_month,
            pending_count: row.pending_count,
            pending_amount: row.pending_amount,
        })
    }

    /// Purchase counts per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_breakdown(
        &self,
        scope: StatsScope,
    ) -> Result<Vec<StatusSlice>, RepositoryError> {
        let sql = format!(
            "SELECT p.status, COUNT(*)
             FROM purchases p
             JOIN shops s ON s.id = p.shop_id
             WHERE {}
             GROUP BY p.status",
            scope.clause()
        );
        let counts: Vec<(PurchaseStatus, i64)> = sqlx::query_as(&sql)
            .bind(scope.id())
            .fetch_all(self.pool)
            .await?;

        Ok(StatusSlice::breakdown(&counts))
    }

    /// Confirmed collections per month for the last `months` months,
    /// including the current one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn monthly_collections(
        &self,
        scope: StatsScope,
        today: NaiveDate,
        months: u32,
    ) -> Result<Vec<MonthlyTotal>, RepositoryError> {
        let since = month_start(today)
            .checked_sub_months(Months::new(months.saturating_sub(1)))
            .unwrap_or_else(|| month_start(today));
        let sql = format!(
            "SELECT date_trunc('month', pay.paid_at)::date AS month, SUM(pay.amount) AS amount
             FROM payments pay
             JOIN shops s ON s.id = pay.shop_id
             WHERE {} AND pay.is_confirmed AND pay.paid_at::date >= $2
             GROUP BY 1",
            scope.clause()
        );
        let rows: Vec<(NaiveDate, Money)> = sqlx::query_as(&sql)
            .bind(scope.id())
            .bind(since)
            .fetch_all(self.pool)
            .await?;

        Ok(MonthlyTotal::series(&rows, today, months))
    }
}
