//! Membership repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hire_purchase_core::{
    BusinessId, CurrencyCode, Email, MembershipId, MembershipRole, Money, ShopId, UserId,
};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Business, CollectorSummary, Membership, MembershipScope, Shop, StaffMember};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    id: i32,
    user_id: i32,
    business_id: i32,
    shop_id: Option<i32>,
    role: MembershipRole,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Self {
            id: MembershipId::new(row.id),
            user_id: UserId::new(row.user_id),
            business_id: BusinessId::new(row.business_id),
            shop_id: row.shop_id.map(ShopId::new),
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ScopeRow {
    #[sqlx(flatten)]
    membership: MembershipRow,
    user_name: String,
    user_email: String,
    business_name: String,
    business_slug: String,
    currency_code: String,
    business_created_at: DateTime<Utc>,
    shop_name: Option<String>,
    shop_address: Option<String>,
    shop_phone: Option<String>,
    shop_is_active: Option<bool>,
    shop_created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScopeRow> for MembershipScope {
    type Error = RepositoryError;

    fn try_from(row: ScopeRow) -> Result<Self, Self::Error> {
        let membership = Membership::from(row.membership);
        let user_email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let currency =
            CurrencyCode::parse(&row.currency_code).map_err(RepositoryError::DataCorruption)?;

        let shop = match (membership.shop_id, row.shop_name, row.shop_created_at) {
            (Some(id), Some(name), Some(created_at)) => Some(Shop {
                id,
                business_id: membership.business_id,
                name,
                address: row.shop_address,
                phone: row.shop_phone,
                is_active: row.shop_is_active.unwrap_or(false),
                created_at,
            }),
            _ => None,
        };

        Ok(Self {
            business: Business {
                id: membership.business_id,
                name: row.business_name,
                slug: row.business_slug,
                currency,
                created_at: row.business_created_at,
            },
            shop,
            user_name: row.user_name,
            user_email,
            membership,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    membership_id: i32,
    user_id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    role: MembershipRole,
    is_active: bool,
}

impl TryFrom<StaffRow> for StaffMember {
    type Error = RepositoryError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            membership_id: MembershipId::new(row.membership_id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            email,
            phone: row.phone,
            role: row.role,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CollectorSummaryRow {
    #[sqlx(flatten)]
    staff: StaffRow,
    assigned_customers: i64,
    collected: Money,
    pending_count: i64,
    pending_amount: Money,
}

const SCOPE_SELECT: &str = r"
    SELECT m.id, m.user_id, m.business_id, m.shop_id, m.role, m.is_active, m.created_at,
           u.name AS user_name, u.email AS user_email,
           b.name AS business_name, b.slug AS business_slug, b.currency_code,
           b.created_at AS business_created_at,
           s.name AS shop_name, s.address AS shop_address, s.phone AS shop_phone,
           s.is_active AS shop_is_active, s.created_at AS shop_created_at
    FROM memberships m
    JOIN users u ON u.id = m.user_id
    JOIN businesses b ON b.id = m.business_id
    LEFT JOIN shops s ON s.id = m.shop_id
";

const STAFF_SELECT: &str = r"
    SELECT m.id AS membership_id, u.id AS user_id, u.name, u.email, u.phone, m.role, m.is_active
    FROM memberships m
    JOIN users u ON u.id = m.user_id
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for memberships.
pub struct MembershipRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MembershipRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a membership by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: MembershipId) -> Result<Option<Membership>, RepositoryError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r"
            SELECT id, user_id, business_id, shop_id, role, is_active, created_at
            FROM memberships
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a membership with its user, business and shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_scope(
        &self,
        id: MembershipId,
    ) -> Result<Option<MembershipScope>, RepositoryError> {
        let sql = format!("{SCOPE_SELECT} WHERE m.id = $1");
        let row = sqlx::query_as::<_, ScopeRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// The oldest active membership of `user_id` with `role` whose shop (if
    /// any) is active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn find_for_login(
        &self,
        user_id: UserId,
        role: MembershipRole,
    ) -> Result<Option<MembershipScope>, RepositoryError> {
        let sql = format!(
            "{SCOPE_SELECT}
             WHERE m.user_id = $1 AND m.role = $2 AND m.is_active
               AND (m.shop_id IS NULL OR s.is_active)
             ORDER BY m.created_at, m.id
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, ScopeRow>(&sql)
            .bind(user_id)
            .bind(role)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Whether `user_id` holds any membership, active or not, in `business_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_member_of_business(
        &self,
        user_id: UserId,
        business_id: BusinessId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM memberships WHERE user_id = $1 AND business_id = $2
            )
            ",
        )
        .bind(user_id)
        .bind(business_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a membership.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already holds this role
    /// in this business or shop.
    pub async fn create(
        &self,
        user_id: UserId,
        business_id: BusinessId,
        shop_id: Option<ShopId>,
        role: MembershipRole,
    ) -> Result<Membership, RepositoryError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r"
            INSERT INTO memberships (user_id, business_id, shop_id, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, business_id, shop_id, role, is_active, created_at
            ",
        )
        .bind(user_id)
        .bind(business_id)
        .bind(shop_id)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "membership"))?;

        Ok(row.into())
    }

    /// Staff of a shop holding `role`, active first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop(
        &self,
        shop_id: ShopId,
        role: MembershipRole,
    ) -> Result<Vec<StaffMember>, RepositoryError> {
        let sql = format!(
            "{STAFF_SELECT}
             WHERE m.shop_id = $1 AND m.role = $2
             ORDER BY m.is_active DESC, u.name"
        );
        let rows = sqlx::query_as::<_, StaffRow>(&sql)
            .bind(shop_id)
            .bind(role)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// One staff member of a shop with `role`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_staff_in_shop(
        &self,
        shop_id: ShopId,
        id: MembershipId,
        role: MembershipRole,
    ) -> Result<Option<StaffMember>, RepositoryError> {
        let sql = format!("{STAFF_SELECT} WHERE m.shop_id = $1 AND m.id = $2 AND m.role = $3");
        let row = sqlx::query_as::<_, StaffRow>(&sql)
            .bind(shop_id)
            .bind(id)
            .bind(role)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Activate or deactivate a shop membership.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such membership is in the shop.
    pub async fn set_active(
        &self,
        shop_id: ShopId,
        id: MembershipId,
        role: MembershipRole,
        is_active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE memberships
            SET is_active = $4
            WHERE shop_id = $1 AND id = $2 AND role = $3
            ",
        )
        .bind(shop_id)
        .bind(id)
        .bind(role)
        .bind(is_active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Collectors of a shop with assigned customers and collection totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn collector_summaries(
        &self,
        shop_id: ShopId,
    ) -> Result<Vec<CollectorSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CollectorSummaryRow>(
            r"
            SELECT m.id AS membership_id, u.id AS user_id, u.name, u.email, u.phone,
                   m.role, m.is_active,
                   (SELECT COUNT(*) FROM customers c
                     WHERE c.collector_membership_id = m.id) AS assigned_customers,
                   (SELECT COALESCE(SUM(pay.amount), 0) FROM payments pay
                     WHERE pay.collector_id = m.id AND pay.is_confirmed) AS collected,
                   (SELECT COUNT(*) FROM payments pay
                     WHERE pay.collector_id = m.id AND pay.status = 'PENDING') AS pending_count,
                   (SELECT COALESCE(SUM(pay.amount), 0) FROM payments pay
                     WHERE pay.collector_id = m.id AND pay.status = 'PENDING') AS pending_amount
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.shop_id = $1 AND m.role = 'collector'
            ORDER BY m.is_active DESC, u.name
            ",
        )
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(CollectorSummary {
                    staff: StaffMember::try_from(row.staff)?,
                    assigned_customers: row.assigned_customers,
                    collected: row.collected,
                    pending_count: row.pending_count,
                    pending_amount: row.pending_amount,
                })
            })
            .collect()
    }
}
