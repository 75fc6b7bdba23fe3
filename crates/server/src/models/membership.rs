//! Memberships: the unit of authorization.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hire_purchase_core::{
    BusinessId, Email, MembershipId, MembershipRole, Money, ShopId, UserId,
};

use super::business::{Business, Shop};

#[derive(Debug, Clone, Serialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub business_id: BusinessId,
    /// `None` for business admins.
    pub shop_id: Option<ShopId>,
    pub role: MembershipRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A membership with everything needed to authorize a request.
#[derive(Debug, Clone)]
pub struct MembershipScope {
    pub membership: Membership,
    pub user_name: String,
    pub user_email: Email,
    pub business: Business,
    pub shop: Option<Shop>,
}

/// A shop admin or collector as listed to managers.
#[derive(Debug, Clone, Serialize)]
pub struct StaffMember {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: MembershipRole,
    pub is_active: bool,
}

/// Collector with workload and collection totals.
#[derive(Debug, Clone, Serialize)]
pub struct CollectorSummary {
    pub staff: StaffMember,
    pub assigned_customers: i64,
    pub collected: Money,
    pub pending_count: i64,
    pub pending_amount: Money,
}
