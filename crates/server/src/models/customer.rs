//! Shop customers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hire_purchase_core::{CustomerId, MembershipId, Money, ShopId};

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub shop_id: ShopId,
    pub collector_membership_id: Option<MembershipId>,
    pub collector_name: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Customer row on list screens.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerOverview {
    pub customer: Customer,
    pub open_purchases: i64,
    pub outstanding: Money,
}

/// Create/update payload for a customer.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub collector_membership_id: Option<MembershipId>,
}
