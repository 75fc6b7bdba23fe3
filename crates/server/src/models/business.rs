//! Tenants and their shops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hire_purchase_core::{BusinessId, CurrencyCode, Money, ShopId};

/// A tenant. All shops, staff and money of one business share its currency.
#[derive(Debug, Clone, Serialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub slug: String,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
}

impl Business {
    /// Format an amount in the business currency.
    #[must_use]
    pub fn money(&self, amount: Money) -> String {
        amount.display_with(&self.currency)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Shop {
    pub id: ShopId,
    pub business_id: BusinessId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Create/update payload for a shop.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopInput {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A shop with its headline numbers, for the business admin.
#[derive(Debug, Clone, Serialize)]
pub struct ShopSummary {
    pub shop: Shop,
    pub customers: i64,
    pub open_purchases: i64,
    pub overdue_purchases: i64,
    pub outstanding: Money,
    pub collected: Money,
    pub pending_payments: i64,
}
