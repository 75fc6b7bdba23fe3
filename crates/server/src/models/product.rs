//! Shop catalogue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hire_purchase_core::{Money, ProductId, ShopId};

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub sku: Option<String>,
    pub price: Money,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Create/update payload for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: Money,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}
