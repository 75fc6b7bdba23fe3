//! Staff user model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hire_purchase_core::{Email, UserId};

/// A person who can sign in to one or more portals.
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
