//! Status and role enums.
//!
//! Wire names (serde and Postgres enum labels) are the upper-case forms used
//! in the database, e.g. `OVERDUE`, `MOBILE_MONEY`. Membership roles use
//! snake case because they also appear in URLs and tokens.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a hire-purchase agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "purchase_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    /// Created, nothing received yet.
    #[default]
    Pending,
    /// Money received and installments on schedule.
    Active,
    /// Installments due before today are unpaid.
    Overdue,
    /// Fully paid.
    Completed,
    /// Written off by a shop admin.
    Defaulted,
}

impl PurchaseStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Active,
        Self::Overdue,
        Self::Completed,
        Self::Defaulted,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Overdue => "OVERDUE",
            Self::Completed => "COMPLETED",
            Self::Defaulted => "DEFAULTED",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Overdue => "Overdue",
            Self::Completed => "Completed",
            Self::Defaulted => "Defaulted",
        }
    }

    /// Whether money is still expected on this purchase.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Active | Self::Overdue)
    }
}

/// Confirmation state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Recorded by a collector, awaiting a shop admin.
    #[default]
    Pending,
    /// Confirmed; counted in the purchase balance.
    Completed,
    /// Rejected by a shop admin; never counted.
    Rejected,
}

impl PaymentStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Completed, Self::Rejected];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Awaiting confirmation",
            Self::Completed => "Confirmed",
            Self::Rejected => "Rejected",
        }
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    MobileMoney,
    BankTransfer,
    Card,
    Other,
}

impl PaymentMethod {
    pub const ALL: [Self; 5] = [
        Self::Cash,
        Self::MobileMoney,
        Self::BankTransfer,
        Self::Card,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::MobileMoney => "MOBILE_MONEY",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Card => "CARD",
            Self::Other => "OTHER",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::MobileMoney => "Mobile money",
            Self::BankTransfer => "Bank transfer",
            Self::Card => "Card",
            Self::Other => "Other",
        }
    }
}

/// How often installments fall due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "installment_frequency", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentFrequency {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
}

impl InstallmentFrequency {
    pub const ALL: [Self; 3] = [Self::Weekly, Self::Biweekly, Self::Monthly];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Biweekly => "BIWEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::Biweekly => "Every two weeks",
            Self::Monthly => "Monthly",
        }
    }
}

/// Role a user holds inside a business or shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "membership_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    /// Manages every shop of a business.
    BusinessAdmin,
    /// Manages one shop and confirms its payments.
    ShopAdmin,
    /// Visits assigned customers and records payments.
    Collector,
}

impl MembershipRole {
    /// Whether memberships with this role must point at a shop.
    #[must_use]
    pub const fn is_shop_scoped(&self) -> bool {
        matches!(self, Self::ShopAdmin | Self::Collector)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "Business admin",
            Self::ShopAdmin => "Shop admin",
            Self::Collector => "Collector",
        }
    }
}

/// Error returned when a status string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

macro_rules! impl_wire_name {
    ($ty:ident, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .into_iter()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

impl_wire_name!(PurchaseStatus, "purchase status");
impl_wire_name!(PaymentStatus, "payment status");
impl_wire_name!(PaymentMethod, "payment method");
impl_wire_name!(InstallmentFrequency, "installment frequency");

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusinessAdmin => write!(f, "business_admin"),
            Self::ShopAdmin => write!(f, "shop_admin"),
            Self::Collector => write!(f, "collector"),
        }
    }
}

impl FromStr for MembershipRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business_admin" => Ok(Self::BusinessAdmin),
            "shop_admin" => Ok(Self::ShopAdmin),
            "collector" => Ok(Self::Collector),
            _ => Err(ParseStatusError {
                kind: "membership role",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PurchaseStatus::Overdue).unwrap(),
            "\"OVERDUE\""
        );
        assert_eq!("completed".parse::<PurchaseStatus>().unwrap(), PurchaseStatus::Completed);
        assert!("closed".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn test_payment_method_multiword() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::MobileMoney).unwrap(),
            "\"MOBILE_MONEY\""
        );
        assert_eq!(
            "BANK_TRANSFER".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
    }

    #[test]
    fn test_open_statuses() {
        assert!(PurchaseStatus::Pending.is_open());
        assert!(PurchaseStatus::Overdue.is_open());
        assert!(!PurchaseStatus::Completed.is_open());
        assert!(!PurchaseStatus::Defaulted.is_open());
    }

    #[test]
    fn test_membership_role_roundtrip() {
        for role in [
            MembershipRole::BusinessAdmin,
            MembershipRole::ShopAdmin,
            MembershipRole::Collector,
        ] {
            assert_eq!(role.to_string().parse::<MembershipRole>().unwrap(), role);
        }
        assert!(MembershipRole::Collector.is_shop_scoped());
        assert!(!MembershipRole::BusinessAdmin.is_shop_scoped());
    }

    #[test]
    fn test_parse_error_message() {
        let err = "later".parse::<PaymentStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid payment status: later");
    }
}
