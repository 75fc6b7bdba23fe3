//! Business logic services.
//!
//! Services combine repositories with the rules in `hire_purchase_core`.
//! Anything that moves money runs inside a single database transaction.

pub mod auth;
pub mod error;
pub mod payments;
pub mod purchases;
pub mod references;
pub mod staff;

pub use auth::{AuthError, AuthService, TokenService};
pub use error::ServiceError;
pub use payments::{PaymentService, RecordPaymentInput};
pub use purchases::{CreatePurchaseInput, PurchaseLineInput, PurchaseService, SweepReport};
pub use staff::{StaffInput, StaffService};
