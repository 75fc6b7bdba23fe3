//! Domain models for the hire-purchase server.

pub mod business;
pub mod customer;
pub mod membership;
pub mod payment;
pub mod product;
pub mod purchase;
pub mod session;
pub mod stats;
pub mod user;

pub use business::{Business, Shop, ShopInput, ShopSummary};
pub use customer::{Customer, CustomerInput, CustomerOverview};
pub use membership::{CollectorSummary, Membership, MembershipScope, StaffMember};
pub use payment::{NewPayment, Payment, PaymentFilter, PaymentLock};
pub use product::{Product, ProductInput};
pub use purchase::{NewPurchase, NewPurchaseItem, Purchase, PurchaseDetail, PurchaseItem};
pub use session::{Portal, PortalSession, SessionClaims};
pub use stats::{
    BusinessStats, ChartSeries, CollectorStats, MonthlyTotal, ShopStats, StatsScope, StatusSlice,
};
pub use user::User;
