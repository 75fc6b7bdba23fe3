//! Hire Purchase Core - Domain types and business rules.
//!
//! This crate provides the pieces shared by every hire-purchase component:
//! - `server` - Role-scoped web dashboards and JSON actions
//! - `cli` - Command-line tools for migrations, tenant bootstrap and sweeps
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Every balance mutation the server performs is computed here
//! first, so the rules can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, and status enums
//! - [`pricing`] - Turning line items and terms into a purchase quote
//! - [`schedule`] - Installment due dates and arrears
//! - [`ledger`] - Payment validation, confirmation and status derivation
//! - [`action`] - The `{success, error?, data?}` result shape returned by actions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod action;
pub mod ledger;
pub mod pricing;
pub mod schedule;
pub mod types;

pub use action::ActionResult;
pub use types::*;
