//! Hire Purchase server library.
//!
//! Three portals share one process and one database:
//!
//! - **Business admin**: shops, shop staff and cross-shop payment reports
//! - **Shop admin**: products, customers, purchases and payment confirmation
//! - **Collector**: assigned customers and field collections
//!
//! Pages are server-rendered with Askama; mutations go through small JSON
//! endpoints under `/api/*` that answer with [`hire_purchase_core::ActionResult`].
//! Every query is scoped by the business or shop of the signed-in user.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use app::build_router;
