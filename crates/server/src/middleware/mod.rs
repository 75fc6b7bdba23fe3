//! HTTP middleware for the portals.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, attach request data)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and referrer policies)
//!
//! Portal sessions are checked per handler by the extractors in [`auth`].

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{
    BusinessContext, PortalRejection, RequireBusinessAdmin, RequireCollector, RequireShopAdmin,
    ShopContext, clear_session_cookie, session_cookie,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
