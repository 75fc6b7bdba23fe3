//! Test harness for the Hire Purchase portals.
//!
//! # Running Tests
//!
//! ```bash
//! # Router tests; no database needed
//! cargo test -p hire-purchase-integration-tests
//!
//! # Database-backed flows (migrations are applied automatically)
//! TEST_DATABASE_URL=postgres://localhost/hire_purchase_test \
//!     cargo test -p hire-purchase-integration-tests -- --ignored
//! ```
//!
//! Requests go straight into the router with `tower::ServiceExt::oneshot`;
//! only the smoke tests talk to a running server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use rand::Rng;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use hire_purchase_core::{CurrencyCode, CustomerId, MembershipRole, Money};
use hire_purchase_server::build_router;
use hire_purchase_server::config::{AppConfig, JwtConfig};
use hire_purchase_server::db::{
    BusinessRepository, CustomerRepository, MembershipRepository, ProductRepository,
    ShopRepository, UserRepository,
};
use hire_purchase_server::models::{
    Business, CustomerInput, Portal, Product, ProductInput, Shop, ShopInput, StaffMember,
};
use hire_purchase_server::services::{StaffInput, StaffService, auth};
use hire_purchase_server::state::AppState;

/// High-entropy signing secret used by every test.
pub const JWT_SECRET: &str = "t9Vq2Lm7Xc4Rz8Kp1Wd6Hs3Jf5Ng0Yb";

/// Password of every user a fixture creates.
pub const PASSWORD: &str = "correct-horse-battery";

/// Configuration pointing at `database_url`.
#[must_use]
pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: SecretString::from(database_url.to_string()),
        database_max_connections: 5,
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        jwt: JwtConfig {
            secret: SecretString::from(JWT_SECRET.to_string()),
            expiry_hours: 1,
            issuer: "hire-purchase-test".to_string(),
        },
        json_logs: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// State whose pool never connects; for requests that are answered before
/// any query runs.
#[must_use]
pub fn offline_state() -> AppState {
    let url = "postgres://hire_purchase@127.0.0.1:1/unreachable";
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(url)
        .expect("lazy pool");
    AppState::new(test_config(url), pool)
}

/// State backed by `TEST_DATABASE_URL`, with migrations applied.
pub async fn database_state() -> AppState {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    AppState::new(test_config(&url), pool)
}

/// Send one request through a fresh router.
pub async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
    build_router(state.clone())
        .oneshot(request)
        .await
        .expect("router is infallible")
}

/// Router for tests that send several requests.
#[must_use]
pub fn router(state: &AppState) -> Router {
    build_router(state.clone())
}

/// `GET path` with an optional `Cookie` header.
#[must_use]
pub fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `POST path` with a JSON body and an optional `Cookie` header.
#[must_use]
pub fn post_json(path: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(path).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), 4 * 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Sign in through the portal's login form and return the `Cookie` header
/// value for later requests.
pub async fn login(state: &AppState, portal: Portal, email: &str) -> String {
    let form = format!("email={}&password={PASSWORD}", email.replace('@', "%40"));
    let request = Request::post(portal.login_path())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let response = send(state, request).await;
    assert_eq!(location(&response), Some(portal.home_path()), "login failed for {email}");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie");
    set_cookie.split(';').next().unwrap().to_string()
}

/// Random suffix keeping fixtures of different runs apart.
#[must_use]
pub fn unique(label: &str) -> String {
    let n: u32 = rand::rng().random();
    format!("{label}-{n:08x}")
}

/// A business with one shop, its staff, a product and a customer.
pub struct Tenant {
    pub business: Business,
    pub shop: Shop,
    pub owner_email: String,
    pub shop_admin: StaffMember,
    pub collector: StaffMember,
    pub product: Product,
    pub customer: CustomerId,
}

impl Tenant {
    /// Create a tenant; the customer is assigned to the collector.
    pub async fn create(state: &AppState, label: &str) -> Self {
        let pool = state.pool();
        let slug = unique(label);
        let business = BusinessRepository::new(pool)
            .create(&format!("{label} Ltd"), &slug, &CurrencyCode::parse("KES").unwrap())
            .await
            .unwrap();

        let owner_email = format!("owner@{slug}.test");
        let (owner, _) = auth::find_or_create_user(
            &UserRepository::new(pool),
            &owner_email,
            "Owner",
            None,
            PASSWORD,
        )
        .await
        .unwrap();
        MembershipRepository::new(pool)
            .create(owner.id, business.id, None, MembershipRole::BusinessAdmin)
            .await
            .unwrap();

        let shop = ShopRepository::new(pool)
            .create(
                business.id,
                &ShopInput {
                    name: "Main Street".to_string(),
                    address: None,
                    phone: None,
                },
            )
            .await
            .unwrap();

        let staff = StaffService::new(pool);
        let shop_admin = staff
            .add(
                business.id,
                shop.id,
                MembershipRole::ShopAdmin,
                &StaffInput {
                    name: "Manager".to_string(),
                    email: format!("manager@{slug}.test"),
                    phone: None,
                    password: PASSWORD.to_string(),
                },
            )
            .await
            .unwrap();
        let collector = staff
            .add(
                business.id,
                shop.id,
                MembershipRole::Collector,
                &StaffInput {
                    name: "Collector".to_string(),
                    email: format!("collector@{slug}.test"),
                    phone: None,
                    password: PASSWORD.to_string(),
                },
            )
            .await
            .unwrap();

        let product = ProductRepository::new(pool)
            .create(
                shop.id,
                &ProductInput {
                    name: "Sofa".to_string(),
                    sku: None,
                    price: Money::from_major(12_000),
                    is_active: true,
                },
            )
            .await
            .unwrap();

        let customer = CustomerRepository::new(pool)
            .create(
                shop.id,
                &CustomerInput {
                    name: "Amina Njeri".to_string(),
                    phone: "0712 000 111".to_string(),
                    email: None,
                    address: None,
                    national_id: None,
                    notes: None,
                    collector_membership_id: Some(collector.membership_id),
                },
            )
            .await
            .unwrap();

        Self {
            business,
            shop,
            owner_email,
            shop_admin,
            collector,
            product,
            customer,
        }
    }
}
