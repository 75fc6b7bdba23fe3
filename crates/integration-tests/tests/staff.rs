//! Staff accounts and portal sign-in against a real database.
//!
//! Run with `TEST_DATABASE_URL=... cargo test -p hire-purchase-integration-tests -- --ignored`.

use axum::body::Body;
use axum::http::{Request, header};

use hire_purchase_core::MembershipRole;
use hire_purchase_integration_tests::{PASSWORD, Tenant, database_state, location, login, send};
use hire_purchase_server::models::Portal;
use hire_purchase_server::services::{ServiceError, StaffInput, StaffService};
use hire_purchase_server::state::AppState;

fn staff_input(email: &str, password: &str) -> StaffInput {
    StaffInput {
        name: "Reused".to_string(),
        email: email.to_string(),
        phone: None,
        password: password.to_string(),
    }
}

async fn submit_login(state: &AppState, portal: Portal, email: &str, password: &str) -> Option<String> {
    let form = format!("email={}&password={password}", email.replace('@', "%40"));
    let request = Request::post(portal.login_path())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let response = send(state, request).await;
    location(&response).map(String::from)
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_staff_accounts_stay_within_their_business() {
    let state = database_state().await;
    let first = Tenant::create(&state, "home").await;
    let second = Tenant::create(&state, "other").await;
    let staff = StaffService::new(state.pool());

    // Another business cannot attach itself to an existing account.
    let result = staff
        .add(
            second.business.id,
            second.shop.id,
            MembershipRole::ShopAdmin,
            &staff_input(first.collector.email.as_str(), "attacker-chosen-password"),
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
    assert_eq!(
        submit_login(&state, Portal::ShopAdmin, first.collector.email.as_str(), PASSWORD).await,
        Some(format!("{}?error=access", Portal::ShopAdmin.login_path()))
    );

    // Within the same business the account is reused and keeps its password.
    let added = staff
        .add(
            first.business.id,
            first.shop.id,
            MembershipRole::ShopAdmin,
            &staff_input(first.collector.email.as_str(), "ignored-for-existing"),
        )
        .await
        .unwrap();
    assert_eq!(added.user_id, first.collector.user_id);
    login(&state, Portal::ShopAdmin, first.collector.email.as_str()).await;
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_unknown_email_fails_like_a_wrong_password() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "signin").await;
    let expected = Some(format!("{}?error=credentials", Portal::Collector.login_path()));

    assert_eq!(
        submit_login(&state, Portal::Collector, tenant.collector.email.as_str(), "wrong-password").await,
        expected
    );
    assert_eq!(
        submit_login(&state, Portal::Collector, "nobody@unknown.test", PASSWORD).await,
        expected
    );
}
