//! End-to-end purchase and payment flows against a real database.
//!
//! Run with `TEST_DATABASE_URL=... cargo test -p hire-purchase-integration-tests -- --ignored`.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use hire_purchase_core::{CustomerId, MembershipRole, Money, PurchaseId, PurchaseStatus};
use hire_purchase_integration_tests::{
    Tenant, body_json, body_text, database_state, get, login, post_json, send,
};
use hire_purchase_server::db::{CustomerRepository, PurchaseRepository};
use hire_purchase_server::models::{CustomerInput, Portal};
use hire_purchase_server::services::{PurchaseService, StaffInput, StaffService};
use hire_purchase_server::state::AppState;

async fn create_purchase(state: &AppState, tenant: &Tenant, cookie: &str, first_due: &str) -> Value {
    create_purchase_for(state, tenant, tenant.customer, cookie, first_due).await
}

async fn create_purchase_for(
    state: &AppState,
    tenant: &Tenant,
    customer: CustomerId,
    cookie: &str,
    first_due: &str,
) -> Value {
    let body = json!({
        "customer_id": customer.as_i32(),
        "items": [{ "product_id": tenant.product.id.as_i32(), "quantity": 1 }],
        "down_payment": "2000",
        "interest_rate": "10",
        "installments": 4,
        "frequency": "MONTHLY",
        "first_due_date": first_due,
    });
    let response = send(state, post_json("/api/shop-admin/purchases", &body, Some(cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["success"], true, "{result}");
    result["data"].clone()
}

fn money(value: &Value) -> Money {
    value.as_str().unwrap().parse().unwrap()
}

fn purchase_id(purchase: &Value) -> PurchaseId {
    PurchaseId::new(i32::try_from(purchase["id"].as_i64().unwrap()).unwrap())
}

async fn record(state: &AppState, cookie: &str, body: &Value) -> (StatusCode, Value) {
    let response = send(state, post_json("/api/collector/payments", body, Some(cookie))).await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn decide(state: &AppState, cookie: &str, payment_id: i64, decision: &str) -> (StatusCode, Value) {
    let body = if decision == "reject" {
        json!({ "reason": "Cash not received" })
    } else {
        json!({})
    };
    let response = send(
        state,
        post_json(&format!("/api/shop-admin/payments/{payment_id}/{decision}"), &body, Some(cookie)),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn outstanding(state: &AppState, tenant: &Tenant, id: PurchaseId) -> Money {
    PurchaseRepository::new(state.pool())
        .get_in_shop(tenant.shop.id, id)
        .await
        .unwrap()
        .unwrap()
        .outstanding
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_collector_payment_moves_balance_only_after_confirmation() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "flow").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;
    let collector = login(&state, Portal::Collector, tenant.collector.email.as_str()).await;

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let purchase = create_purchase(&state, &tenant, &admin, &due).await;
    let purchase_id = purchase["id"].as_i64().unwrap();
    // 10% interest on the 10,000 financed after the down payment.
    assert_eq!(money(&purchase["total"]), Money::from_major(13_000));
    assert_eq!(money(&purchase["outstanding"]), Money::from_major(11_000));
    assert_eq!(purchase["status"], "ACTIVE");

    let response = send(
        &state,
        post_json(
            "/api/collector/payments",
            &json!({ "purchase_id": purchase_id, "amount": "2800", "method": "MOBILE_MONEY" }),
            Some(&collector),
        ),
    )
    .await;
    let recorded = body_json(response).await;
    assert_eq!(recorded["success"], true, "{recorded}");
    assert_eq!(recorded["data"]["status"], "PENDING");
    let payment_id = recorded["data"]["id"].as_i64().unwrap();

    let repo = PurchaseRepository::new(state.pool());
    let id = hire_purchase_core::PurchaseId::new(i32::try_from(purchase_id).unwrap());
    let before = repo.get_in_shop(tenant.shop.id, id).await.unwrap().unwrap();
    assert_eq!(before.outstanding, Money::from_major(11_000));

    let response = send(
        &state,
        post_json(&format!("/api/shop-admin/payments/{payment_id}/confirm"), &json!({}), Some(&admin)),
    )
    .await;
    assert_eq!(body_json(response).await["success"], true);

    let after = repo.get_in_shop(tenant.shop.id, id).await.unwrap().unwrap();
    assert_eq!(after.outstanding, Money::from_major(8_200));
    assert_eq!(after.amount_paid, Money::from_major(4_800));

    // Deciding twice is refused and does not double count.
    let response = send(
        &state,
        post_json(&format!("/api/shop-admin/payments/{payment_id}/confirm"), &json!({}), Some(&admin)),
    )
    .await;
    assert!(!response.status().is_success());
    assert_eq!(body_json(response).await["success"], false);
    let again = repo.get_in_shop(tenant.shop.id, id).await.unwrap().unwrap();
    assert_eq!(again.outstanding, Money::from_major(8_200));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_rejected_payment_leaves_balance_untouched() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "reject").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;
    let collector = login(&state, Portal::Collector, tenant.collector.email.as_str()).await;

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let purchase = create_purchase(&state, &tenant, &admin, &due).await;

    let recorded = body_json(
        send(
            &state,
            post_json(
                "/api/collector/payments",
                &json!({ "purchase_id": purchase["id"], "amount": "1000" }),
                Some(&collector),
            ),
        )
        .await,
    )
    .await;
    let payment_id = recorded["data"]["id"].as_i64().unwrap();

    let response = send(
        &state,
        post_json(
            &format!("/api/shop-admin/payments/{payment_id}/reject"),
            &json!({ "reason": "Cash not received" }),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(body_json(response).await["success"], true);

    let page = send(&state, get("/shop-admin/payments?status=REJECTED", Some(&admin))).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = body_text(page).await;
    assert!(html.contains("Cash not received"));

    let detail = send(&state, get(&format!("/shop-admin/purchases/{}", purchase["id"]), Some(&admin))).await;
    assert_eq!(detail.status(), StatusCode::OK);
    assert!(body_text(detail).await.contains("11,000.00"));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_shops_cannot_see_each_other() {
    let state = database_state().await;
    let first = Tenant::create(&state, "first").await;
    let second = Tenant::create(&state, "second").await;
    let first_admin = login(&state, Portal::ShopAdmin, first.shop_admin.email.as_str()).await;
    let second_admin = login(&state, Portal::ShopAdmin, second.shop_admin.email.as_str()).await;
    let second_collector = login(&state, Portal::Collector, second.collector.email.as_str()).await;

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let purchase = create_purchase(&state, &first, &first_admin, &due).await;

    let response = send(
        &state,
        get(&format!("/shop-admin/purchases/{}", purchase["id"]), Some(&second_admin)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &state,
        get(&format!("/shop-admin/customers/{}", first.customer.as_i32()), Some(&second_admin)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &state,
        post_json(
            "/api/collector/payments",
            &json!({ "purchase_id": purchase["id"], "amount": "500" }),
            Some(&second_collector),
        ),
    )
    .await;
    assert!(!response.status().is_success());
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_business_admin_sees_all_shops_payments() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "owner").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;
    let owner = login(&state, Portal::BusinessAdmin, &tenant.owner_email).await;

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let purchase = create_purchase(&state, &tenant, &admin, &due).await;

    let response = send(
        &state,
        post_json(
            "/api/shop-admin/payments",
            &json!({ "purchase_id": purchase["id"], "amount": "700", "method": "CASH" }),
            Some(&admin),
        ),
    )
    .await;
    let recorded = body_json(response).await;
    assert_eq!(recorded["data"]["status"], "COMPLETED", "{recorded}");
    let reference = recorded["data"]["reference"].as_str().unwrap().to_string();

    let page = send(&state, get("/business-admin/payments", Some(&owner))).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = body_text(page).await;
    assert!(html.contains(&reference));
    assert!(html.contains(&tenant.shop.name));

    let dashboard = send(&state, get("/business-admin", Some(&owner))).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_overdue_sweep_flags_missed_installments() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "sweep").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;

    let today = Utc::now().date_naive();
    let purchase = create_purchase(&state, &tenant, &admin, &(today - Duration::days(3)).to_string()).await;
    let id = hire_purchase_core::PurchaseId::new(i32::try_from(purchase["id"].as_i64().unwrap()).unwrap());

    let report = PurchaseService::new(state.pool()).refresh_overdue(today).await.unwrap();
    assert!(report.updated >= 1);

    let purchase = PurchaseRepository::new(state.pool())
        .get_in_shop(tenant.shop.id, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Overdue);

    // A second run finds nothing more to change for this purchase.
    PurchaseService::new(state.pool()).refresh_overdue(today).await.unwrap();
    let again = PurchaseRepository::new(state.pool())
        .get_in_shop(tenant.shop.id, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.status, PurchaseStatus::Overdue);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_pending_payments_cannot_overpay_on_confirmation() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "overpay").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;
    let collector = login(&state, Portal::Collector, tenant.collector.email.as_str()).await;

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let purchase = create_purchase(&state, &tenant, &admin, &due).await;
    let id = purchase_id(&purchase);

    // Each fits the 11,000 outstanding on its own, together they do not.
    let (_, first) = record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "6000" })).await;
    let (_, second) = record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "6000" })).await;
    assert_eq!(first["success"], true, "{first}");
    assert_eq!(second["success"], true, "{second}");

    let (status, confirmed) = decide(&state, &admin, first["data"]["id"].as_i64().unwrap(), "confirm").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["success"], true);
    assert_eq!(outstanding(&state, &tenant, id).await, Money::from_major(5_000));

    let second_id = second["data"]["id"].as_i64().unwrap();
    let (status, refused) = decide(&state, &admin, second_id, "confirm").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(refused["success"], false);
    assert_eq!(outstanding(&state, &tenant, id).await, Money::from_major(5_000));

    // The refused payment is still pending and can be rejected instead.
    let (status, rejected) = decide(&state, &admin, second_id, "reject").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["data"]["status"], "REJECTED");
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_collector_cannot_record_more_than_outstanding() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "over-balance").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;
    let collector = login(&state, Portal::Collector, tenant.collector.email.as_str()).await;

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let purchase = create_purchase(&state, &tenant, &admin, &due).await;

    let (status, result) =
        record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "20000" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(result["success"], false);

    // Sub-cent amounts round to nothing.
    let (status, result) =
        record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "0.004" })).await;
    assert!(status.is_client_error());
    assert_eq!(result["success"], false);

    // Just over the balance by less than a cent rounds to the balance.
    let (status, result) =
        record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "11000.004" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&result["data"]["amount"]), Money::from_major(11_000));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_collector_can_only_pay_for_assigned_customers() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "assigned").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;
    let collector = login(&state, Portal::Collector, tenant.collector.email.as_str()).await;
    let pool = state.pool();

    let other = StaffService::new(pool)
        .add(
            tenant.business.id,
            tenant.shop.id,
            MembershipRole::Collector,
            &StaffInput {
                name: "Second Collector".to_string(),
                email: format!("second@{}.test", tenant.business.slug),
                phone: None,
                password: hire_purchase_integration_tests::PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();

    let customers = CustomerRepository::new(pool);
    let customer = |name: &str, collector| CustomerInput {
        name: name.to_string(),
        phone: "0722 000 222".to_string(),
        email: None,
        address: None,
        national_id: None,
        notes: None,
        collector_membership_id: collector,
    };
    let unassigned = customers.create(tenant.shop.id, &customer("Unassigned", None)).await.unwrap();
    let elsewhere = customers
        .create(tenant.shop.id, &customer("Someone Else's", Some(other.membership_id)))
        .await
        .unwrap();

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    for customer in [unassigned, elsewhere] {
        let purchase = create_purchase_for(&state, &tenant, customer, &admin, &due).await;
        let (status, result) =
            record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "500" })).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{result}");
        assert_eq!(result["success"], false);
        assert_eq!(outstanding(&state, &tenant, purchase_id(&purchase)).await, Money::from_major(11_000));
    }
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL database"]
async fn test_decided_payments_cannot_be_decided_again() {
    let state = database_state().await;
    let tenant = Tenant::create(&state, "decided").await;
    let admin = login(&state, Portal::ShopAdmin, tenant.shop_admin.email.as_str()).await;
    let collector = login(&state, Portal::Collector, tenant.collector.email.as_str()).await;

    let due = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let purchase = create_purchase(&state, &tenant, &admin, &due).await;
    let id = purchase_id(&purchase);

    let (_, rejected) = record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "1000" })).await;
    let rejected_id = rejected["data"]["id"].as_i64().unwrap();
    assert_eq!(decide(&state, &admin, rejected_id, "reject").await.0, StatusCode::OK);

    let (status, result) = decide(&state, &admin, rejected_id, "confirm").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(result["success"], false);
    assert_eq!(outstanding(&state, &tenant, id).await, Money::from_major(11_000));

    let (_, confirmed) = record(&state, &collector, &json!({ "purchase_id": purchase["id"], "amount": "1000" })).await;
    let confirmed_id = confirmed["data"]["id"].as_i64().unwrap();
    assert_eq!(decide(&state, &admin, confirmed_id, "confirm").await.0, StatusCode::OK);

    let (status, result) = decide(&state, &admin, confirmed_id, "reject").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(result["success"], false);
    assert_eq!(outstanding(&state, &tenant, id).await, Money::from_major(10_000));
}
