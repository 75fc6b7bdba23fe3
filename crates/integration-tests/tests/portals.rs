//! Routing, session gating and response headers.
//!
//! These requests are answered before any query runs, so no database is
//! needed.

use axum::http::StatusCode;
use serde_json::json;

use hire_purchase_core::{BusinessId, MembershipId, MembershipRole, ShopId, UserId};
use hire_purchase_integration_tests::{
    body_json, body_text, get, location, offline_state, post_json, send,
};
use hire_purchase_server::models::{Portal, PortalSession};

fn shop_admin_session() -> PortalSession {
    PortalSession {
        user_id: UserId::new(1),
        membership_id: MembershipId::new(2),
        business_id: BusinessId::new(3),
        shop_id: Some(ShopId::new(4)),
        role: MembershipRole::ShopAdmin,
        name: "Manager".to_string(),
    }
}

#[tokio::test]
async fn test_health() {
    let state = offline_state();
    let response = send(&state, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let state = offline_state();
    let response = send(&state, get("/health/ready", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_home_lists_portals() {
    let state = offline_state();
    let response = send(&state, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    for portal in Portal::ALL {
        assert!(html.contains(portal.login_path()), "missing {}", portal.login_path());
    }
}

#[tokio::test]
async fn test_pages_redirect_to_their_portal_login() {
    let state = offline_state();
    for (path, login) in [
        ("/business-admin", "/business-admin/login"),
        ("/business-admin/shops", "/business-admin/login"),
        ("/shop-admin/purchases", "/shop-admin/login"),
        ("/shop-admin/payments/7/receipt", "/shop-admin/login"),
        ("/collector/customers", "/collector/login"),
    ] {
        let response = send(&state, get(path, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), Some(login), "{path}");
    }
}

#[tokio::test]
async fn test_actions_answer_401_json_without_session() {
    let state = offline_state();
    let body = json!({ "purchase_id": 1, "amount": "500" });

    for path in [
        "/api/collector/payments",
        "/api/shop-admin/payments",
        "/api/shop-admin/payments/3/confirm",
        "/api/business-admin/shops",
    ] {
        let response = send(&state, post_json(path, &body, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
        let result = body_json(response).await;
        assert_eq!(result["success"], false, "{path}");
        assert!(result["error"].is_string(), "{path}");
    }
}

#[tokio::test]
async fn test_token_of_another_role_is_not_accepted() {
    let state = offline_state();
    let token = state.tokens().issue(&shop_admin_session()).unwrap();

    // A shop admin token placed in the collector cookie.
    let cookie = format!("{}={token}", Portal::Collector.cookie_name());
    let response = send(&state, get("/collector", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/collector/login"));
}

#[tokio::test]
async fn test_tampered_token_is_not_accepted() {
    let state = offline_state();
    let token = state.tokens().issue(&shop_admin_session()).unwrap();
    let cookie = format!("{}={token}x", Portal::ShopAdmin.cookie_name());

    let response = send(&state, get("/shop-admin", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/shop-admin/login"));
}

#[tokio::test]
async fn test_login_page_posts_to_its_portal() {
    let state = offline_state();
    let response = send(&state, get("/collector/login?error=credentials", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"action="/collector/login""#));
    assert!(html.contains("Invalid email or password."));
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let state = offline_state();
    let request = axum::http::Request::post("/shop-admin/logout")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&state, request).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/shop-admin/login?success=logout"));
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("shop_admin_token="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let state = offline_state();
    let request = axum::http::Request::get("/health")
        .header("x-request-id", "abc123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&state, request).await;

    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(
        headers["content-security-policy"]
            .to_str()
            .unwrap()
            .contains("script-src 'self'")
    );
    assert_eq!(headers["x-request-id"], "abc123");
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let state = offline_state();
    for path in ["/static/app.css", "/static/app.js"] {
        let response = send(&state, get(path, None)).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}
