//! Smoke tests against a deployed server.
//!
//! Run with: `HP_BASE_URL=https://... cargo test -p hire-purchase-integration-tests --test smoke -- --ignored`

use reqwest::{Client, StatusCode, redirect::Policy};

fn base_url() -> String {
    std::env::var("HP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn client() -> Client {
    Client::builder()
        .redirect(Policy::none())
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires a running server"]
async fn test_server_is_ready() {
    let resp = client()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a running server"]
async fn test_portals_require_sign_in() {
    let client = client();
    for portal in ["business-admin", "shop-admin", "collector"] {
        let resp = client
            .get(format!("{}/{portal}", base_url()))
            .send()
            .await
            .expect("Failed to reach server");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{portal}");
        let location = resp.headers()["location"].to_str().unwrap().to_string();
        assert_eq!(location, format!("/{portal}/login"));
    }
}
