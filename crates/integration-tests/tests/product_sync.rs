//! Integration tests for the product synchronizer against the server file.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database with the development admin account
//! - The storefront running (cargo run -p bazaar-storefront)
//!
//! They replace the server product list; run them against a disposable
//! storefront. Run with: cargo test -p bazaar-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::json;

use bazaar_client::{
    AuthClient, HttpAuthApi, HttpProductRemote, ProductSync, StorageBackend, SyncError,
};
use bazaar_core::ProductId;
use bazaar_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, client_config, http_client, storefront_base_url,
};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_anonymous_write_rejected_but_local_copy_kept() {
    let config = client_config();
    let storage = StorageBackend::in_memory().open_tab();
    let sync = ProductSync::new(storage.clone(), HttpProductRemote::new(&config, storage));

    let err = sync
        .save_products(json!([{"id": 1, "name": "Mug"}]))
        .await
        .expect_err("anonymous server write should fail");
    assert!(matches!(err, SyncError::Remote(ref e) if e.is_unauthorized()));
    assert_eq!(sync.load_products().await.len(), 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_admin_round_trip_through_server_file() {
    let config = client_config();
    let backend = StorageBackend::in_memory();
    let tab = backend.open_tab();

    let auth = AuthClient::new(HttpAuthApi::new(&config), tab.clone(), &config);
    auth.login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("admin login failed");

    let sync = ProductSync::new(tab.clone(), HttpProductRemote::new(&config, tab));
    sync.save_products(json!([
        {"id": 10, "name": "Stoneware Mug", "price": "18.00"},
        {"name": "dropped: no id"},
    ]))
    .await
    .expect("admin save failed");

    let resp = http_client()
        .get(format!("{}/api/products", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);
    let server: Vec<serde_json::Value> = resp.json().await.expect("Failed to decode products");
    assert_eq!(server.len(), 1);
    assert_eq!(server[0]["id"], json!(10));

    // A fresh tab with empty local storage resolves from the server.
    let fresh = StorageBackend::in_memory().open_tab();
    let reader = ProductSync::new(fresh.clone(), HttpProductRemote::new(&config, fresh));
    let products = reader.load_products().await;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, ProductId::new(10));

    auth.logout().await;
}
