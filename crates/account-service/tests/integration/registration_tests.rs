//! E2E tests for account registration.
//!
//! ## Test Naming
//!
//! Tests follow the convention: `test_<feature>_<scenario>_<expected_result>`

use account_service::models::Role;
use account_service::repositories::CredentialStore;
use account_test_utils::*;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::BTreeSet;

fn signup_body(email: &str, password: &str) -> serde_json::Value {
    json!({
        "display_name": "Alice",
        "email": email,
        "phone": "555-0100",
        "password": password,
    })
}

#[tokio::test]
async fn test_register_pilot_happy_path() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signup/pilot", server.url()))
        .json(&signup_body(TEST_EMAIL_ALICE, TEST_PASSWORD))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["email"], TEST_EMAIL_ALICE);
    assert_eq!(body["display_name"], "Alice");
    assert_eq!(body["roles"], json!(["Pilot"]));
    assert!(body.get("password_hash").is_none());

    let user_id: uuid::Uuid = body["user_id"].as_str().unwrap_or_default().parse()?;
    assert_eq!(
        server.store().get_roles(user_id).await?,
        BTreeSet::from([Role::Pilot])
    );
    Ok(())
}

#[tokio::test]
async fn test_register_admin_grants_admin_role() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let account = server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    assert_eq!(account.roles, vec![Role::Admin]);
    server
        .sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?
        .assert_has_role("Admin")
        .assert_lacks_role("Pilot");
    Ok(())
}

#[tokio::test]
async fn test_register_duplicate_email_returns_validation_failure() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signup/admin", server.url()))
        .json(&signup_body("ALICE@x.com", "Another2@"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(body["error"]["failures"][0]["code"], "DuplicateEmail");
    assert_eq!(server.store().user_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_register_weak_password_lists_every_failure() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signup/pilot", server.url()))
        .json(&signup_body(TEST_EMAIL_ALICE, "short"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    let codes: Vec<&str> = body["error"]["failures"]
        .as_array()
        .map(|failures| failures.iter().filter_map(|f| f["code"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(
        codes,
        [
            "PasswordTooShort",
            "PasswordRequiresDigit",
            "PasswordRequiresUpper",
            "PasswordRequiresNonAlphanumeric"
        ]
    );
    assert_eq!(server.store().user_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_register_invalid_email_rejected() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signup/pilot", server.url()))
        .json(&signup_body("not-an-email", TEST_PASSWORD))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["failures"][0]["code"], "InvalidEmail");
    Ok(())
}

#[tokio::test]
async fn test_register_malformed_body_rejected() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signup/pilot", server.url()))
        .json(&json!({ "email": TEST_EMAIL_ALICE }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());
    assert_eq!(server.store().user_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_register_non_json_body_uses_error_envelope() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signup/admin", server.url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(server.store().user_count().await, 0);
    Ok(())
}
