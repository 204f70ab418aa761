//! E2E tests for profile updates, account lookup and deletion.

use account_service::models::Role;
use account_test_utils::*;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

fn users_url(server: &TestAccountServer, user_id: Uuid) -> String {
    format!("{}/api/v1/account/users/{}", server.url(), user_id)
}

fn profile(email: &str) -> serde_json::Value {
    json!({
        "display_name": "Alice Nguyen",
        "email": email,
        "phone": "555-0199",
    })
}

#[tokio::test]
async fn test_update_profile_self_overwrites_fields() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .put(users_url(&server, alice.user_id))
        .bearer_auth(&token)
        .json(&profile("alice@y.com"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["display_name"], "Alice Nguyen");
    assert_eq!(body["email"], "alice@y.com");
    assert_eq!(body["phone"], "555-0199");
    assert_eq!(body["roles"], json!(["Pilot"]));

    server
        .sign_in("alice@y.com", TEST_PASSWORD)
        .await?
        .assert_for_email("alice@y.com");
    Ok(())
}

#[tokio::test]
async fn test_update_profile_other_account_as_pilot_is_forbidden() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    server.register_pilot(TEST_EMAIL_BOB, TEST_PASSWORD).await?;
    let bob_token = server.sign_in(TEST_EMAIL_BOB, TEST_PASSWORD).await?;

    let response = server
        .client()
        .put(users_url(&server, alice.user_id))
        .bearer_auth(&bob_token)
        .json(&profile("hijack@x.com"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_update_profile_missing_user_as_admin_is_not_found() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .put(users_url(&server, TEST_USER_MISSING))
        .bearer_auth(&token)
        .json(&profile("ghost@x.com"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_get_account_returns_roles() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    server.grant_owner(alice.user_id).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .get(users_url(&server, alice.user_id))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["roles"], json!(["Admin", "Owner"]));
    Ok(())
}

#[tokio::test]
async fn test_delete_account_by_admin_removes_user() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let bob = server.register_pilot(TEST_EMAIL_BOB, TEST_PASSWORD).await?;
    let admin_token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .delete(users_url(&server, bob.user_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(server.store().holders_of(Role::Pilot).await.is_empty());
    assert!(server.sign_in(TEST_EMAIL_BOB, TEST_PASSWORD).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_delete_account_twice_returns_not_found() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let first = server
        .client()
        .delete(users_url(&server, alice.user_id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    // The token outlives the account it was issued for.
    let second = server
        .client()
        .delete(users_url(&server, alice.user_id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.store().user_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_users_route_rejects_non_uuid_path() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .delete(format!("{}/api/v1/account/users/not-a-uuid", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn test_delete_owner_account_by_admin_is_conflict() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let owner = server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    server.grant_owner(owner.user_id).await?;

    // Admin signup is open, so any caller can get here.
    server.register_admin(TEST_EMAIL_BOB, TEST_PASSWORD).await?;
    let admin_token = server.sign_in(TEST_EMAIL_BOB, TEST_PASSWORD).await?;

    let response = server
        .client()
        .delete(users_url(&server, owner.user_id))
        .bearer_auth(&admin_token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(
        server.store().holders_of(Role::Owner).await,
        vec![owner.user_id]
    );
    Ok(())
}
