//! E2E tests for the Owner role transfer.

use account_service::models::Role;
use account_test_utils::*;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

async fn transfer(
    server: &TestAccountServer,
    token: &str,
    new_owner_id: Uuid,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(server
        .client()
        .post(format!("{}/api/v1/account/owner/transfer", server.url()))
        .bearer_auth(token)
        .json(&json!({ "new_owner_id": new_owner_id }))
        .send()
        .await?)
}

#[tokio::test]
async fn test_owner_transfer_moves_role_to_target() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let bob = server.register_pilot(TEST_EMAIL_BOB, TEST_PASSWORD).await?;
    server.grant_owner(alice.user_id).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = transfer(&server, &token, bob.user_id).await?;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(server.store().holders_of(Role::Owner).await, vec![bob.user_id]);

    // Fresh tokens reflect the new membership.
    server
        .sign_in(TEST_EMAIL_BOB, TEST_PASSWORD)
        .await?
        .assert_has_role("Owner")
        .assert_has_role("Pilot");
    server
        .sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD)
        .await?
        .assert_lacks_role("Owner")
        .assert_has_role("Admin");
    Ok(())
}

#[tokio::test]
async fn test_owner_transfer_by_non_owner_is_forbidden() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    server.register_pilot(TEST_EMAIL_BOB, TEST_PASSWORD).await?;
    let carol = server.register_pilot(TEST_EMAIL_CAROL, TEST_PASSWORD).await?;
    server.grant_owner(alice.user_id).await?;
    let bob_token = server.sign_in(TEST_EMAIL_BOB, TEST_PASSWORD).await?;

    let response = transfer(&server, &bob_token, carol.user_id).await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(server.store().holders_of(Role::Owner).await, vec![alice.user_id]);
    Ok(())
}

#[tokio::test]
async fn test_owner_transfer_to_missing_user_keeps_owner() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    server.grant_owner(alice.user_id).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = transfer(&server, &token, TEST_USER_MISSING).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.store().holders_of(Role::Owner).await, vec![alice.user_id]);
    Ok(())
}

/// A token issued before a transfer still carries Owner, but the transfer
/// checks current membership, so the stale token cannot move the role again.
#[tokio::test]
async fn test_owner_transfer_with_stale_token_is_forbidden() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let alice = server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let bob = server.register_pilot(TEST_EMAIL_BOB, TEST_PASSWORD).await?;
    let carol = server.register_pilot(TEST_EMAIL_CAROL, TEST_PASSWORD).await?;
    server.grant_owner(alice.user_id).await?;
    let stale = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    assert_eq!(
        transfer(&server, &stale, bob.user_id).await?.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        transfer(&server, &stale, carol.user_id).await?.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(server.store().holders_of(Role::Owner).await, vec![bob.user_id]);
    Ok(())
}

#[tokio::test]
async fn test_owner_transfer_concurrent_requests_leave_single_owner() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let owner = server.register_admin(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    server.grant_owner(owner.user_id).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let mut targets = Vec::new();
    for i in 0..6 {
        let account = server
            .register_pilot(&format!("pilot{i}@x.com"), TEST_PASSWORD)
            .await?;
        targets.push(account.user_id);
    }

    let responses = futures::future::join_all(
        targets
            .iter()
            .map(|target| transfer(&server, &token, *target)),
    )
    .await;

    let mut accepted = 0;
    for response in responses {
        match response?.status() {
            StatusCode::NO_CONTENT => accepted += 1,
            StatusCode::FORBIDDEN => {}
            other => anyhow::bail!("unexpected status {}", other),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(server.store().holders_of(Role::Owner).await.len(), 1);
    Ok(())
}
