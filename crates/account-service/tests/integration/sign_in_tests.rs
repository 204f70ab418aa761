//! E2E tests for sign-in, token contents and sign-out.

use account_service::models::Role;
use account_service::services::token_service::TokenIssuer;
use account_test_utils::*;
use common::jwt::TokenVerifier;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

fn verifier() -> TokenVerifier {
    TokenVerifier::new(TEST_JWT_SECRET.as_bytes(), TEST_JWT_ISSUER, TEST_JWT_AUDIENCE)
}

#[tokio::test]
async fn test_sign_in_happy_path_returns_bearer_token() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let account = server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signin", server.url()))
        .json(&json!({ "email": TEST_EMAIL_ALICE, "password": TEST_PASSWORD }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 1200);

    let token = body["access_token"].as_str().unwrap_or_default().to_string();
    token
        .assert_valid_jwt()
        .assert_has_role("Pilot")
        .assert_for_email(TEST_EMAIL_ALICE)
        .assert_for_user(&account.user_id.to_string())
        .assert_expires_in(20 * 60);

    let claims = verifier().verify(&token)?;
    assert_eq!(claims.iss, TEST_JWT_ISSUER);
    assert_eq!(claims.aud, TEST_JWT_AUDIENCE);
    Ok(())
}

#[tokio::test]
async fn test_sign_in_email_is_case_insensitive() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let token = server.sign_in("Alice@X.com", TEST_PASSWORD).await?;
    token.assert_has_role("Pilot");
    Ok(())
}

#[tokio::test]
async fn test_sign_in_failures_are_indistinguishable() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let attempt = |email: &'static str, password: &'static str| {
        let request = server
            .client()
            .post(format!("{}/api/v1/account/signin", server.url()))
            .json(&json!({ "email": email, "password": password }));
        async move {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, anyhow::Error>((status, body))
        }
    };

    let (wrong_status, wrong_body) = attempt(TEST_EMAIL_ALICE, "Wrong1!!").await?;
    let (unknown_status, unknown_body) = attempt("nobody@x.com", TEST_PASSWORD).await?;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert!(wrong_body.contains("Sign-in failed. The email or password is incorrect."));
    Ok(())
}

#[tokio::test]
async fn test_sign_out_with_token_returns_no_content() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    server.register_pilot(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;
    let token = server.sign_in(TEST_EMAIL_ALICE, TEST_PASSWORD).await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signout", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Tokens are not revoked by sign-out.
    assert!(verifier().verify(&token).is_ok());
    Ok(())
}

#[tokio::test]
async fn test_sign_out_without_token_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signout", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn test_protected_route_rejects_expired_token() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let issued_at = chrono::Utc::now().timestamp() - 21 * 60;
    let token = TokenIssuer::new(TEST_JWT_SECRET.as_bytes(), TEST_JWT_ISSUER, TEST_JWT_AUDIENCE)
        .issue(TEST_EMAIL_ALICE, TEST_USER_ALICE, [Role::Owner], issued_at)?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signout", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_protected_route_rejects_foreign_signature() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;
    let token = TokenIssuer::new(
        b"some-other-secret-some-other-secret-0000",
        TEST_JWT_ISSUER,
        TEST_JWT_AUDIENCE,
    )
    .issue(
        TEST_EMAIL_ALICE,
        Uuid::new_v4(),
        [Role::Owner],
        chrono::Utc::now().timestamp(),
    )?;

    let response = server
        .client()
        .post(format!("{}/api/v1/account/signout", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
