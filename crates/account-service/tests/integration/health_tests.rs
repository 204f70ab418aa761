//! Integration tests for health probes and the metrics endpoint.

use account_test_utils::TestAccountServer;
use reqwest::StatusCode;

/// The liveness probe returns 200 "OK" while the process serves requests.
#[tokio::test]
async fn test_health_endpoint_returns_ok() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

/// The readiness probe reports the credential store once roles are seeded.
#[tokio::test]
async fn test_ready_endpoint_returns_ok_when_seeded() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/ready", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["credential_store"], "healthy");
    Ok(())
}

/// The metrics endpoint is public and answers with Prometheus text.
#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

/// Unknown paths fall through to 404.
#[tokio::test]
async fn test_unknown_route_returns_not_found() -> Result<(), anyhow::Error> {
    let server = TestAccountServer::spawn().await?;

    let response = server
        .client()
        .get(format!("{}/api/v1/account/nope", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
