//! Bearer authentication for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it with
//! the shared [`TokenVerifier`] and injects a [`Principal`] into request
//! extensions.

use crate::errors::AcError;
use crate::models::{Principal, Role};
use crate::observability::metrics::record_token_validation;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::jwt::{AccessClaims, TokenVerifier};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: TokenVerifier,
}

/// Reject requests without a valid access token.
///
/// # Response
///
/// - 401 if the header is missing, malformed, or the token fails verification
/// - Otherwise continues with the [`Principal`] in extensions
#[instrument(skip_all, name = "ac.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AcError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "ac.middleware.auth", "Missing Authorization header");
            AcError::InvalidToken("Missing Authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "ac.middleware.auth", "Invalid Authorization header format");
        AcError::InvalidToken("Invalid Authorization header format".to_string())
    })?;

    let claims = state.verifier.verify(token).map_err(|e| {
        record_token_validation("error", Some(e.as_label()));
        tracing::debug!(target: "ac.middleware.auth", reason = e.as_label(), "Token rejected");
        AcError::InvalidToken(e.to_string())
    })?;

    let principal = principal_from_claims(&claims)?;
    record_token_validation("success", None);

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Build a principal from verified claims.
///
/// Role names this service does not know are dropped.
pub fn principal_from_claims(claims: &AccessClaims) -> Result<Principal, AcError> {
    let user_id = Uuid::parse_str(&claims.user_id).map_err(|_| {
        record_token_validation("error", Some("invalid"));
        AcError::InvalidToken("The access token is invalid or expired".to_string())
    })?;

    let roles: BTreeSet<Role> = claims
        .roles
        .iter()
        .filter_map(|name| match name.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::debug!(target: "ac.middleware.auth", role = name, "Ignoring unknown role");
                None
            }
        })
        .collect();

    Ok(Principal {
        user_id,
        email: claims.email.clone(),
        roles,
    })
}
