//! Account endpoints.
//!
//! Thin transport over [`AccountManager`](crate::services::account_service::AccountManager).
//! Protected handlers read the caller's [`Principal`] from request
//! extensions, inserted by the auth middleware.

use crate::errors::AcError;
use crate::models::{
    AccountResponse, Principal, RegisterRequest, Role, Session, SignInRequest, TokenResponse,
    TransferOwnerRequest, UserProfile,
};
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;
use crate::routes::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Record a failed operation by category and status, then pass it on.
fn observe<T>(operation: &str, result: Result<T, AcError>) -> Result<T, AcError> {
    if let Err(e) = &result {
        record_error(
            operation,
            ErrorCategory::from(e).as_str(),
            e.status_code().as_u16(),
        );
    }
    result
}

/// Allow the account itself, or an Admin or Owner acting on it.
fn authorize_account_access(principal: &Principal, user_id: Uuid) -> Result<(), AcError> {
    if principal.user_id == user_id
        || principal.roles.contains(&Role::Admin)
        || principal.roles.contains(&Role::Owner)
    {
        Ok(())
    } else {
        tracing::debug!(
            target: "ac.handlers.account",
            caller = %principal.user_id,
            "Account access denied"
        );
        Err(AcError::InsufficientPermission(
            "Not allowed to manage this account".to_string(),
        ))
    }
}

async fn register(
    state: &AppState,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
    role: Role,
) -> Result<(StatusCode, Json<AccountResponse>), AcError> {
    let Json(payload) = payload?;
    let profile = UserProfile {
        display_name: payload.display_name,
        email: payload.email,
        phone: payload.phone,
    };
    let user = state
        .manager
        .register_account(profile, &payload.password, role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse::new(&user, &BTreeSet::from([role]))),
    ))
}

/// POST /api/v1/account/signup/admin
pub async fn signup_admin(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), AcError> {
    observe("register", register(&state, payload, Role::Admin).await)
}

/// POST /api/v1/account/signup/pilot
pub async fn signup_pilot(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), AcError> {
    observe("register", register(&state, payload, Role::Pilot).await)
}

/// POST /api/v1/account/signin
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AcError> {
    let Json(payload) = observe("sign_in", payload.map_err(AcError::from))?;
    let token = observe(
        "sign_in",
        state.manager.sign_in(&payload.email, &payload.password).await,
    )?;
    Ok(Json(token))
}

/// POST /api/v1/account/signout
///
/// The session lives for this request only; the bearer token itself is not
/// revoked and stays usable until it expires.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> StatusCode {
    let mut session = Session::authenticated(principal);
    state.manager.sign_out(&mut session);
    StatusCode::NO_CONTENT
}

/// POST /api/v1/account/owner/transfer
pub async fn transfer_owner(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<TransferOwnerRequest>, JsonRejection>,
) -> Result<StatusCode, AcError> {
    let Json(payload) = observe("transfer_owner", payload.map_err(AcError::from))?;
    observe(
        "transfer_owner",
        state
            .manager
            .transfer_owner_role(principal.user_id, payload.new_owner_id)
            .await,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/account/users/:id
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AccountResponse>, AcError> {
    let Path(user_id) = observe("get_account", user_id.map_err(AcError::from))?;
    authorize_account_access(&principal, user_id)?;
    let (user, roles) = observe("get_account", state.manager.account(user_id).await)?;
    Ok(Json(AccountResponse::new(&user, &roles)))
}

/// PUT /api/v1/account/users/:id
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    user_id: Result<Path<Uuid>, PathRejection>,
    profile: Result<Json<UserProfile>, JsonRejection>,
) -> Result<Json<AccountResponse>, AcError> {
    let Path(user_id) = observe("update_profile", user_id.map_err(AcError::from))?;
    observe(
        "update_profile",
        authorize_account_access(&principal, user_id),
    )?;
    let Json(profile) = observe("update_profile", profile.map_err(AcError::from))?;
    let user = observe(
        "update_profile",
        state.manager.update_profile(user_id, profile).await,
    )?;
    let (_, roles) = state.manager.account(user.user_id).await?;
    Ok(Json(AccountResponse::new(&user, &roles)))
}

/// DELETE /api/v1/account/users/:id
///
/// The current Owner cannot be deleted; Owner has to be transferred first.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AcError> {
    let Path(user_id) = observe("delete_account", user_id.map_err(AcError::from))?;
    observe(
        "delete_account",
        authorize_account_access(&principal, user_id),
    )?;
    observe(
        "delete_account",
        state.manager.delete_account(user_id).await,
    )?;
    Ok(StatusCode::NO_CONTENT)
}
