//! HTTP routes for the account service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::account_service::AccountManager;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common::jwt::TokenVerifier;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account operations over the configured credential store.
    pub manager: Arc<AccountManager>,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics` - operational, unversioned, public
/// - `/api/v1/account/signup/{admin,pilot}`, `/api/v1/account/signin` - public
/// - `/api/v1/account/signout`, `/api/v1/account/owner/transfer`,
///   `/api/v1/account/users/:id` - bearer token required
///
/// Global layers: request tracing, 30 second timeout, permissive CORS and
/// HTTP metrics (outermost).
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        verifier: TokenVerifier::new(
            state.config.jwt_secret_bytes(),
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        ),
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/v1/account/signup/admin", post(handlers::signup_admin))
        .route("/api/v1/account/signup/pilot", post(handlers::signup_pilot))
        .route("/api/v1/account/signin", post(handlers::sign_in))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/v1/account/signout", post(handlers::sign_out))
        .route(
            "/api/v1/account/owner/transfer",
            post(handlers::transfer_owner),
        )
        .route(
            "/api/v1/account/users/:id",
            get(handlers::get_account)
                .put(handlers::update_profile)
                .delete(handlers::delete_account),
        )
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. CorsLayer
    // 2. TimeoutLayer
    // 3. TraceLayer
    // 4. http_metrics_middleware (outermost, sees every response)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
