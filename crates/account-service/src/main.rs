//! FlightDocs account service
//!
//! Registers accounts, signs users in with HS512 access tokens and manages
//! the single Owner role.

use account_service::config::{Config, StoreBackend};
use account_service::observability::metrics::init_metrics_recorder;
use account_service::repositories::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use account_service::routes::{self, AppState};
use account_service::services::account_service::AccountManager;
use account_service::services::role_registry::seed_roles;
use account_service::services::token_service::TokenIssuer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting account service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        store_backend = ?config.store_backend,
        token_lifetime_minutes = config.token_lifetime_minutes,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let store = connect_store(&config).await?;

    // The manager cannot be built until seeding succeeds, so a failure here
    // keeps the service from ever accepting requests.
    let seeded = seed_roles(store.as_ref()).await.map_err(|e| {
        error!("Failed to seed roles: {}", e);
        e
    })?;
    info!(created = seeded.created(), "Roles seeded");

    let manager = AccountManager::new(
        store,
        TokenIssuer::from_config(&config),
        config.bcrypt_cost,
        seeded,
    );

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState {
        manager: Arc::new(manager),
        config,
    });
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Account service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Account service shutdown complete");

    Ok(())
}

async fn connect_store(
    config: &Config,
) -> Result<Arc<dyn CredentialStore>, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory credential store; accounts are lost on restart");
            Ok(Arc::new(InMemoryCredentialStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres credential store")?;

            info!("Connecting to database...");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(5))
                .connect(database_url)
                .await
                .map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })?;
            info!("Database connection established");

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    error!("Failed to run migrations: {}", e);
                    e
                })?;

            Ok(Arc::new(PgCredentialStore::new(pool)))
        }
    }
}

/// Returns when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
