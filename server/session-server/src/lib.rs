//! Session server
//!
//! Wires the auth gate, refresh engine and session store into an Axum
//! application according to [`ServerConfig`].

pub mod config;

pub use config::{AuthSettings, ServerConfig, SettingsError};

use anyhow::Context;
use auth_gateway::{auth_routes, AuthGate};
use auth_identity::{ensure_dev_identity, InMemoryUserDirectory, PgUserDirectory, UserDirectory};
use auth_session::{InMemorySessionStore, PgSessionStore, RefreshEngine, SessionStore, StoreBackend};
use axum::{routing::get, Json, Router};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Application state built once at startup
#[derive(Clone)]
pub struct AppState {
    pub gate: AuthGate,
    pub engine: Arc<RefreshEngine>,
}

/// Build the router serving the auth endpoints
pub fn create_app(state: &AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes(state.gate.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Select the store and directory, provision the development identity when
/// enabled, and assemble the engine and gate.
///
/// # Errors
///
/// Database connection or migration failures, or configuration the engine
/// or gate rejects.
pub async fn bootstrap(config: &ServerConfig) -> anyhow::Result<AppState> {
    let (store, directory): (Arc<dyn SessionStore>, Arc<dyn UserDirectory>) =
        match config.auth.session.backend {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory session store");
                (
                    Arc::new(InMemorySessionStore::new()),
                    Arc::new(InMemoryUserDirectory::new()),
                )
            }
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(SettingsError::MissingDatabaseUrl)?;
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .acquire_timeout(config.auth.session.store_timeout())
                    .connect(url)
                    .await
                    .context("failed to connect to the session database")?;

                let store = PgSessionStore::new(pool.clone());
                store.migrate().await.context("failed to migrate sessions table")?;
                tracing::info!("Using PostgreSQL session store");

                (Arc::new(store), Arc::new(PgUserDirectory::new(pool)))
            }
        };

    let dev_identity = if config.auth.dev_auto_login {
        let identity = ensure_dev_identity(directory.as_ref(), &config.dev_identity)
            .await
            .context("failed to provision development identity")?;
        Some(identity)
    } else {
        None
    };

    let engine = Arc::new(
        RefreshEngine::new(&config.auth.token, &config.auth.session, store, directory)
            .context("invalid token configuration")?,
    );
    let gate = AuthGate::new(Arc::clone(&engine), config.gate_config(), dev_identity)
        .context("invalid gate configuration")?;

    Ok(AppState { gate, engine })
}

/// Periodically remove expired sessions still present in the store
pub fn spawn_purge_task(engine: Arc<RefreshEngine>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            match engine.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged expired sessions"),
                Err(e) => logger_redacted::redacted_warn!("Session purge failed: {}", e),
            }
        }
    })
}
