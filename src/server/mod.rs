//! HTTP surface of the prediction backend
//!
//! Every failure is converted into a `{"error": message}` envelope at the
//! request boundary; no request error takes the process down.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

pub use error::{ApiError, ApiResult};
pub use extract::AuthUser;

use crate::classifier::load_classifier;
use crate::config::Config;
use crate::error::{PlantGuardError, Result};
use crate::prediction::{PredictionHandler, TreatmentCatalog};
use crate::storage::SqliteStorage;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared, read-only state for all requests
#[derive(Clone)]
pub struct AppState {
    /// Prediction pipeline with the classifier loaded once at startup
    pub handler: PredictionHandler,
    /// Account, session and history store
    pub storage: SqliteStorage,
    /// Effective configuration
    pub settings: Arc<Config>,
}

impl AppState {
    /// Assemble state from already-built parts
    pub fn new(handler: PredictionHandler, storage: SqliteStorage, settings: Config) -> Self {
        Self {
            handler,
            storage,
            settings: Arc::new(settings),
        }
    }

    /// Load the classifier, treatment catalog and database from configuration
    ///
    /// A classifier that fails to load does not stop startup: `/predict`
    /// then answers with an inference error.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        let classifier = load_classifier(&config.classifier);
        let catalog = TreatmentCatalog::load_or_empty(config.classifier.treatments_path.as_deref());
        let storage = SqliteStorage::new(&config.storage)?;
        Ok(Self::new(
            PredictionHandler::new(classifier, catalog),
            storage,
            config.clone(),
        ))
    }

    /// Returns `true` if browsers at `origin` may call the API
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.settings
            .server
            .frontend_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.trim_end_matches('/') == origin)
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.server.body_limit_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route(
            "/history",
            get(handlers::list_history).post(handlers::save_history),
        )
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::cors,
        ))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .with_state(state)
}

/// Run blocking work (SQLite, hashing) off the async runtime
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PlantGuardError::Store(format!("blocking task failed: {}", e)))?
}

/// Serve until Ctrl-C
///
/// # Errors
///
/// Returns error if state cannot be built or the address cannot be bound
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("PlantGuard backend listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("PlantGuard backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining requests");
}
