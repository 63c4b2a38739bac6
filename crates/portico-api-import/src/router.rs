//! Router and shared state for the import API.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use portico_identity::{PasswordHashConfig, SessionRegistry};

use crate::handlers;

/// Body limit covering the larger (10 MiB CSV) endpoint plus multipart
/// framing; per-file limits are enforced in the handlers.
const MAX_BODY_SIZE: usize = 12 * 1024 * 1024;

/// Shared state for the import API routes.
#[derive(Clone)]
pub struct ImportApiState {
    /// Session registry (and, through it, the credential store).
    pub registry: Arc<SessionRegistry>,
    /// Directory uploaded CSVs are staged under.
    pub uploads_dir: PathBuf,
    /// Password-hash defaults; requests may override per upload.
    pub default_hash: PasswordHashConfig,
}

impl ImportApiState {
    /// Create the API state.
    pub fn new(
        registry: Arc<SessionRegistry>,
        uploads_dir: impl Into<PathBuf>,
        default_hash: PasswordHashConfig,
    ) -> Self {
        Self {
            registry,
            uploads_dir: uploads_dir.into(),
            default_hash,
        }
    }
}

/// Create the API router.
///
/// - `POST /api/store-service-account` — store project credentials
/// - `POST /api/import-users`          — bulk-import users from CSV
/// - `GET  /health`                    — liveness probe
pub fn api_router(state: ImportApiState) -> Router {
    Router::new()
        .route(
            "/api/store-service-account",
            post(handlers::credentials::store_service_account),
        )
        .route("/api/import-users", post(handlers::import::import_users))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
