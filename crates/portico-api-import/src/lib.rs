//! Portico HTTP surface: credential upload and bulk user import.
//!
//! This crate provides the REST endpoints:
//! - `POST /api/store-service-account` — store a project's service-account
//!   JSON credentials on disk.
//! - `POST /api/import-users` — parse an uploaded CSV into user records,
//!   partition into 1000-row batches, and submit them sequentially to the
//!   project's identity store.
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_api_import::{api_router, ImportApiState};
//!
//! let state = ImportApiState::new(registry, uploads_dir, default_hash);
//! let app = api_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::ApiError;
pub use router::{api_router, ImportApiState};
