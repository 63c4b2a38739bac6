//! Credential storage and identity-platform access for Portico.
//!
//! This crate owns everything below the HTTP surface:
//! - [`credentials::CredentialStore`] — one service-account JSON file per
//!   project identifier, stored on disk.
//! - [`session::SessionRegistry`] — one authenticated client per project,
//!   built lazily and reused for the process lifetime.
//! - [`client::IdentityClient`] — the batch user-import primitive, with a
//!   REST implementation speaking the `accounts:batchCreate` wire format.

pub mod client;
pub mod credentials;
pub mod error;
pub mod service_account;
pub mod session;
pub mod token;

pub use client::{BatchOutcome, IdentityClient, ImportUser, PasswordHashConfig, RestIdentityClient, RowFailure};
pub use credentials::CredentialStore;
pub use error::IdentityError;
pub use service_account::ServiceAccountKey;
pub use session::SessionRegistry;
pub use token::{ServiceAccountTokenProvider, StaticTokenProvider, TokenProvider};
