//! Application configuration loaded from environment variables.
//!
//! This module provides fail-fast configuration loading with validation.
//! Invalid values cause the application to exit with a clear error message;
//! every variable has a development-friendly default.

use std::env;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,

    /// Server listen port
    pub port: u16,

    /// Directory holding per-project service-account credential files
    pub credentials_dir: PathBuf,

    /// Directory where uploaded CSV files are staged during processing
    pub uploads_dir: PathBuf,

    /// Identity platform base URL
    pub identity_endpoint: String,

    /// Hash algorithm applied to imports that do not override it
    pub password_hash_algorithm: String,

    /// Signer key bytes for the default hash algorithm (may be empty)
    pub password_signer_key: Vec<u8>,

    /// Tracing filter directive (e.g., "info,portico=debug")
    pub rust_log: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credentials_dir", &self.credentials_dir)
            .field("uploads_dir", &self.uploads_dir)
            .field("identity_endpoint", &self.identity_endpoint)
            .field("password_hash_algorithm", &self.password_hash_algorithm)
            .field("password_signer_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is invalid (e.g., unparseable port
    /// or a `PASSWORD_SIGNER_KEY` that is not base64).
    ///
    /// # Variables
    ///
    /// - `HOST` - Bind address (default: "0.0.0.0")
    /// - `PORT` - Listen port (default: 3000)
    /// - `CREDENTIALS_DIR` - Credential file directory (default: "./data/credentials")
    /// - `UPLOADS_DIR` - CSV staging directory (default: "./data/uploads")
    /// - `IDENTITY_ENDPOINT` - Identity platform base URL
    ///   (default: "https://identitytoolkit.googleapis.com")
    /// - `PASSWORD_HASH_ALGORITHM` - Default hash algorithm (default: "HMAC_SHA256")
    /// - `PASSWORD_SIGNER_KEY` - Base64-encoded default signer key (default: empty)
    /// - `RUST_LOG` - Log level filter (default: "info")
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        if port == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PORT".to_string(),
                message: "Port must be between 1 and 65535".to_string(),
            });
        }

        let credentials_dir = PathBuf::from(
            env::var("CREDENTIALS_DIR").unwrap_or_else(|_| "./data/credentials".to_string()),
        );

        let uploads_dir =
            PathBuf::from(env::var("UPLOADS_DIR").unwrap_or_else(|_| "./data/uploads".to_string()));

        let identity_endpoint = env::var("IDENTITY_ENDPOINT")
            .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com".to_string())
            .trim_end_matches('/')
            .to_string();

        let password_hash_algorithm =
            env::var("PASSWORD_HASH_ALGORITHM").unwrap_or_else(|_| "HMAC_SHA256".to_string());

        let password_signer_key = match env::var("PASSWORD_SIGNER_KEY") {
            Ok(encoded) if !encoded.is_empty() => {
                STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| ConfigError::InvalidValue {
                        var: "PASSWORD_SIGNER_KEY".to_string(),
                        message: format!("Must be base64: {e}"),
                    })?
            }
            _ => Vec::new(),
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            host,
            port,
            credentials_dir,
            uploads_dir,
            identity_endpoint,
            password_hash_algorithm,
            password_signer_key,
            rust_log,
        })
    }

    /// Get the server bind address as a socket address string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
