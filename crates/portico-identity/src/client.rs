//! Identity-platform client: the batch user-import primitive.
//!
//! [`IdentityClient`] is the seam the importer works against;
//! [`RestIdentityClient`] implements it over the platform's
//! `accounts:batchCreate` REST endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};
use crate::token::TokenProvider;

/// Default identity-platform endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// One user record to import, decoded from a CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportUser {
    /// Stable unique id in the target project.
    pub uid: String,
    /// Email address.
    pub email: String,
    /// True only when the source field was the literal text `true`.
    pub email_verified: bool,
    /// Raw password hash bytes.
    pub password_hash: Vec<u8>,
    /// Raw password salt bytes.
    pub password_salt: Vec<u8>,
}

/// Password hashing parameters declared once per import request.
#[derive(Debug, Clone)]
pub struct PasswordHashConfig {
    /// Platform hash algorithm identifier, e.g. `HMAC_SHA256` or `SCRYPT`.
    pub algorithm: String,
    /// Raw signer key bytes.
    pub signer_key: Vec<u8>,
    /// Rounds, for algorithms that take them.
    pub rounds: Option<u32>,
}

/// One rejected row within an otherwise accepted batch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RowFailure {
    /// Zero-based index of the row within the submitted batch.
    pub index: usize,
    /// Platform-provided reason.
    pub message: String,
}

/// Result of submitting one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Rows accepted by the platform.
    pub success_count: usize,
    /// Rows rejected by the platform.
    pub failure_count: usize,
    /// Per-row rejections, in platform order.
    pub errors: Vec<RowFailure>,
}

/// The import primitive the bulk importer depends on.
#[async_trait]
pub trait IdentityClient: std::fmt::Debug + Send + Sync {
    /// Project this client is scoped to.
    fn project_id(&self) -> &str;

    /// Submit one batch of at most 1000 users.
    ///
    /// A returned error means the batch as a whole was not accepted;
    /// per-row rejections come back inside a successful [`BatchOutcome`].
    async fn import_users(
        &self,
        users: &[ImportUser],
        hash: &PasswordHashConfig,
    ) -> IdentityResult<BatchOutcome>;
}

// ── Wire models (accounts:batchCreate) ────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireUser<'a> {
    local_id: &'a str,
    email: &'a str,
    email_verified: bool,
    password_hash: String,
    salt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateRequest<'a> {
    users: Vec<WireUser<'a>>,
    hash_algorithm: &'a str,
    signer_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rounds: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireRowError {
    index: usize,
    message: String,
}

#[derive(Debug, Deserialize, Default)]
struct BatchCreateResponse {
    #[serde(default)]
    error: Vec<WireRowError>,
}

/// REST implementation of [`IdentityClient`], one instance per project.
pub struct RestIdentityClient {
    project_id: String,
    endpoint: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for RestIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestIdentityClient")
            .field("project_id", &self.project_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RestIdentityClient {
    /// Build a client scoped to one project.
    pub fn new(
        project_id: impl Into<String>,
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> IdentityResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            project_id: project_id.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http,
            tokens,
        })
    }

    fn batch_create_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/accounts:batchCreate",
            self.endpoint, self.project_id
        )
    }
}

#[async_trait]
impl IdentityClient for RestIdentityClient {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn import_users(
        &self,
        users: &[ImportUser],
        hash: &PasswordHashConfig,
    ) -> IdentityResult<BatchOutcome> {
        let body = BatchCreateRequest {
            users: users
                .iter()
                .map(|u| WireUser {
                    local_id: &u.uid,
                    email: &u.email,
                    email_verified: u.email_verified,
                    password_hash: URL_SAFE_NO_PAD.encode(&u.password_hash),
                    salt: URL_SAFE_NO_PAD.encode(&u.password_salt),
                })
                .collect(),
            hash_algorithm: &hash.algorithm,
            signer_key: URL_SAFE_NO_PAD.encode(&hash.signer_key),
            rounds: hash.rounds,
        };

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.batch_create_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Platform {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: BatchCreateResponse = response.json().await?;
        let failure_count = parsed.error.len();
        let outcome = BatchOutcome {
            success_count: users.len().saturating_sub(failure_count),
            failure_count,
            errors: parsed
                .error
                .into_iter()
                .map(|e| RowFailure {
                    index: e.index,
                    message: e.message,
                })
                .collect(),
        };

        tracing::debug!(
            project_id = %self.project_id,
            submitted = users.len(),
            failed = outcome.failure_count,
            "Batch import submitted"
        );

        Ok(outcome)
    }
}
