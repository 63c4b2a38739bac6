//! OAuth2 access-token acquisition for service accounts.
//!
//! The REST client authenticates with a bearer token obtained through the
//! JWT-bearer grant: sign an RS256 assertion with the service-account key,
//! exchange it at the key's `token_uri`, cache the result until shortly
//! before expiry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{IdentityError, IdentityResult};
use crate::service_account::ServiceAccountKey;

/// OAuth2 scope required for identity-platform user management.
const IDENTITY_SCOPE: &str = "https://www.googleapis.com/auth/identitytoolkit";

/// Refresh this many seconds before the token actually expires.
const EXPIRY_SLACK_SECS: i64 = 60;

/// Source of bearer tokens for identity-platform requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a currently-valid access token.
    async fn access_token(&self) -> IdentityResult<String>;
}

/// A fixed token, for tests and emulator use.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> IdentityResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    /// Unix seconds after which the token is considered stale.
    refresh_after: i64,
}

/// Exchanges signed service-account assertions for access tokens.
pub struct ServiceAccountTokenProvider {
    client_email: String,
    token_uri: String,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenProvider")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountTokenProvider {
    /// Build a provider from a parsed service-account key.
    ///
    /// # Errors
    ///
    /// Fails when the key's PEM private key cannot be loaded.
    pub fn new(key: &ServiceAccountKey) -> IdentityResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            encoding_key,
            http,
            cached: RwLock::new(None),
        })
    }

    async fn fetch_token(&self) -> IdentityResult<CachedToken> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: IDENTITY_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::TokenExchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::TokenExchange(format!("malformed token response: {e}")))?;

        tracing::debug!(
            client_email = %self.client_email,
            expires_in = token.expires_in,
            "Access token acquired"
        );

        Ok(CachedToken {
            token: token.access_token,
            refresh_after: now + token.expires_in - EXPIRY_SLACK_SECS,
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> IdentityResult<String> {
        let now = Utc::now().timestamp();

        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.refresh_after > now {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(token)
    }
}
