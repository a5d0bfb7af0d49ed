/// Service account credentials and OAuth2 access tokens
///
/// Tokens are obtained with the JWT-bearer grant: a short-lived assertion is
/// signed with the service account's private key and exchanged at the key's
/// token endpoint. The resulting token is cached until shortly before expiry.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::provider::{AccessToken, TokenSource};
use crate::error::{Error, Result};

/// Scope broad enough to manage cloud resources generally
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Opaque service account credentials blob (JSON key file contents)
#[derive(Clone)]
pub struct Credentials(Arc<SecretString>);

impl Credentials {
    pub fn from_json(json: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(json.into())))
    }

    /// Load credentials from a JSON key file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::from_json(std::fs::read_to_string(path)?))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Parse the blob as a service account key
    pub fn service_account(&self) -> Result<ServiceAccountKey> {
        serde_json::from_str(self.expose())
            .map_err(|e| Error::credential(format!("invalid service account key: {}", e)))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials([REDACTED])")
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service account JSON key this crate needs
#[derive(Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Token source backed by a Google service account key
pub struct GoogleTokenSource {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    http: Client,
    cached: Mutex<Option<AccessToken>>,
}

impl GoogleTokenSource {
    /// Create a token source requesting the cloud-platform scope
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Self::with_scopes(credentials, [CLOUD_PLATFORM_SCOPE])
    }

    pub fn with_scopes<I, S>(credentials: &Credentials, scopes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = credentials.service_account()?;
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::credential(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            key,
            scopes: scopes.into_iter().map(Into::into).collect(),
            http,
            cached: Mutex::new(None),
        })
    }

    /// Sign the JWT assertion presented to the token endpoint
    fn assertion(&self) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.key.private_key.expose_secret().as_bytes())
            .map_err(|e| Error::credential(format!("invalid private key: {}", e)))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| Error::credential(format!("failed to sign assertion: {}", e)))
    }

    async fn exchange(&self) -> Result<AccessToken> {
        let assertion = self.assertion()?;
        debug!("POST {}", self.key.token_uri);

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::credential(format!("token exchange failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::credential(format!(
                "token exchange failed with status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::credential(format!("failed to parse token response: {}", e)))?;

        info!("Obtained access token for {}", self.key.client_email);
        Ok(AccessToken::new(
            token.access_token,
            Utc::now() + Duration::seconds(token.expires_in),
        ))
    }
}

#[async_trait]
impl TokenSource for GoogleTokenSource {
    async fn token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(Duration::seconds(60)) {
                return Ok(token.clone());
            }
        }

        let token = self.exchange().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
