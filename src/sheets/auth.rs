use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::SheetsError;

pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh slightly before the upstream expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The subset of a Google service-account key file needed to mint tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(raw).map_err(|e| SheetsError::Credentials { source: e })
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

impl CachedToken {
    fn usable_at(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS > now
    }
}

/// Exchanges signed JWT assertions for bearer tokens and caches the result.
pub struct TokenProvider {
    key: ServiceAccountKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Self {
        Self {
            key,
            http,
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn sign_assertion(&self, now: i64) -> Result<String, SheetsError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: READONLY_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| SheetsError::Signing { source: e })?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SheetsError::Signing { source: e })
    }

    pub async fn access_token(&self) -> Result<String, SheetsError> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.usable_at(now)) {
            return Ok(token.access_token.clone());
        }

        let assertion = self.sign_assertion(now)?;
        debug!(client_email = %self.key.client_email, "requesting access token");
        let resp = self
            .http
            .post(self.key.token_uri.as_str())
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SheetsError::Request {
                url: self.key.token_uri.clone(),
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Token {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = resp.json().await.map_err(|e| SheetsError::Decode {
            url: self.key.token_uri.clone(),
            source: e,
        })?;
        let fresh = CachedToken {
            access_token: token.access_token,
            expires_at: now + token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
        };
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }
}
