//! Service-account token source with domain-wide delegation.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::credentials::ServiceAccountKey;
use super::{exchange, CachedToken, TokenSource};
use crate::common::{AppResult, PluginError};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mints access tokens by signing an RS256 assertion that impersonates
/// `subject`, then exchanging it at the key's token endpoint.
pub struct JwtTokenSource {
    key: ServiceAccountKey,
    subject: String,
    scopes: Vec<String>,
    http: reqwest::Client,
    current: Mutex<Option<CachedToken>>,
}

impl JwtTokenSource {
    pub fn new(key: ServiceAccountKey, subject: String, scopes: Vec<String>, http: reqwest::Client) -> Self {
        Self {
            key,
            subject,
            scopes,
            http,
            current: Mutex::new(None),
        }
    }

    pub fn assertion(&self) -> AppResult<String> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            sub: self.subject.clone(),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        if !self.key.private_key_id.is_empty() {
            header.kid = Some(self.key.private_key_id.clone());
        }

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| PluginError::CredentialParse(format!("private_key: {}", e)))?;

        encode(&header, &claims, &signing_key).map_err(|e| PluginError::Token(format!("JWT signing failed: {}", e)))
    }
}

#[async_trait]
impl TokenSource for JwtTokenSource {
    async fn access_token(&self) -> AppResult<String> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_usable()) {
            return Ok(token.access_token.clone());
        }

        debug!("Requesting delegated token for {}", self.subject);
        let assertion = self.assertion()?;
        let token = exchange(
            &self.http,
            &self.key.token_uri,
            &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
        )
        .await?;

        info!("Obtained service account token ({} scopes)", self.scopes.len());
        let access_token = token.access_token.clone();
        *current = Some(token);
        Ok(access_token)
    }
}
