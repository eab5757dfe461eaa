//! Credential file formats and the resolver that picks one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use googleworkspace_protocol::ConnectionConfig;
use serde::Deserialize;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{JwtTokenSource, RefreshingTokenSource, TokenSource, TOKEN_ENDPOINT};
use crate::common::{expand_tilde, steampipe_token_path, AppResult, PluginError};
use crate::config::{select_auth_mode, AuthMode};

fn default_token_uri() -> String {
    TOKEN_ENDPOINT.to_string()
}

/// Google service-account key file.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    #[zeroize(skip)]
    pub key_type: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub client_email: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub private_key_id: String,
    #[serde(default = "default_token_uri")]
    #[zeroize(skip)]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn parse(content: &str) -> AppResult<Self> {
        let key: Self = serde_json::from_str(content)
            .map_err(|e| PluginError::CredentialParse(format!("service account key: {}", e)))?;
        if !key.key_type.is_empty() && key.key_type != "service_account" {
            return Err(PluginError::CredentialParse(format!(
                "expected a service_account key, got '{}'",
                key.key_type
            )));
        }
        if key.client_email.is_empty() {
            return Err(PluginError::CredentialParse("service account key has no client_email".into()));
        }
        if key.private_key.is_empty() {
            return Err(PluginError::CredentialParse("service account key has no private_key".into()));
        }
        Ok(key)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Stored OAuth2 token, optionally carrying the client that issued it.
///
/// Accepts both an `oauth2` token record and an `authorized_user` file; the
/// two may also be merged into one document.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StoredToken {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    #[zeroize(skip)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    #[zeroize(skip)]
    pub token_uri: Option<String>,
}

impl StoredToken {
    pub fn parse(content: &str) -> AppResult<Self> {
        let mut token: Self = serde_json::from_str(content)
            .map_err(|e| PluginError::CredentialParse(format!("token file: {}", e)))?;
        if token.access_token.is_empty() && token.refresh_token.is_empty() {
            return Err(PluginError::CredentialParse(
                "token file has neither access_token nor refresh_token".into(),
            ));
        }
        // Year 1 is the zero time some token writers emit for "no expiry".
        if token.expiry.is_some_and(|e| e.year() <= 1) {
            token.expiry = None;
        }
        Ok(token)
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(TOKEN_ENDPOINT)
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<OAuthApp>,
    web: Option<OAuthApp>,
}

#[derive(Deserialize)]
struct OAuthApp {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

/// Credentials selected for a connection, ready to mint token sources.
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    ServiceAccount { key: ServiceAccountKey, subject: String },
    OAuth(StoredToken),
}

impl ResolvedCredentials {
    /// Build a token source for the given scope set.
    ///
    /// Stored OAuth2 tokens carry whatever scopes they were granted with, so
    /// `scopes` only shapes the service-account assertion.
    pub fn token_source(&self, scopes: &[String], http: reqwest::Client) -> Arc<dyn TokenSource> {
        match self {
            ResolvedCredentials::ServiceAccount { key, subject } => Arc::new(JwtTokenSource::new(
                key.clone(),
                subject.clone(),
                scopes.to_vec(),
                http,
            )),
            ResolvedCredentials::OAuth(token) => Arc::new(RefreshingTokenSource::new(token.clone(), http)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedCredentials::ServiceAccount { .. } => "service_account",
            ResolvedCredentials::OAuth(_) => "oauth2",
        }
    }
}

/// Resolve a connection's configuration into credentials.
///
/// Reads local files only; nothing here touches the network.
pub async fn resolve_credentials(config: &ConnectionConfig) -> AppResult<ResolvedCredentials> {
    let resolved = match select_auth_mode(config)? {
        AuthMode::ServiceAccount { credentials, subject } => {
            let content = path_or_contents(credentials).await?;
            let key = ServiceAccountKey::parse(&content)?;
            debug!("Loaded service account key for {}", key.client_email);
            ResolvedCredentials::ServiceAccount {
                key,
                subject: subject.to_string(),
            }
        }
        AuthMode::TokenFile(path) => {
            let path = expand_tilde(path)?;
            let content = read_file(&path).await?;
            ResolvedCredentials::OAuth(StoredToken::parse(&content)?)
        }
        AuthMode::ClientSecret(path) => {
            let path = expand_tilde(path)?;
            resolve_client_secret(&path, &steampipe_token_path()?).await?
        }
    };

    info!("Resolved {} credentials", resolved.kind());
    Ok(resolved)
}

async fn resolve_client_secret(secret_path: &Path, token_path: &Path) -> AppResult<ResolvedCredentials> {
    let content = read_file(secret_path).await?;
    let file: ClientSecretFile = serde_json::from_str(&content)
        .map_err(|e| PluginError::CredentialParse(format!("client secret file: {}", e)))?;
    let app = file.installed.or(file.web).ok_or_else(|| {
        PluginError::CredentialParse("client secret file has no 'installed' or 'web' section".into())
    })?;

    let mut token = StoredToken::parse(&read_file(token_path).await?)?;
    token.client_id = app.client_id;
    token.client_secret = app.client_secret;
    token.token_uri = Some(app.token_uri);
    Ok(ResolvedCredentials::OAuth(token))
}

/// Literal JSON is used as-is; anything else is a path to read.
pub fn looks_like_inline_json(value: &str) -> bool {
    value.trim_start().starts_with('{') || value.contains('\n')
}

pub async fn path_or_contents(value: &str) -> AppResult<String> {
    if looks_like_inline_json(value) {
        return Ok(value.to_string());
    }
    let path: PathBuf = expand_tilde(value.trim())?;
    read_file(&path).await
}

async fn read_file(path: &Path) -> AppResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PluginError::credential_io(path, e))
}
