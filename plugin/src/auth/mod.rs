//! Credential resolution and token sources
//!
//! A connection resolves its configuration into [`ResolvedCredentials`] once,
//! without any network I/O. Those credentials then build a [`TokenSource`]
//! per scope set: a service-account JWT grant with domain-wide delegation, or
//! a stored OAuth2 token refreshed with its refresh token.

pub mod credentials;
pub mod jwt;
pub mod refresh;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::common::{AppResult, PluginError};

pub use credentials::{resolve_credentials, ResolvedCredentials};
pub use jwt::JwtTokenSource;
pub use refresh::RefreshingTokenSource;

/// Google's OAuth2 token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh when the token expires within this many seconds.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Produces a currently valid bearer token, refreshing transparently.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> AppResult<String>;
}

/// An access token held in memory by a token source.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CachedToken {
    pub access_token: String,
    #[zeroize(skip)]
    pub expiry: Option<DateTime<Utc>>,
}

impl CachedToken {
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !is_token_expiring(self.expiry, EXPIRY_MARGIN_SECS)
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// A token without an expiry never expires on its own.
pub fn is_token_expiring(expiry: Option<DateTime<Utc>>, margin_secs: i64) -> bool {
    match expiry {
        Some(exp) => exp.signed_duration_since(Utc::now()).num_seconds() < margin_secs,
        None => false,
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// POST a form-encoded request to a token endpoint and parse the grant.
pub(crate) async fn exchange(
    http: &reqwest::Client,
    token_uri: &str,
    params: &[(&str, &str)],
) -> AppResult<CachedToken> {
    let response = http
        .post(token_uri)
        .form(params)
        .send()
        .await
        .map_err(|e| PluginError::Token(format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PluginError::Token(format!("Failed to read response body: {}", e)))?;

    let parsed = parse_token_response(&body);
    if !status.is_success() {
        let detail = match parsed {
            Ok(TokenResponse {
                error: Some(err),
                error_description,
                ..
            }) => format!("{}: {}", err, error_description.unwrap_or_default()),
            _ => body,
        };
        tracing::error!("Token endpoint returned {}: {}", status, detail);
        return Err(PluginError::Token(format!("HTTP {}: {}", status.as_u16(), detail)));
    }

    let parsed = parsed?;
    if let Some(err) = parsed.error {
        return Err(PluginError::Token(format!(
            "{}: {}",
            err,
            parsed.error_description.unwrap_or_else(|| "Unknown error".to_string())
        )));
    }

    let access_token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PluginError::Token("Missing access_token in response".to_string()))?;
    let expires_in = parsed.expires_in.unwrap_or(3600);

    Ok(CachedToken {
        access_token,
        expiry: Some(expiry_after(expires_in)?),
    })
}

/// Expiry instant for an `expires_in` lifetime in seconds.
fn expiry_after(expires_in: i64) -> AppResult<DateTime<Utc>> {
    chrono::TimeDelta::try_seconds(expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| PluginError::Token(format!("expires_in out of range: {}", expires_in)))
}

fn parse_token_response(body: &str) -> AppResult<TokenResponse> {
    serde_json::from_str(body).map_err(|e| PluginError::Token(format!("Invalid JSON response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_token_expiring() {
        let soon = Utc::now() + chrono::Duration::seconds(30);
        let later = Utc::now() + chrono::Duration::seconds(600);
        assert!(is_token_expiring(Some(soon), 60));
        assert!(!is_token_expiring(Some(later), 60));
        assert!(!is_token_expiring(None, 60));
    }

    #[test]
    fn test_cached_token_debug_redacts() {
        let token = CachedToken {
            access_token: "ya29.secret".into(),
            expiry: None,
        };
        assert!(!format!("{:?}", token).contains("ya29"));
        assert!(token.is_usable());
    }

    #[test]
    fn test_parse_token_response() {
        let parsed = parse_token_response(r#"{"access_token":"ya29.a","expires_in":3599,"token_type":"Bearer"}"#).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("ya29.a"));
        assert_eq!(parsed.expires_in, Some(3599));
        assert!(parse_token_response("not json").is_err());
    }

    #[test]
    fn test_expiry_after() {
        let expiry = expiry_after(3600).unwrap();
        assert!(expiry > Utc::now() + chrono::Duration::seconds(3500));
        assert!(matches!(expiry_after(i64::MAX), Err(PluginError::Token(_))));
        assert!(matches!(expiry_after(i64::MAX / 1000), Err(PluginError::Token(_))));
    }

    #[tokio::test]
    async fn test_exchange_rejects_unbounded_lifetime() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.a",
                "expires_in": i64::MAX
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let err = exchange(&http, &format!("{}/token", server.uri()), &[("grant_type", "refresh_token")])
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Token(msg) if msg.contains("expires_in")));
    }
}
