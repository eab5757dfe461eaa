//! Stored OAuth2 token source.
//!
//! Hands out the stored access token while it is valid and refreshes it with
//! the `refresh_token` grant once it is missing or about to expire. Refreshed
//! tokens live in memory only; the token file is never rewritten.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::credentials::StoredToken;
use super::{exchange, CachedToken, TokenSource};
use crate::common::{AppResult, PluginError};

pub struct RefreshingTokenSource {
    stored: StoredToken,
    http: reqwest::Client,
    current: Mutex<CachedToken>,
}

impl RefreshingTokenSource {
    pub fn new(stored: StoredToken, http: reqwest::Client) -> Self {
        let current = CachedToken {
            access_token: stored.access_token.clone(),
            expiry: stored.expiry,
        };
        Self {
            stored,
            http,
            current: Mutex::new(current),
        }
    }

    async fn refresh(&self) -> AppResult<CachedToken> {
        if self.stored.refresh_token.is_empty() {
            return Err(PluginError::Token(
                "access token expired and no refresh_token is available".into(),
            ));
        }

        info!("Refreshing access token");
        exchange(
            &self.http,
            self.stored.token_uri(),
            &[
                ("client_id", self.stored.client_id.as_str()),
                ("client_secret", self.stored.client_secret.as_str()),
                ("refresh_token", self.stored.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
    }
}

#[async_trait]
impl TokenSource for RefreshingTokenSource {
    async fn access_token(&self) -> AppResult<String> {
        let mut current = self.current.lock().await;
        if current.is_usable() {
            return Ok(current.access_token.clone());
        }

        match self.refresh().await {
            Ok(token) => {
                *current = token;
                Ok(current.access_token.clone())
            }
            Err(e) => {
                // Still inside the margin but not yet expired: keep using it.
                if !current.access_token.is_empty() && !super::is_token_expiring(current.expiry, 0) {
                    warn!("Token refresh failed but token not yet expired: {}", e);
                    Ok(current.access_token.clone())
                } else {
                    Err(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stored(access: &str, expires_in_secs: i64, token_uri: Option<String>) -> StoredToken {
        StoredToken {
            access_token: access.into(),
            token_type: "Bearer".into(),
            refresh_token: "1//refresh".into(),
            expiry: Some(Utc::now() + chrono::Duration::seconds(expires_in_secs)),
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            token_uri,
        }
    }

    #[tokio::test]
    async fn test_valid_stored_token_is_used_without_network() {
        let ts = RefreshingTokenSource::new(
            stored("ya29.valid", 3600, Some("http://127.0.0.1:9/token".into())),
            reqwest::Client::new(),
        );
        assert_eq!(ts.access_token().await.unwrap(), "ya29.valid");
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=cid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ts = RefreshingTokenSource::new(
            stored("ya29.old", 10, Some(format!("{}/token", server.uri()))),
            reqwest::Client::new(),
        );
        assert_eq!(ts.access_token().await.unwrap(), "ya29.fresh");
        assert_eq!(ts.access_token().await.unwrap(), "ya29.fresh");
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_unexpired_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ts = RefreshingTokenSource::new(
            stored("ya29.old", 30, Some(format!("{}/token", server.uri()))),
            reqwest::Client::new(),
        );
        assert_eq!(ts.access_token().await.unwrap(), "ya29.old");
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let mut token = stored("ya29.old", -10, None);
        token.refresh_token = String::new();
        let ts = RefreshingTokenSource::new(token, reqwest::Client::new());
        let err = ts.access_token().await.unwrap_err();
        assert!(matches!(err, PluginError::Token(_)));
    }
}
