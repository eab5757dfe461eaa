//! Google API Authenticated HTTP Client
//!
//! Injects a bearer token from the connection's token source into every
//! request and maps Google's error envelope onto `PluginError::Upstream`.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::auth::TokenSource;
use crate::common::{AppResult, PluginError};

/// Google API HTTP client bound to one API base URL.
pub struct GoogleClient {
    client: Client,
    token_source: Arc<dyn TokenSource>,
    base_url: String,
}

impl GoogleClient {
    pub fn new(client: Client, token_source: Arc<dyn TokenSource>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            token_source,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Make an authenticated GET request against a path under the base URL
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> AppResult<Value> {
        let token = self.token_source.access_token().await?;
        let builder = self.client.get(self.url(path)).query(query).bearer_auth(token);

        self.execute_request(builder).await
    }

    /// Execute a request and handle Google API response patterns
    async fn execute_request(&self, builder: RequestBuilder) -> AppResult<Value> {
        let response = builder.send().await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by Google API");
        }

        let body = response
            .text()
            .await
            .map_err(|e| PluginError::Http(format!("Failed to read response body: {}", e)))?;

        if status.is_success() && body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        let parsed: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(_) if !status.is_success() => Value::Null,
            Err(e) => {
                return Err(PluginError::Http(format!("Failed to parse JSON response: {}", e)));
            }
        };

        if !status.is_success() {
            let message = extract_error_message(&parsed, status);
            error!("Google API error {}: {}", status.as_u16(), message);
            return Err(PluginError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(parsed)
    }
}

/// Extract error message from Google API error response
///
/// Google APIs return errors as `{"error": {"code": 400, "message": "..."}}`.
fn extract_error_message(response: &Value, status: StatusCode) -> String {
    response
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {} error", status))
}
