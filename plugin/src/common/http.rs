//! HTTP Client Utilities
//!
//! Shared HTTP client creation with consistent configuration.

use std::time::Duration;

use super::error::PluginError;
use super::result::AppResult;

pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Create a reqwest HTTP client with standard configuration
///
/// - 30 second request timeout, 10 second connect timeout
/// - Reusable across requests; clone is cheap
pub fn create_http_client() -> AppResult<reqwest::Client> {
    create_http_client_with_timeout(REQUEST_TIMEOUT_SECS)
}

/// Create a reqwest HTTP client with custom timeout
pub fn create_http_client_with_timeout(timeout_secs: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(|e| PluginError::Http(format!("Failed to build HTTP client: {}", e)))
}
