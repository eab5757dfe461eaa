//! Plugin Error Types
//!
//! One error enum for the whole plugin, mapped onto JSON-RPC error codes.

use std::path::PathBuf;

use serde_json::Value;

/// JSON-RPC error codes
///
/// Standard codes: -32768 to -32000
/// Custom codes: -32099 to -32000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Standard JSON-RPC errors
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,

    // Auth
    TokenRefreshFailed = -32011,

    // Connection and upstream
    ConfigurationError = -32020,
    CredentialError = -32021,
    UpstreamError = -32022,
    NotConfigured = -32023,

    // Transport
    GenericError = -32000,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("{0}")]
    Configuration(String),

    #[error("failed to read credentials from {}: {source}", path.display())]
    CredentialIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials: {0}")]
    CredentialParse(String),

    #[error("token request failed: {0}")]
    Token(String),

    #[error("Google API error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("connection is not configured")]
    NotConfigured,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PluginError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PluginError::Configuration(_) => ErrorCode::ConfigurationError,
            PluginError::CredentialIo { .. } | PluginError::CredentialParse(_) => ErrorCode::CredentialError,
            PluginError::Token(_) => ErrorCode::TokenRefreshFailed,
            PluginError::Upstream { .. } => ErrorCode::UpstreamError,
            PluginError::Http(_) => ErrorCode::GenericError,
            PluginError::InvalidQuery(_) => ErrorCode::InvalidParams,
            PluginError::NotConfigured => ErrorCode::NotConfigured,
            PluginError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Convert to JSON-RPC error code
    pub fn code(&self) -> i32 {
        self.error_code().code()
    }

    /// HTTP status of an upstream Google failure, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            PluginError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Extra data attached to the JSON-RPC error object.
    pub fn data(&self) -> Option<Value> {
        match self {
            PluginError::Upstream { status, .. } => Some(serde_json::json!({ "status": status })),
            PluginError::CredentialIo { path, .. } => {
                Some(serde_json::json!({ "path": path.display().to_string() }))
            }
            _ => None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PluginError::Configuration(message.into())
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        PluginError::InvalidQuery(message.into())
    }

    pub fn credential_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PluginError::CredentialIo {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for PluginError {
    fn from(err: reqwest::Error) -> Self {
        PluginError::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(PluginError::config("x").code(), -32020);
        assert_eq!(PluginError::CredentialParse("x".into()).code(), -32021);
        assert_eq!(PluginError::Token("x".into()).code(), -32011);
        assert_eq!(
            PluginError::Upstream {
                status: 404,
                message: "nope".into()
            }
            .code(),
            -32022
        );
        assert_eq!(PluginError::invalid_query("x").code(), -32602);
        assert_eq!(PluginError::NotConfigured.code(), -32023);
        assert_eq!(PluginError::Internal("output stream closed".into()).code(), -32603);
    }

    #[test]
    fn test_credential_io_message_carries_path() {
        let err = PluginError::credential_io(
            "/home/me/token.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        );
        assert!(err.to_string().contains("/home/me/token.json"));
        assert_eq!(err.data().unwrap()["path"], "/home/me/token.json");
    }

    #[test]
    fn test_status_only_for_upstream() {
        let err = PluginError::Upstream {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(PluginError::Http("boom".into()).status(), None);
    }
}
