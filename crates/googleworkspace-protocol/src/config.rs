use serde::{Deserialize, Serialize};

/// Connection options supplied by the host in `connection.configure`.
///
/// Every field is optional; empty strings are treated the same as absent.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Service-account key, either inline JSON or a path to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    /// Deprecated alias of `credentials`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonated_user_email: Option<String>,

    /// Stored OAuth2 token or authorized-user file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<String>,

    /// OAuth2 client secret file; pairs with `~/.steampipe/token.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_path: Option<String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| match v.as_deref() {
            Some(s) if s.trim_start().starts_with('{') => Some("[REDACTED]".to_string()),
            other => other.map(str::to_string),
        };
        f.debug_struct("ConnectionConfig")
            .field("credentials", &redact(&self.credentials))
            .field("credential_file", &redact(&self.credential_file))
            .field("impersonated_user_email", &self.impersonated_user_email)
            .field("token_path", &self.token_path)
            .field("client_secret_path", &self.client_secret_path)
            .finish()
    }
}
