//! Connection configuration
//!
//! Picks exactly one authentication mode out of the host-supplied
//! `ConnectionConfig`. Empty strings count as absent everywhere.

use googleworkspace_protocol::ConnectionConfig;

use crate::common::{AppResult, PluginError};

/// Return the first candidate that is present and not blank.
pub fn first_non_empty<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.trim().is_empty())
}

fn field(value: &Option<String>) -> Option<&str> {
    first_non_empty(&[value.as_deref()])
}

/// Which credential source a connection uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode<'a> {
    /// Service-account key (inline JSON or path) impersonating `subject`.
    ServiceAccount { credentials: &'a str, subject: &'a str },
    /// Stored OAuth2 token or authorized-user file.
    TokenFile(&'a str),
    /// OAuth2 client secret paired with the well-known token file.
    ClientSecret(&'a str),
}

/// Select the authentication mode; first match wins.
///
/// The impersonation email is checked before anything else for the
/// service-account mode, so no file is touched when it is missing.
pub fn select_auth_mode(config: &ConnectionConfig) -> AppResult<AuthMode<'_>> {
    if let Some(credentials) = first_non_empty(&[
        config.credentials.as_deref(),
        config.credential_file.as_deref(),
    ]) {
        let subject = field(&config.impersonated_user_email)
            .ok_or_else(|| PluginError::config("impersonated_user_email must be configured"))?;
        return Ok(AuthMode::ServiceAccount {
            credentials,
            subject,
        });
    }

    if let Some(path) = field(&config.token_path) {
        return Ok(AuthMode::TokenFile(path));
    }

    if let Some(path) = field(&config.client_secret_path) {
        return Ok(AuthMode::ClientSecret(path));
    }

    Err(PluginError::config(
        "credentials must be configured: set credentials (with impersonated_user_email), token_path, or client_secret_path",
    ))
}
