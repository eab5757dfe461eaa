//! Common Utilities
//!
//! Shared error handling, paths, and HTTP client construction.

pub mod error;
pub mod http;
pub mod paths;
pub mod result;

pub use error::{ErrorCode, PluginError};
pub use http::create_http_client;
pub use paths::{expand_tilde, steampipe_token_path};
pub use result::AppResult;
