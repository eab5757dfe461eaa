//! Common Result Type

use super::error::PluginError;

/// Plugin result type
pub type AppResult<T> = Result<T, PluginError>;
