//! Google Workspace tables for a foreign-data-wrapper host.
//!
//! The plugin resolves Google credentials, caches authenticated API clients
//! per connection, and serves read-only tables over a stdio JSON-RPC channel.

pub mod auth;
pub mod common;
pub mod config;
pub mod google;
pub mod server;
pub mod session;
pub mod table;
pub mod tables;

use tracing_subscriber::EnvFilter;

pub use server::PluginServer;

/// Serve the host protocol on stdin/stdout until the host closes stdin.
pub async fn run() -> std::io::Result<()> {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting {} plugin v{}", server::PLUGIN_NAME, env!("CARGO_PKG_VERSION"));
    PluginServer::new()
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await
}
