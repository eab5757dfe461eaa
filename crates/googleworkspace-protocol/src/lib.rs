//! Host protocol for the Google Workspace table plugin.
//!
//! Shared between the plugin binary and any host that drives it: JSON-RPC 2.0
//! envelopes, the connection configuration record, query requests with typed
//! qualifiers, and table schema descriptors.

pub mod client;
pub mod config;
pub mod jsonrpc;
pub mod query;
pub mod schema;

pub use client::PluginClient;
pub use config::ConnectionConfig;
pub use jsonrpc::{methods, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use query::{GetResult, ListResult, Operator, Qual, QualValue, QueryRequest, RowNotification};
pub use schema::{ColumnDescriptor, ColumnType, KeyColumnDescriptor, Requirement, TableDescriptor};
