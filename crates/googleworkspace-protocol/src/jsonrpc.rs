//! JSON-RPC 2.0 envelopes exchanged with the host, one message per line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method names understood by the plugin.
pub mod methods {
    pub const PLUGIN_INFO: &str = "plugin.info";
    pub const PLUGIN_SCHEMA: &str = "plugin.schema";
    pub const CONNECTION_CONFIGURE: &str = "connection.configure";
    pub const TABLE_LIST: &str = "table.list";
    pub const TABLE_GET: &str = "table.get";
    /// Notification carrying one streamed row of an in-flight `table.list`.
    pub const TABLE_ROW: &str = "table.row";
    /// Notification asking the plugin to stop an in-flight request.
    pub const CANCEL_REQUEST: &str = "$/cancelRequest";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Check if this is a notification (no id = no response expected)
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.jsonrpc != "2.0" {
            return Err("Invalid JSON-RPC version, expected '2.0'".to_string());
        }
        if self.method.is_empty() {
            return Err("Method cannot be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::error(Value::Null, -32700, message, None)
    }

    pub fn invalid_request(id: Value, message: impl Into<String>) -> Self {
        Self::error(id, -32600, message, None)
    }

    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self::error(id, -32601, format!("Method not found: {}", method), None)
    }

    pub fn invalid_params(id: Value, message: impl Into<String>) -> Self {
        Self::error(id, -32602, message, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A line read from the plugin is either a response or a notification.
#[derive(Debug, Clone)]
pub enum Incoming {
    Response(JsonRpcResponse),
    Notification(JsonRpcRequest),
}

impl Incoming {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        if value.get("method").is_some() {
            Ok(Self::Notification(serde_json::from_value(value)?))
        } else {
            Ok(Self::Response(serde_json::from_value(value)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_has_no_id() {
        let note = JsonRpcRequest::notification(methods::CANCEL_REQUEST, json!({"id": 3}));
        assert!(note.is_notification());
        let raw = serde_json::to_string(&note).unwrap();
        assert!(!raw.contains("\"id\":null"));
    }

    #[test]
    fn test_validate_rejects_wrong_version() {
        let mut req = JsonRpcRequest::new(1, "plugin.info", Value::Null);
        assert!(req.validate().is_ok());
        req.jsonrpc = "1.0".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_incoming_distinguishes_rows_from_responses() {
        let row = r#"{"jsonrpc":"2.0","method":"table.row","params":{"request_id":1,"row":{}}}"#;
        let resp = r#"{"jsonrpc":"2.0","id":1,"result":{"rows_streamed":1}}"#;
        assert!(matches!(Incoming::parse(row).unwrap(), Incoming::Notification(_)));
        assert!(matches!(Incoming::parse(resp).unwrap(), Incoming::Response(_)));
    }
}
