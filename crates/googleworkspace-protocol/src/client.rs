use std::path::Path;
use std::process::Stdio;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::jsonrpc::{methods, Incoming};
use crate::{JsonRpcRequest, JsonRpcResponse};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid message from plugin: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("plugin closed the stream while waiting for response {0}")]
    Closed(Value),
}

/// Response plus every notification the plugin emitted before it.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub response: JsonRpcResponse,
    pub notifications: Vec<JsonRpcRequest>,
}

impl CallOutcome {
    /// Rows carried by `table.row` notifications, in arrival order.
    pub fn rows(&self) -> Vec<Value> {
        self.notifications
            .iter()
            .filter(|n| n.method == methods::TABLE_ROW)
            .filter_map(|n| n.params.get("row").cloned())
            .collect()
    }
}

/// Line-delimited JSON-RPC client driving a plugin over any byte stream.
pub struct PluginClient<R, W> {
    reader: BufReader<R>,
    writer: W,
    next_id: u64,
}

impl<R, W> PluginClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub async fn send(&mut self, message: &JsonRpcRequest) -> Result<(), ClientError> {
        let payload = serde_json::to_string(message)?;
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send a request and read until its response arrives.
    pub async fn call(&mut self, method: &str, params: Value) -> Result<CallOutcome, ClientError> {
        let id = Value::from(self.next_id());
        let request = JsonRpcRequest::new(id.clone(), method, params);
        self.send(&request).await?;

        let mut notifications = Vec::new();
        loop {
            let mut line = String::new();
            let bytes = self.reader.read_line(&mut line).await?;
            if bytes == 0 {
                return Err(ClientError::Closed(id));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Incoming::parse(trimmed)? {
                Incoming::Notification(note) => notifications.push(note),
                Incoming::Response(response) if response.id == id => {
                    return Ok(CallOutcome {
                        response,
                        notifications,
                    });
                }
                Incoming::Response(_) => continue,
            }
        }
    }

    pub async fn cancel(&mut self, id: u64) -> Result<(), ClientError> {
        let note = JsonRpcRequest::notification(methods::CANCEL_REQUEST, serde_json::json!({ "id": id }));
        self.send(&note).await
    }
}

impl PluginClient<ChildStdout, ChildStdin> {
    /// Launch a plugin binary and talk to it over its stdio.
    pub fn spawn(program: &Path) -> Result<(Self, Child), ClientError> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "plugin stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "plugin stdout unavailable"))?;

        Ok((Self::new(stdout, stdin), child))
    }
}
