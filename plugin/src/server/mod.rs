//! Stdio JSON-RPC Server
//!
//! Reads newline-delimited JSON-RPC 2.0 requests from the host and answers on
//! the output stream. Each request runs on its own task; `table.list` streams
//! rows as `table.row` notifications ahead of its response. All output goes
//! through one writer task so lines never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use googleworkspace_protocol::{
    methods, ConnectionConfig, GetResult, JsonRpcRequest, JsonRpcResponse, QueryRequest, RowNotification,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::{AppResult, PluginError};
use crate::config::select_auth_mode;
use crate::session::Connection;
use crate::table::{execute_get, execute_list, Row, RowEmitter, Table};
use crate::tables;

pub const PLUGIN_NAME: &str = "googleworkspace";

/// Output lines buffered ahead of the writer before producers wait.
const OUTPUT_BUFFER: usize = 256;

#[derive(Debug, Deserialize)]
struct CancelParams {
    id: Value,
}

/// Key for the in-flight map; ids may be numbers or strings.
fn request_key(id: &Value) -> String {
    id.to_string()
}

pub struct PluginServer {
    connection: RwLock<Option<Arc<Connection>>>,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
    api_root: Option<String>,
}

impl PluginServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connection: RwLock::new(None),
            in_flight: Mutex::new(HashMap::new()),
            api_root: None,
        })
    }

    /// Server whose connections send API calls to `root`.
    pub fn with_api_root(root: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            connection: RwLock::new(None),
            in_flight: Mutex::new(HashMap::new()),
            api_root: Some(root.into()),
        })
    }

    /// Serve until the input stream closes.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel::<String>(OUTPUT_BUFFER);
        let writer_task = tokio::spawn(write_lines(writer, out_rx));

        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut tasks = Vec::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                debug!("Host closed input");
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Unparseable request: {}", e);
                    send(&out_tx, &JsonRpcResponse::parse_error(format!("Parse error: {}", e))).await;
                    continue;
                }
            };

            if let Err(e) = request.validate() {
                let id = request.id.clone().unwrap_or(Value::Null);
                send(&out_tx, &JsonRpcResponse::invalid_request(id, e)).await;
                continue;
            }

            let Some(id) = request.id.clone() else {
                self.handle_notification(request).await;
                continue;
            };

            // Register before spawning so an immediate cancel finds the token.
            let cancel = CancellationToken::new();
            self.in_flight.lock().await.insert(request_key(&id), cancel.clone());

            tasks.retain(|task: &tokio::task::JoinHandle<()>| !task.is_finished());
            let server = Arc::clone(&self);
            let out = out_tx.clone();
            tasks.push(tokio::spawn(async move {
                let response = server.dispatch(id.clone(), request, cancel, &out).await;
                server.in_flight.lock().await.remove(&request_key(&id));
                send(&out, &response).await;
            }));
        }

        for task in tasks {
            if let Err(e) = task.await {
                error!("Request task failed: {}", e);
            }
        }
        drop(out_tx);
        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }

    async fn handle_notification(&self, request: JsonRpcRequest) {
        if request.method != methods::CANCEL_REQUEST {
            debug!("Ignoring notification {}", request.method);
            return;
        }
        match serde_json::from_value::<CancelParams>(request.params) {
            Ok(params) => {
                if let Some(token) = self.in_flight.lock().await.get(&request_key(&params.id)) {
                    info!("Cancelling request {}", params.id);
                    token.cancel();
                }
            }
            Err(e) => warn!("Invalid cancel params: {}", e),
        }
    }

    async fn dispatch(
        &self,
        id: Value,
        request: JsonRpcRequest,
        cancel: CancellationToken,
        out: &mpsc::Sender<String>,
    ) -> JsonRpcResponse {
        debug!("Dispatching {} (id {})", request.method, id);
        let result = match request.method.as_str() {
            methods::PLUGIN_INFO => Ok(json!({
                "name": PLUGIN_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            })),
            methods::PLUGIN_SCHEMA => Ok(json!({ "tables": tables::descriptors() })),
            methods::CONNECTION_CONFIGURE => self.configure(request.params).await,
            methods::TABLE_LIST => self.table_list(&id, request.params, &cancel, out).await,
            methods::TABLE_GET => self.table_get(request.params).await,
            other => return JsonRpcResponse::method_not_found(id, other),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                warn!("{} failed: {}", request.method, e);
                JsonRpcResponse::error(id, e.code(), e.to_string(), e.data())
            }
        }
    }

    async fn configure(&self, params: Value) -> AppResult<Value> {
        let config: ConnectionConfig = serde_json::from_value(params)
            .map_err(|e| PluginError::invalid_query(format!("invalid connection config: {}", e)))?;
        select_auth_mode(&config)?;

        let mut connection = Connection::new(config)?;
        if let Some(root) = &self.api_root {
            connection = connection.with_api_root(root.clone());
        }
        *self.connection.write().await = Some(Arc::new(connection));

        info!("Connection configured");
        Ok(json!({ "configured": true }))
    }

    async fn connection(&self) -> AppResult<Arc<Connection>> {
        self.connection.read().await.clone().ok_or(PluginError::NotConfigured)
    }

    async fn table_list(
        &self,
        id: &Value,
        params: Value,
        cancel: &CancellationToken,
        out: &mpsc::Sender<String>,
    ) -> AppResult<Value> {
        let (table, query) = resolve(params)?;
        let conn = self.connection().await?;

        let mut stream = RowStream { request_id: id, out };
        let result = execute_list(table, &conn, &query, cancel, &mut stream).await?;
        Ok(json!(result))
    }

    async fn table_get(&self, params: Value) -> AppResult<Value> {
        let (table, query) = resolve(params)?;
        let conn = self.connection().await?;
        let row = execute_get(table, &conn, &query).await?;
        Ok(json!(GetResult { row }))
    }
}

fn resolve(params: Value) -> AppResult<(&'static dyn Table, QueryRequest)> {
    let query: QueryRequest =
        serde_json::from_value(params).map_err(|e| PluginError::invalid_query(format!("invalid query: {}", e)))?;
    let table = tables::find(&query.table)
        .ok_or_else(|| PluginError::invalid_query(format!("unknown table: {}", query.table)))?;
    Ok((table, query))
}

/// Streams rows as `table.row` notifications, waiting while the output is full.
struct RowStream<'a> {
    request_id: &'a Value,
    out: &'a mpsc::Sender<String>,
}

#[async_trait]
impl RowEmitter for RowStream<'_> {
    async fn emit(&mut self, row: Row) -> AppResult<()> {
        let note = JsonRpcRequest::notification(
            methods::TABLE_ROW,
            json!(RowNotification {
                request_id: self.request_id.clone(),
                row,
            }),
        );
        let line = serde_json::to_string(&note)
            .map_err(|e| PluginError::Internal(format!("failed to serialize row: {}", e)))?;
        self.out
            .send(line)
            .await
            .map_err(|_| PluginError::Internal("output stream closed".into()))
    }
}

async fn send<T: serde::Serialize>(out: &mpsc::Sender<String>, message: &T) {
    match serde_json::to_string(message) {
        Ok(line) => {
            if out.send(line).await.is_err() {
                warn!("Output closed; dropping message");
            }
        }
        Err(e) => error!("Failed to serialize message: {}", e),
    }
}

async fn write_lines<W>(mut writer: W, mut lines: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
