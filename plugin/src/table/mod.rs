//! Table framework
//!
//! A table declares its schema and fetches raw API items; this module turns
//! those items into projected rows, enforces key columns, applies the
//! ignore-error policy, and stops at the row limit or on cancellation.

pub mod paginate;
pub mod qual;
pub mod schema;
pub mod transform;

use async_trait::async_trait;
use googleworkspace_protocol::{ListResult, QueryRequest};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::{AppResult, PluginError};
use crate::session::Connection;

pub use paginate::paginate;
pub use qual::QualLookup;
pub use schema::{Column, IgnoreConfig, KeyColumn, TableSchema};

pub type Row = Map<String, Value>;

/// Everything a scan needs besides the sink.
pub struct ScanContext<'a> {
    pub conn: &'a Connection,
    pub query: &'a QueryRequest,
    pub cancel: &'a CancellationToken,
}

impl ScanContext<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[async_trait]
pub trait Table: Send + Sync {
    fn schema(&self) -> &TableSchema;

    /// Push every matching item into `sink`.
    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()>;

    /// Fetch one item by its get key columns.
    async fn get(&self, _ctx: &ScanContext<'_>) -> AppResult<Option<Value>> {
        Err(PluginError::invalid_query(format!(
            "table {} does not support get",
            self.schema().name
        )))
    }

    /// Merge the extra per-row data behind `hydrated` columns into `item`.
    async fn hydrate(&self, _ctx: &ScanContext<'_>, _item: &mut Value) -> AppResult<()> {
        Ok(())
    }
}

/// Destination for projected rows.
#[async_trait]
pub trait RowEmitter: Send {
    async fn emit(&mut self, row: Row) -> AppResult<()>;
}

#[async_trait]
impl RowEmitter for Vec<Row> {
    async fn emit(&mut self, row: Row) -> AppResult<()> {
        self.push(row);
        Ok(())
    }
}

/// Keeps the last row; used by single-row gets.
#[async_trait]
impl RowEmitter for Option<Row> {
    async fn emit(&mut self, row: Row) -> AppResult<()> {
        *self = Some(row);
        Ok(())
    }
}

/// Receives raw items, hydrates and projects them, and forwards rows.
pub struct RowSink<'a> {
    table: &'a dyn Table,
    ctx: &'a ScanContext<'a>,
    hydrate: bool,
    limit: Option<u64>,
    emitted: u64,
    emit: &'a mut dyn RowEmitter,
}

impl<'a> RowSink<'a> {
    pub fn new(table: &'a dyn Table, ctx: &'a ScanContext<'a>, emit: &'a mut dyn RowEmitter) -> Self {
        Self {
            table,
            ctx,
            hydrate: table.schema().needs_hydrate(ctx.query),
            limit: ctx.query.limit,
            emitted: 0,
            emit,
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn is_done(&self) -> bool {
        self.ctx.is_cancelled() || self.limit.is_some_and(|limit| self.emitted >= limit)
    }

    /// Page size to request: the API cap, shrunk to the rows still wanted.
    pub fn page_size(&self, cap: u64) -> u64 {
        match self.limit {
            Some(limit) => cap.min(limit.saturating_sub(self.emitted)).max(1),
            None => cap,
        }
    }

    /// Emit one item. Returns whether the scan should keep going.
    pub async fn push(&mut self, mut item: Value) -> AppResult<bool> {
        if self.is_done() {
            return Ok(false);
        }

        if self.hydrate {
            if let Err(e) = self.table.hydrate(self.ctx, &mut item).await {
                if !self.table.schema().ignore.ignores_get(&e) {
                    return Err(e);
                }
                warn!("Skipping hydrate for {} row: {}", self.table.schema().name, e);
            }
        }

        let row = self.table.schema().project(&item, self.ctx.query);
        self.emit.emit(row).await?;
        self.emitted += 1;

        Ok(!self.is_done())
    }
}

/// Run a list scan, streaming each row through `emit`.
pub async fn execute_list(
    table: &dyn Table,
    conn: &Connection,
    query: &QueryRequest,
    cancel: &CancellationToken,
    emit: &mut dyn RowEmitter,
) -> AppResult<ListResult> {
    let schema = table.schema();
    schema.validate_columns(query)?;
    schema.check_list_keys(query)?;

    info!("Listing {} (limit: {:?})", schema.name, query.limit);
    let ctx = ScanContext { conn, query, cancel };
    let mut sink = RowSink::new(table, &ctx, emit);

    match table.list(&ctx, &mut sink).await {
        Ok(()) => {}
        Err(e) if schema.ignore.ignores_list(&e) => {
            debug!("Ignoring list error for {}: {}", schema.name, e);
        }
        Err(e) => return Err(e),
    }

    let result = ListResult {
        rows_streamed: sink.emitted(),
        cancelled: ctx.is_cancelled(),
    };
    info!(
        "Listed {} rows from {}{}",
        result.rows_streamed,
        schema.name,
        if result.cancelled { " (cancelled)" } else { "" }
    );
    Ok(result)
}

/// Fetch a single row by the table's get key columns.
pub async fn execute_get(table: &dyn Table, conn: &Connection, query: &QueryRequest) -> AppResult<Option<Row>> {
    let schema = table.schema();
    schema.validate_columns(query)?;
    schema.check_get_keys(query)?;

    info!("Getting row from {}", schema.name);
    let cancel = CancellationToken::new();
    let ctx = ScanContext {
        conn,
        query,
        cancel: &cancel,
    };

    let item = match table.get(&ctx).await {
        Ok(Some(item)) => item,
        Ok(None) => return Ok(None),
        Err(e) if schema.ignore.ignores_get(&e) => {
            debug!("Ignoring get error for {}: {}", schema.name, e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let mut found: Option<Row> = None;
    let mut sink = RowSink::new(table, &ctx, &mut found);
    sink.push(item).await?;
    drop(sink);

    Ok(found)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for table tests against a mock Google endpoint.

    use googleworkspace_protocol::ConnectionConfig;

    use super::*;

    const TEST_PRIVATE_KEY: &str = include_str!("../../testdata/service_account_key.pem");

    /// Connection whose token and API calls both go to `server_uri`.
    pub fn connection(server_uri: &str) -> Connection {
        let key = serde_json::json!({
            "type": "service_account",
            "client_email": "reader@project.iam.gserviceaccount.com",
            "private_key": TEST_PRIVATE_KEY,
            "private_key_id": "kid-1",
            "token_uri": format!("{}/token", server_uri),
        });
        let config = ConnectionConfig {
            credentials: Some(key.to_string()),
            impersonated_user_email: Some("admin@example.com".into()),
            ..Default::default()
        };
        Connection::new(config)
            .expect("http client")
            .with_api_root(server_uri)
    }

    /// Answer token requests with a fixed bearer token.
    pub async fn mount_token(server: &wiremock::MockServer) {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, ResponseTemplate};

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;
    }

    pub async fn list_rows(table: &dyn Table, conn: &Connection, query: &QueryRequest) -> AppResult<(Vec<Row>, ListResult)> {
        let cancel = CancellationToken::new();
        let mut rows: Vec<Row> = Vec::new();
        let result = execute_list(table, conn, query, &cancel, &mut rows).await?;
        Ok((rows, result))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{connection, list_rows};
    use super::*;
    use crate::google::Page;
    use googleworkspace_protocol::{Operator, QualValue};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Collects rows and cancels the scan after `after` of them.
    struct CancelAfter {
        rows: Vec<Row>,
        after: usize,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl RowEmitter for CancelAfter {
        async fn emit(&mut self, row: Row) -> AppResult<()> {
            self.rows.push(row);
            if self.rows.len() == self.after {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    struct ClosedOutput;

    #[async_trait]
    impl RowEmitter for ClosedOutput {
        async fn emit(&mut self, _row: Row) -> AppResult<()> {
            Err(PluginError::Internal("output closed".into()))
        }
    }

    /// Serves `total` numbered items in pages, failing with `fail_status` if set.
    struct Numbers {
        schema: TableSchema,
        total: u64,
        fail_status: Option<u16>,
        page_sizes: std::sync::Mutex<Vec<u64>>,
        hydrates: AtomicUsize,
    }

    impl Numbers {
        fn new(total: u64) -> Self {
            Self {
                schema: TableSchema::new(
                    "googleworkspace_numbers",
                    "Numbers.",
                    vec![
                        Column::int("n", "Number."),
                        Column::string("label", "Label.").hydrated(),
                    ],
                )
                .get_keys(&["n"])
                .ignore(&[404]),
                total,
                fail_status: None,
                page_sizes: std::sync::Mutex::new(Vec::new()),
                hydrates: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Table for Numbers {
        fn schema(&self) -> &TableSchema {
            &self.schema
        }

        async fn list(&self, _ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
            if let Some(status) = self.fail_status {
                return Err(PluginError::Upstream {
                    status,
                    message: "nope".into(),
                });
            }
            let total = self.total;
            let sizes = &self.page_sizes;
            paginate(3, sink, |size, token| async move {
                sizes.lock().unwrap().push(size);
                let start: u64 = token.map(|t| t.parse().unwrap()).unwrap_or(0);
                let end = (start + size).min(total);
                Ok(Page {
                    items: (start..end).map(|n| json!({ "n": n + 1 })).collect(),
                    next_page_token: (end < total).then(|| end.to_string()),
                    summary: None,
                })
            })
            .await
        }

        async fn get(&self, ctx: &ScanContext<'_>) -> AppResult<Option<Value>> {
            let n = ctx.query.equals_i64("n").unwrap_or(0);
            if n as u64 > self.total {
                return Err(PluginError::Upstream {
                    status: 404,
                    message: "missing".into(),
                });
            }
            Ok(Some(json!({ "n": n })))
        }

        async fn hydrate(&self, _ctx: &ScanContext<'_>, item: &mut Value) -> AppResult<()> {
            self.hydrates.fetch_add(1, Ordering::SeqCst);
            let label = format!("#{}", item["n"]);
            item["label"] = json!(label);
            Ok(())
        }
    }

    fn conn() -> Connection {
        connection("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn test_streams_all_pages() {
        let table = Numbers::new(7);
        let (rows, result) = list_rows(&table, &conn(), &QueryRequest::new("googleworkspace_numbers"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(result, ListResult { rows_streamed: 7, cancelled: false });
        assert_eq!(rows[6]["n"], json!(7));
        assert_eq!(*table.page_sizes.lock().unwrap(), vec![3, 3, 3]);
    }

    #[tokio::test]
    async fn test_limit_shrinks_pages_and_stops() {
        let table = Numbers::new(100);
        let query = QueryRequest::new("googleworkspace_numbers").with_limit(4);
        let (rows, result) = list_rows(&table, &conn(), &query).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(result.rows_streamed, 4);
        assert_eq!(*table.page_sizes.lock().unwrap(), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_hydrate_only_when_requested() {
        let table = Numbers::new(2);
        let ids_only = QueryRequest::new("googleworkspace_numbers").with_columns(&["n"]);
        let (rows, _) = list_rows(&table, &conn(), &ids_only).await.unwrap();
        assert_eq!(table.hydrates.load(Ordering::SeqCst), 0);
        assert!(rows[0].get("label").is_none());

        let with_label = ids_only.with_columns(&["n", "label"]);
        let (rows, _) = list_rows(&table, &conn(), &with_label).await.unwrap();
        assert_eq!(table.hydrates.load(Ordering::SeqCst), 2);
        assert_eq!(rows[1]["label"], json!("#2"));
    }

    #[tokio::test]
    async fn test_cancelled_scan_ends_without_error() {
        let table = Numbers::new(10);
        let cancel = CancellationToken::new();
        let query = QueryRequest::new("googleworkspace_numbers");
        let mut emit = CancelAfter {
            rows: Vec::new(),
            after: 2,
            cancel: cancel.clone(),
        };
        let result = execute_list(&table, &conn(), &query, &cancel, &mut emit).await.unwrap();
        assert_eq!(result, ListResult { rows_streamed: 2, cancelled: true });
        assert_eq!(emit.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_emit_failure_stops_scan() {
        let table = Numbers::new(10);
        let cancel = CancellationToken::new();
        let query = QueryRequest::new("googleworkspace_numbers");
        let err = execute_list(&table, &conn(), &query, &cancel, &mut ClosedOutput)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Internal(_)));
    }

    #[tokio::test]
    async fn test_ignored_and_propagated_list_errors() {
        let mut table = Numbers::new(1);
        table.fail_status = Some(404);
        let (rows, _) = list_rows(&table, &conn(), &QueryRequest::new("googleworkspace_numbers"))
            .await
            .unwrap();
        assert!(rows.is_empty());

        table.fail_status = Some(403);
        let err = list_rows(&table, &conn(), &QueryRequest::new("googleworkspace_numbers"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_get_projects_and_ignores_not_found() {
        let table = Numbers::new(3);
        let query = |n| QueryRequest::new("googleworkspace_numbers").with_qual("n", Operator::Eq, QualValue::Int(n));

        let row = execute_get(&table, &conn(), &query(2)).await.unwrap().unwrap();
        assert_eq!(row["n"], json!(2));
        assert_eq!(row["label"], json!("#2"));

        assert!(execute_get(&table, &conn(), &query(9)).await.unwrap().is_none());

        let no_key = QueryRequest::new("googleworkspace_numbers");
        assert!(matches!(
            execute_get(&table, &conn(), &no_key).await,
            Err(PluginError::InvalidQuery(_))
        ));
    }
}
