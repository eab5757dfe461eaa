//! `googleworkspace_spreadsheet`: cell values of one range.

use async_trait::async_trait;

use crate::common::AppResult;
use crate::table::{Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

pub struct SpreadsheetTable {
    schema: TableSchema,
}

impl SpreadsheetTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::string("id", "The ID of the spreadsheet.").from_qual(),
            Column::string("range", "The range the values cover, in A1 notation."),
            Column::string(
                "major_dimension",
                "The major dimension of the values: DIMENSION_UNSPECIFIED, ROWS or COLUMNS.",
            ),
            Column::json("values", "The cell data as an array of arrays, one inner array per major dimension."),
        ];

        Self {
            schema: TableSchema::new("googleworkspace_spreadsheet", "Values read from a spreadsheet range.", columns)
                .list_keys(vec![KeyColumn::required("id"), KeyColumn::required("range")]),
        }
    }
}

#[async_trait]
impl Table for SpreadsheetTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let id = ctx.query.require_str("id")?;
        let range = ctx.query.require_str("range")?;
        let values = ctx.conn.sheets().await?.get_values(id, range).await?;
        sink.push(values).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::{connection, list_rows, mount_token};
    use googleworkspace_protocol::{Operator, QualValue, QueryRequest};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(id: &str, range: Option<&str>) -> QueryRequest {
        let q = QueryRequest::new("googleworkspace_spreadsheet").with_qual("id", Operator::Eq, QualValue::String(id.into()));
        match range {
            Some(r) => q.with_qual("range", Operator::Eq, QualValue::String(r.into())),
            None => q,
        }
    }

    #[tokio::test]
    async fn test_values_row() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/Budget%21A1%3AB2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "Budget!A1:B2",
                "majorDimension": "ROWS",
                "values": [["Item", "Cost"], ["Coffee", "3"]]
            })))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let (rows, _) = list_rows(&SpreadsheetTable::new(), &conn, &query("sheet-1", Some("Budget!A1:B2")))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("sheet-1"));
        assert_eq!(rows[0]["range"], json!("Budget!A1:B2"));
        assert_eq!(rows[0]["major_dimension"], json!("ROWS"));
        assert_eq!(rows[0]["values"][1], json!(["Coffee", "3"]));
    }

    #[tokio::test]
    async fn test_range_is_required() {
        let conn = connection("http://127.0.0.1:9");
        assert!(list_rows(&SpreadsheetTable::new(), &conn, &query("sheet-1", None)).await.is_err());
    }
}
