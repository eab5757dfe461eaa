//! `googleworkspace_docs`: the latest version of one document.

use async_trait::async_trait;

use crate::common::AppResult;
use crate::table::{Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

pub struct DocsTable {
    schema: TableSchema,
}

impl DocsTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::string("document_id", "The ID of the document."),
            Column::string("title", "The title of the document."),
            Column::string(
                "suggestions_view_mode",
                "The suggestions view mode applied to the document.",
            ),
            Column::string("revision_id", "The revision ID of the document."),
            Column::json("body", "The main body of the document."),
            Column::json("document_style", "The style of the document."),
            Column::json("footers", "The footers in the document, keyed by footer ID."),
            Column::json("footnotes", "The footnotes in the document, keyed by footnote ID."),
            Column::json("headers", "The headers in the document, keyed by header ID."),
            Column::json("inline_objects", "The inline objects in the document, keyed by object ID."),
            Column::json("lists", "The lists in the document, keyed by list ID."),
            Column::json("named_ranges", "The named ranges in the document, keyed by name."),
            Column::json("named_styles", "The named styles, one entry per named style type.").field("namedStyles.styles"),
            Column::json("positioned_objects", "The positioned objects in the document, keyed by object ID."),
            Column::json(
                "suggested_document_style_changes",
                "Suggested changes to the style of the document, keyed by suggestion ID.",
            ),
            Column::json(
                "suggested_named_style_changes",
                "Suggested changes to the named styles of the document, keyed by suggestion ID.",
            ),
        ];

        Self {
            schema: TableSchema::new("googleworkspace_docs", "Latest version of the specified document.", columns)
                .list_keys(vec![KeyColumn::required("document_id")]),
        }
    }
}

#[async_trait]
impl Table for DocsTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let document_id = ctx.query.require_str("document_id")?;
        let document = ctx.conn.docs().await?.get_document(document_id).await?;
        sink.push(document).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PluginError;
    use crate::table::testing::{connection, list_rows, mount_token};
    use googleworkspace_protocol::{Operator, QualValue, QueryRequest};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_document_row() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/doc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documentId": "doc-1",
                "title": "Roadmap",
                "revisionId": "rev-9",
                "namedStyles": {"styles": [{"namedStyleType": "NORMAL_TEXT"}]}
            })))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_docs")
            .with_qual("document_id", Operator::Eq, QualValue::String("doc-1".into()))
            .with_columns(&["document_id", "title", "named_styles", "footers"]);
        let (rows, _) = list_rows(&DocsTable::new(), &conn, &query).await.unwrap();

        assert_eq!(rows[0]["document_id"], json!("doc-1"));
        assert_eq!(rows[0]["title"], json!("Roadmap"));
        assert_eq!(rows[0]["named_styles"], json!([{"namedStyleType": "NORMAL_TEXT"}]));
        assert_eq!(rows[0]["footers"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_requires_document_id() {
        let conn = connection("http://127.0.0.1:9");
        let err = list_rows(&DocsTable::new(), &conn, &QueryRequest::new("googleworkspace_docs"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidQuery(_)));
    }
}
