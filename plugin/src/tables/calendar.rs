//! `googleworkspace_calendar`: metadata of one calendar.

use async_trait::async_trait;

use crate::common::AppResult;
use crate::table::{Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

pub struct CalendarTable {
    schema: TableSchema,
}

impl CalendarTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::string("id", "Identifier of the calendar."),
            Column::string("summary", "Title of the calendar."),
            Column::string("timezone", "The time zone of the calendar.").field("timeZone"),
            Column::string("description", "Description of the calendar."),
            Column::string("etag", "ETag of the resource."),
            Column::string("location", "Geographic location of the calendar as free-form text."),
            Column::json(
                "conference_properties",
                "Conferencing properties for this calendar, such as allowed conference types.",
            ),
        ];

        Self {
            schema: TableSchema::new("googleworkspace_calendar", "Metadata of the specified calendar.", columns)
                .list_keys(vec![KeyColumn::required("id")])
                .ignore(&[404]),
        }
    }
}

#[async_trait]
impl Table for CalendarTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let calendar_id = ctx.query.require_str("id")?;
        let calendar = ctx.conn.calendar().await?.get_calendar(calendar_id).await?;
        sink.push(calendar).await?;
        Ok(())
    }
}
