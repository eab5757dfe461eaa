//! `googleworkspace_people_contact_group`
//!
//! Each page of groups is re-fetched through `contactGroups.batchGet` so the
//! rows carry their member lists.

use async_trait::async_trait;
use serde_json::Value;

use crate::common::AppResult;
use crate::google::people::DEFAULT_MAX_MEMBERS;
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

const PAGE_CAP: u64 = 200;

pub struct PeopleContactGroupTable {
    schema: TableSchema,
}

impl PeopleContactGroupTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::string("resource_name", "The resource name for the contact group, assigned by the server."),
            Column::string(
                "name",
                "The contact group name set by the group owner or a system provided name for system groups.",
            ),
            Column::string("group_type", "The contact group type."),
            Column::string(
                "formatted_name",
                "The name translated and formatted in the viewer's account locale.",
            ),
            Column::bool("deleted", "Whether the contact group resource has been deleted.").field("metadata.deleted"),
            Column::int(
                "max_members",
                "Maximum number of members to return per group. Default is 2500.",
            )
            .from_qual(),
            Column::int("member_count", "The total number of contacts in the group.").default(0),
            Column::timestamp("updated_time", "The time the group was last updated.").field("metadata.updateTime"),
            Column::json("client_data", "The group's client data."),
            Column::json("member_resource_names", "Resource names of the contacts in the group."),
        ];

        Self {
            schema: TableSchema::new(
                "googleworkspace_people_contact_group",
                "Contact groups owned by the authenticated user.",
                columns,
            )
            .list_keys(vec![KeyColumn::optional("max_members")])
            .ignore(&[404, 403]),
        }
    }
}

fn resource_names(groups: &[Value]) -> Vec<String> {
    groups
        .iter()
        .filter_map(|g| g.get("resourceName").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Table for PeopleContactGroupTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let max_members = ctx.query.equals_i64("max_members").unwrap_or(DEFAULT_MAX_MEMBERS);

        let api = ctx.conn.people().await?;
        let api = &api;
        paginate(PAGE_CAP, sink, |size, token| async move {
            let mut page = api.list_contact_groups(size, token.as_deref()).await?;
            let names = resource_names(&page.items);
            if !names.is_empty() {
                page.items = api.batch_get_contact_groups(&names, max_members).await?;
            }
            Ok(page)
        })
        .await
    }
}
