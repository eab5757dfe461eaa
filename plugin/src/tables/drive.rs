//! `googleworkspace_drive`: shared drives.

use async_trait::async_trait;
use googleworkspace_protocol::{Operator, QueryRequest};
use serde_json::Value;

use crate::common::AppResult;
use crate::table::qual::{drive_time_filter, query_or_filters, time_quals};
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

const PAGE_CAP: u64 = 100;

/// Drive search clauses for the `name` and `created_time` qualifiers.
pub(crate) fn name_and_created_filters(query: &QueryRequest) -> Vec<String> {
    let mut filters = Vec::new();
    if let Some(name) = query.equals_str("name") {
        filters.push(format!("name = \"{}\"", name));
    }
    filters.extend(
        time_quals(query, "created_time")
            .into_iter()
            .filter_map(|(op, t)| drive_time_filter("createdTime", op, t)),
    );
    filters
}

pub struct DriveTable {
    schema: TableSchema,
}

impl DriveTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::string("id", "The ID of this shared drive which is also the ID of the top level folder."),
            Column::string("name", "The name of this shared drive."),
            Column::timestamp("created_time", "The time at which the shared drive was created."),
            Column::bool("hidden", "Whether the shared drive is hidden from default view."),
            Column::bool(
                "admin_managed_restrictions",
                "Whether administrative privileges on this shared drive are required to modify restrictions.",
            )
            .field("restrictions.adminManagedRestrictions"),
            Column::string("background_image_link", "A short-lived link to this shared drive's background image."),
            Column::string("color_rgb", "The color of this shared drive as an RGB hex string."),
            Column::bool(
                "copy_requires_writer_permission",
                "Whether the options to copy, print, or download files inside this shared drive are disabled for readers and commenters.",
            )
            .field("restrictions.copyRequiresWriterPermission"),
            Column::bool(
                "domain_users_only",
                "Whether access to this shared drive and items inside it is restricted to users of the domain.",
            )
            .field("restrictions.domainUsersOnly"),
            Column::bool(
                "drive_members_only",
                "Whether access to items inside this shared drive is restricted to its members.",
            )
            .field("restrictions.driveMembersOnly"),
            Column::string("theme_id", "The ID of the theme from which the background image and color are set."),
            Column::bool(
                "use_domain_admin_access",
                "Issue the request as a domain administrator.",
            )
            .from_qual(),
            Column::string("query", "Drive search query.").from_qual(),
            Column::json("background_image_file", "An image file and cropping parameters for the background image."),
            Column::json("capabilities", "Capabilities the current user has on this shared drive."),
        ];

        Self {
            schema: TableSchema::new("googleworkspace_drive", "Shared drives in the Google Workspace domain.", columns)
                .list_keys(vec![
                    KeyColumn::optional("name"),
                    KeyColumn::optional("created_time").operators(&Operator::RANGE),
                    KeyColumn::optional("use_domain_admin_access"),
                    KeyColumn::optional("query"),
                ])
                .get_keys(&["id"]),
        }
    }
}

#[async_trait]
impl Table for DriveTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let q = query_or_filters(ctx.query, name_and_created_filters(ctx.query));
        let admin = ctx.query.equals_bool("use_domain_admin_access").unwrap_or(false);

        let api = ctx.conn.drive().await?;
        let api = &api;
        let q = q.as_deref();
        paginate(PAGE_CAP, sink, |size, token| async move {
            api.list_drives(q, admin, size, token.as_deref()).await
        })
        .await
    }

    async fn get(&self, ctx: &ScanContext<'_>) -> AppResult<Option<Value>> {
        let id = ctx.query.require_str("id")?;
        Ok(Some(ctx.conn.drive().await?.get_drive(id).await?))
    }
}
