//! `googleworkspace_drive_my_file`: files visible to the current user.

use async_trait::async_trait;
use googleworkspace_protocol::{Operator, QueryRequest};
use serde_json::Value;

use super::drive::name_and_created_filters;
use crate::common::AppResult;
use crate::table::qual::query_or_filters;
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

const PAGE_CAP: u64 = 1000;

fn file_filters(query: &QueryRequest) -> Vec<String> {
    let mut filters = name_and_created_filters(query);
    for qual in query.quals_for("mime_type") {
        let Some(mime_type) = qual.value.as_str() else {
            continue;
        };
        match qual.operator {
            Operator::Eq => filters.push(format!("mimeType = \"{}\"", mime_type)),
            Operator::NotEq => filters.push(format!("mimeType != \"{}\"", mime_type)),
            _ => {}
        }
    }
    filters
}

pub struct DriveMyFileTable {
    schema: TableSchema,
}

impl DriveMyFileTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::string("id", "The ID of the file."),
            Column::string("name", "The name of the file."),
            Column::string("mime_type", "The MIME type of the file."),
            Column::string("drive_id", "ID of the shared drive the file resides in."),
            Column::bool("owned_by_me", "Whether the user owns the file."),
            Column::bool("shared", "Whether the file has been shared."),
            Column::bool(
                "copy_requires_writer_permission",
                "Whether copying, printing, or downloading this file is disabled for readers and commenters.",
            ),
            Column::timestamp("created_time", "The time at which the file was created."),
            Column::string("description", "A short description of the file."),
            Column::bool("explicitly_trashed", "Whether the file has been explicitly trashed."),
            Column::string("file_extension", "The final component of fullFileExtension."),
            Column::string("folder_color_rgb", "The color for a folder or shortcut to a folder as an RGB hex string."),
            Column::string("full_file_extension", "The full file extension extracted from the name field."),
            Column::bool(
                "has_augmented_permissions",
                "Whether there are permissions directly on this file.",
            ),
            Column::bool("has_thumbnail", "Whether this file has a thumbnail."),
            Column::string("head_revision_id", "The ID of the file's head revision."),
            Column::string("icon_link", "A static, unauthenticated link to the file's icon."),
            Column::bool("is_app_authorized", "Whether the file was created or opened by the requesting app."),
            Column::string("md5_checksum", "The MD5 checksum for the content of the file."),
            Column::bool("modified_by_me", "Whether the file has been modified by this user."),
            Column::timestamp("modified_by_me_time", "The last time the file was modified by the user."),
            Column::timestamp("modified_time", "The last time the file was modified by anyone."),
            Column::string("original_file_name", "The original filename of the uploaded content.")
                .field("originalFilename"),
            Column::string("query", "Drive search query.").from_qual(),
            Column::int("quota_bytes_used", "The number of storage quota bytes used by the file."),
            Column::string("resource_key", "A key needed to access the item via a shared link."),
            Column::timestamp("shared_with_me_time", "The time at which the file was shared with the user."),
            Column::int("size", "The size of the file's content in bytes."),
            Column::bool("starred", "Whether the user has starred the file."),
            Column::string("thumbnail_link", "A short-lived link to the file's thumbnail."),
            Column::int("thumbnail_version", "The thumbnail version for use in thumbnail cache invalidation."),
            Column::bool("trashed", "Whether the file has been trashed."),
            Column::timestamp("trashed_time", "The time that the item was trashed."),
            Column::int("version", "A monotonically increasing version number for the file."),
            Column::bool("viewed_by_me", "Whether the file has been viewed by this user."),
            Column::timestamp("viewed_by_me_time", "The last time the file was viewed by the user."),
            Column::string("web_content_link", "A link for downloading the content of the file in a browser."),
            Column::string("web_view_link", "A link for opening the file in a relevant Google editor or viewer."),
            Column::bool("writers_can_share", "Whether users with writer permission can modify permissions."),
            Column::json("app_properties", "Private key-value pairs visible only to the requesting app."),
            Column::json("capabilities", "Capabilities the current user has on this file."),
            Column::json("content_hints", "Additional information about the content of the file."),
            Column::json("content_restrictions", "Restrictions for accessing the content of the file."),
            Column::json("export_links", "Links for exporting Docs Editors files to specific formats."),
            Column::json("image_media_metadata", "Additional metadata about image media."),
            Column::json("last_modifying_user", "The last user to modify the file."),
            Column::json("link_share_metadata", "Details about shared link URLs of the file."),
            Column::json("owners", "The owner of this file."),
            Column::json("parents", "The IDs of the parent folders which contain the file."),
            Column::json("permission_ids", "List of permission IDs for users with access to this file."),
            Column::json("permissions", "The full list of permissions for the file."),
            Column::json("properties", "Arbitrary key-value pairs visible to all apps."),
            Column::json("sharing_user", "The user who shared the file with the requesting user."),
            Column::json("shortcut_details", "Shortcut file details."),
            Column::json("spaces", "The list of spaces which contain the file."),
            Column::json("trashing_user", "The user who trashed the file explicitly."),
            Column::json("video_media_metadata", "Additional metadata about video media."),
        ];

        Self {
            schema: TableSchema::new(
                "googleworkspace_drive_my_file",
                "Files in the current user's Drive.",
                columns,
            )
            .list_keys(vec![
                KeyColumn::optional("name"),
                KeyColumn::optional("created_time").operators(&Operator::RANGE),
                KeyColumn::optional("mime_type").operators(&[Operator::Eq, Operator::NotEq]),
                KeyColumn::optional("query"),
            ])
            .get_keys(&["id"]),
        }
    }
}

#[async_trait]
impl Table for DriveMyFileTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let q = query_or_filters(ctx.query, file_filters(ctx.query));

        let api = ctx.conn.drive().await?;
        let api = &api;
        let q = q.as_deref();
        paginate(PAGE_CAP, sink, |size, token| async move {
            api.list_files(q, size, token.as_deref()).await
        })
        .await
    }

    async fn get(&self, ctx: &ScanContext<'_>) -> AppResult<Option<Value>> {
        let id = ctx.query.require_str("id")?;
        Ok(Some(ctx.conn.drive().await?.get_file(id).await?))
    }
}
