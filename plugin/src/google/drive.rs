//! Google Drive API v3 Client
//!
//! Shared drives and the caller's files, metadata only.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::Page;
use super::segment;
use crate::common::AppResult;

/// Ask Drive for every resource field plus the continuation token.
const ALL_FIELDS: &str = "*";

pub struct DriveApi {
    client: Arc<GoogleClient>,
}

super::google_api_wrapper!(DriveApi);

impl DriveApi {
    /// List one page of shared drives
    pub async fn list_drives(
        &self,
        q: Option<&str>,
        use_domain_admin_access: bool,
        page_size: u64,
        page_token: Option<&str>,
    ) -> AppResult<Page> {
        let mut query_params = vec![
            ("fields", ALL_FIELDS.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(q) = q {
            query_params.push(("q", q.to_string()));
        }
        if use_domain_admin_access {
            query_params.push(("useDomainAdminAccess", "true".to_string()));
        }
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let response = self.client.get("/drives", &query_params).await?;
        let page = Page::from_response(&response, "drives");
        debug!("Retrieved {} shared drives", page.items.len());
        Ok(page)
    }

    /// Get a shared drive by ID
    pub async fn get_drive(&self, drive_id: &str) -> AppResult<Value> {
        info!("Fetching shared drive: {}", drive_id);
        let path = format!("/drives/{}", segment(drive_id));
        self.client.get(&path, &[("fields", ALL_FIELDS.to_string())]).await
    }

    /// List one page of files visible to the caller
    ///
    /// # Arguments
    /// * `q` - Drive search query (e.g., `name = "report" and mimeType != "folder"`)
    pub async fn list_files(&self, q: Option<&str>, page_size: u64, page_token: Option<&str>) -> AppResult<Page> {
        let mut query_params = vec![
            ("fields", ALL_FIELDS.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(q) = q {
            query_params.push(("q", q.to_string()));
        }
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let response = self.client.get("/files", &query_params).await?;
        let page = Page::from_response(&response, "files");
        debug!("Retrieved {} files", page.items.len());
        Ok(page)
    }

    /// Get file metadata by ID
    pub async fn get_file(&self, file_id: &str) -> AppResult<Value> {
        info!("Fetching file: {}", file_id);
        let path = format!("/files/{}", segment(file_id));
        self.client.get(&path, &[("fields", ALL_FIELDS.to_string())]).await
    }
}
