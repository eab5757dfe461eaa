//! Google Docs API v1 Client

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::client::GoogleClient;
use super::segment;
use crate::common::AppResult;

pub struct DocsApi {
    client: Arc<GoogleClient>,
}

super::google_api_wrapper!(DocsApi);

impl DocsApi {
    /// Get the latest version of a document
    pub async fn get_document(&self, document_id: &str) -> AppResult<Value> {
        info!("Fetching document: {}", document_id);
        let path = format!("/documents/{}", segment(document_id));
        self.client.get(&path, &[]).await
    }
}
