//! Google Sheets API v4 Client

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::client::GoogleClient;
use super::segment;
use crate::common::AppResult;

pub struct SheetsApi {
    client: Arc<GoogleClient>,
}

super::google_api_wrapper!(SheetsApi);

impl SheetsApi {
    /// Read a range of cell values
    ///
    /// # Arguments
    /// * `spreadsheet_id` - Spreadsheet ID
    /// * `range` - A1 notation (e.g., "Sheet1!A1:D10")
    ///
    /// # Returns
    /// ValueRange object with `range`, `majorDimension`, and `values`
    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> AppResult<Value> {
        info!("Reading range {} from spreadsheet {}", range, spreadsheet_id);
        let path = format!("/spreadsheets/{}/values/{}", segment(spreadsheet_id), segment(range));
        self.client.get(&path, &[]).await
    }
}
