//! Google Calendar API v3 Client
//!
//! Read-only access used by the calendar tables:
//! - Get calendar metadata
//! - List/get events (recurring events expanded into instances)

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::Page;
use super::segment;
use crate::common::AppResult;

pub struct CalendarApi {
    client: Arc<GoogleClient>,
}

super::google_api_wrapper!(CalendarApi);

/// Native filters for `events.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Free text search (`q`)
    pub query: Option<String>,
    /// RFC3339 lower bound on event end
    pub time_min: Option<String>,
    /// RFC3339 upper bound on event start
    pub time_max: Option<String>,
}

impl CalendarApi {
    /// Get calendar metadata by ID
    pub async fn get_calendar(&self, calendar_id: &str) -> AppResult<Value> {
        info!("Fetching calendar: {}", calendar_id);
        let path = format!("/calendars/{}", segment(calendar_id));
        self.client.get(&path, &[]).await
    }

    /// List one page of events in a calendar
    ///
    /// # Arguments
    /// * `calendar_id` - Calendar ID (use "primary" for the user's primary calendar)
    /// * `filter` - Text and time window filters
    /// * `max_results` - Page size
    /// * `page_token` - Continuation token from the previous page
    pub async fn list_events(
        &self,
        calendar_id: &str,
        filter: &EventFilter,
        max_results: u64,
        page_token: Option<&str>,
    ) -> AppResult<Page> {
        let mut query_params = vec![
            ("singleEvents", "true".to_string()),
            ("showDeleted", "false".to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(q) = &filter.query {
            query_params.push(("q", q.clone()));
        }
        if let Some(min) = &filter.time_min {
            query_params.push(("timeMin", min.clone()));
        }
        if let Some(max) = &filter.time_max {
            query_params.push(("timeMax", max.clone()));
        }
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let path = format!("/calendars/{}/events", segment(calendar_id));
        let response = self.client.get(&path, &query_params).await?;
        let page = Page::from_response(&response, "items");

        debug!("Retrieved {} events from {}", page.items.len(), calendar_id);
        Ok(page)
    }

    /// Get a specific event by ID
    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> AppResult<Value> {
        info!("Fetching event: {} from calendar: {}", event_id, calendar_id);
        let path = format!("/calendars/{}/events/{}", segment(calendar_id), segment(event_id));
        self.client.get(&path, &[]).await
    }
}
