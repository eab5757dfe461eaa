//! Admin SDK Reports API v1 Client
//!
//! Audit activity records per application.

use std::sync::Arc;

use tracing::debug;

use super::client::GoogleClient;
use super::common::Page;
use super::segment;
use crate::common::AppResult;

/// Applications accepted by `activities.list`.
pub const APPLICATIONS: &[&str] = &[
    "access_transparency",
    "admin",
    "calendar",
    "chat",
    "drive",
    "gcp",
    "gplus",
    "groups",
    "groups_enterprise",
    "jamboard",
    "login",
    "meet",
    "mobile",
    "rules",
    "saml",
    "token",
    "user_accounts",
    "context_aware_access",
    "chrome",
    "data_studio",
    "keep",
    "vault",
    "gemini_in_workspace_apps",
];

pub fn is_supported_application(name: &str) -> bool {
    APPLICATIONS.contains(&name)
}

/// Native filters for `activities.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// `all` when unset
    pub user_key: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub actor_ip_address: Option<String>,
    pub event_name: Option<String>,
}

pub struct ReportsApi {
    client: Arc<GoogleClient>,
}

super::google_api_wrapper!(ReportsApi);

impl ReportsApi {
    /// List one page of activities for an application
    pub async fn list_activities(
        &self,
        application_name: &str,
        filter: &ActivityFilter,
        max_results: u64,
        page_token: Option<&str>,
    ) -> AppResult<Page> {
        let user_key = filter.user_key.as_deref().unwrap_or("all");

        let mut query_params = vec![("maxResults", max_results.to_string())];
        let optional = [
            ("startTime", &filter.start_time),
            ("endTime", &filter.end_time),
            ("actorIpAddress", &filter.actor_ip_address),
            ("eventName", &filter.event_name),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                query_params.push((name, v.clone()));
            }
        }
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let path = format!(
            "/activity/users/{}/applications/{}",
            segment(user_key),
            segment(application_name)
        );
        let response = self.client.get(&path, &query_params).await?;
        let page = Page::from_response(&response, "items");

        debug!("Retrieved {} {} activities", page.items.len(), application_name);
        Ok(page)
    }
}
