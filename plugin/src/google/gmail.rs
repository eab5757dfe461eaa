//! Gmail API v1 Client
//!
//! Provides read-only access used by the Gmail tables:
//! - List/get messages and drafts
//! - Mailbox profile
//! - Mailbox settings (language, forwarding, IMAP, POP, vacation, delegates)

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::{extract_array, Page};
use super::segment;
use crate::common::AppResult;

pub struct GmailApi {
    client: Arc<GoogleClient>,
}

super::google_api_wrapper!(GmailApi);

/// Single-object endpoints under `users/{user}/settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailSetting {
    Language,
    AutoForwarding,
    Imap,
    Pop,
    Vacation,
}

impl MailSetting {
    fn path(&self) -> &'static str {
        match self {
            MailSetting::Language => "language",
            MailSetting::AutoForwarding => "autoForwarding",
            MailSetting::Imap => "imap",
            MailSetting::Pop => "pop",
            MailSetting::Vacation => "vacation",
        }
    }
}

impl GmailApi {
    async fn list(
        &self,
        user_id: &str,
        resource: &str,
        query: Option<&str>,
        max_results: u64,
        page_token: Option<&str>,
    ) -> AppResult<Page> {
        let mut query_params = vec![("maxResults", max_results.to_string())];
        if let Some(q) = query {
            query_params.push(("q", q.to_string()));
        }
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let path = format!("/users/{}/{}", segment(user_id), resource);
        let response = self.client.get(&path, &query_params).await?;
        let page = Page::from_response(&response, resource);

        debug!("Retrieved {} {} for {}", page.items.len(), resource, user_id);
        Ok(page)
    }

    /// List one page of message stubs (`id`, `threadId`)
    ///
    /// # Arguments
    /// * `user_id` - Mailbox owner (email or "me")
    /// * `query` - Gmail search query (same syntax as web UI)
    pub async fn list_messages(
        &self,
        user_id: &str,
        query: Option<&str>,
        max_results: u64,
        page_token: Option<&str>,
    ) -> AppResult<Page> {
        self.list(user_id, "messages", query, max_results, page_token).await
    }

    /// Get a message by ID in full format
    pub async fn get_message(&self, user_id: &str, message_id: &str) -> AppResult<Value> {
        info!("Fetching message: {}", message_id);
        let path = format!("/users/{}/messages/{}", segment(user_id), segment(message_id));
        self.client.get(&path, &[("format", "full".to_string())]).await
    }

    /// List one page of draft stubs (`id`, `message.id`, `message.threadId`)
    pub async fn list_drafts(
        &self,
        user_id: &str,
        query: Option<&str>,
        max_results: u64,
        page_token: Option<&str>,
    ) -> AppResult<Page> {
        self.list(user_id, "drafts", query, max_results, page_token).await
    }

    /// Get a draft by ID, including its full message
    pub async fn get_draft(&self, user_id: &str, draft_id: &str) -> AppResult<Value> {
        info!("Fetching draft: {}", draft_id);
        let path = format!("/users/{}/drafts/{}", segment(user_id), segment(draft_id));
        self.client.get(&path, &[("format", "full".to_string())]).await
    }

    /// Mailbox profile (`emailAddress`, `messagesTotal`, `threadsTotal`, `historyId`)
    pub async fn get_profile(&self, user_id: &str) -> AppResult<Value> {
        info!("Fetching Gmail profile for {}", user_id);
        let path = format!("/users/{}/profile", segment(user_id));
        self.client.get(&path, &[]).await
    }

    pub async fn get_setting(&self, user_id: &str, setting: MailSetting) -> AppResult<Value> {
        let path = format!("/users/{}/settings/{}", segment(user_id), setting.path());
        self.client.get(&path, &[]).await
    }

    /// Delegates with access to the mailbox
    pub async fn list_delegates(&self, user_id: &str) -> AppResult<Vec<Value>> {
        let path = format!("/users/{}/settings/delegates", segment(user_id));
        let response = self.client.get(&path, &[]).await?;
        Ok(extract_array(&response, "delegates"))
    }
}
