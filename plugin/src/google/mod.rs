//! Google API Client Module
//!
//! Authenticated REST access to the Workspace APIs the tables read from.
//! Every call is read-only; each wrapper owns a shared `GoogleClient`.

pub mod calendar_api;
pub mod client;
pub mod common;
pub mod docs;
pub mod drive;
pub mod gmail;
pub mod people;
pub mod reports;
pub mod sheets;

pub use calendar_api::CalendarApi;
pub use client::GoogleClient;
pub use common::Page;
pub use docs::DocsApi;
pub use drive::DriveApi;
pub use gmail::GmailApi;
pub use people::PeopleApi;
pub use reports::ReportsApi;
pub use sheets::SheetsApi;

/// Read-only OAuth scopes.
pub mod scopes {
    pub const CALENDAR_READONLY: &str = "https://www.googleapis.com/auth/calendar.readonly";
    pub const DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";
    pub const GMAIL_READONLY: &str = "https://www.googleapis.com/auth/gmail.readonly";
    pub const CONTACTS_READONLY: &str = "https://www.googleapis.com/auth/contacts.readonly";
    pub const CONTACTS_OTHER_READONLY: &str = "https://www.googleapis.com/auth/contacts.other.readonly";
    pub const DIRECTORY_READONLY: &str = "https://www.googleapis.com/auth/directory.readonly";
    pub const DOCUMENTS_READONLY: &str = "https://www.googleapis.com/auth/documents.readonly";
    pub const SPREADSHEETS_READONLY: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
    pub const ADMIN_REPORTS_AUDIT_READONLY: &str = "https://www.googleapis.com/auth/admin.reports.audit.readonly";

    /// Scope set shared by every service except Admin Reports.
    pub const DEFAULT: &[&str] = &[
        CALENDAR_READONLY,
        DRIVE_READONLY,
        GMAIL_READONLY,
        CONTACTS_OTHER_READONLY,
        CONTACTS_READONLY,
        DIRECTORY_READONLY,
        DOCUMENTS_READONLY,
        SPREADSHEETS_READONLY,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Calendar,
    Drive,
    Gmail,
    People,
    Docs,
    Sheets,
    Reports,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::Calendar => "calendar",
            Service::Drive => "drive",
            Service::Gmail => "gmail",
            Service::People => "people",
            Service::Docs => "docs",
            Service::Sheets => "sheets",
            Service::Reports => "reports",
        }
    }

    fn host(&self) -> &'static str {
        match self {
            Service::Calendar | Service::Drive => "https://www.googleapis.com",
            Service::Gmail => "https://gmail.googleapis.com",
            Service::People => "https://people.googleapis.com",
            Service::Docs => "https://docs.googleapis.com",
            Service::Sheets => "https://sheets.googleapis.com",
            Service::Reports => "https://admin.googleapis.com",
        }
    }

    /// Versioned path prefix under the service host.
    pub fn path(&self) -> &'static str {
        match self {
            Service::Calendar => "/calendar/v3",
            Service::Drive => "/drive/v3",
            Service::Gmail => "/gmail/v1",
            Service::People => "/v1",
            Service::Docs => "/v1",
            Service::Sheets => "/v4",
            Service::Reports => "/admin/reports/v1",
        }
    }

    /// Base URL, optionally rooted somewhere other than Google.
    pub fn base_url(&self, api_root: Option<&str>) -> String {
        let root = api_root.unwrap_or(self.host()).trim_end_matches('/');
        format!("{}{}", root, self.path())
    }
}

/// Implement the standard Google API wrapper constructor pattern.
/// Each API struct holds a shared `client: Arc<GoogleClient>` field.
macro_rules! google_api_wrapper {
    ($name:ident) => {
        impl $name {
            /// Wrap an authenticated client bound to this API's base URL
            pub fn new(client: std::sync::Arc<crate::google::client::GoogleClient>) -> Self {
                Self { client }
            }
        }
    };
}

pub(crate) use google_api_wrapper;

/// Percent-encode one URL path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_urls() {
        assert_eq!(Service::Calendar.base_url(None), "https://www.googleapis.com/calendar/v3");
        assert_eq!(Service::Gmail.base_url(None), "https://gmail.googleapis.com/gmail/v1");
        assert_eq!(
            Service::Reports.base_url(Some("http://127.0.0.1:8080/")),
            "http://127.0.0.1:8080/admin/reports/v1"
        );
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("a@example.com"), "a%40example.com");
        assert_eq!(segment("Sheet1!A1:B2"), "Sheet1%21A1%3AB2");
    }
}
