//! Table adapters and the registry the server dispatches on.

pub mod activity_report;
pub mod calendar;
pub mod calendar_event;
pub mod docs;
pub mod drive;
pub mod drive_my_file;
pub mod gmail_draft;
pub mod gmail_message;
pub mod gmail_settings;
pub mod mobile_activity;
pub mod people;
pub mod people_contact_group;
pub mod spreadsheet;

use googleworkspace_protocol::TableDescriptor;
use once_cell::sync::Lazy;

use crate::table::Table;

static TABLES: Lazy<Vec<Box<dyn Table>>> = Lazy::new(|| {
    vec![
        Box::new(activity_report::ActivityReportTable::new()),
        Box::new(calendar::CalendarTable::new()),
        Box::new(calendar_event::CalendarEventTable::new()),
        Box::new(calendar_event::CalendarMyEventTable::new()),
        Box::new(docs::DocsTable::new()),
        Box::new(drive::DriveTable::new()),
        Box::new(drive_my_file::DriveMyFileTable::new()),
        Box::new(gmail_draft::GmailDraftTable::for_user()),
        Box::new(gmail_draft::GmailDraftTable::mine()),
        Box::new(gmail_message::GmailMessageTable::for_user()),
        Box::new(gmail_message::GmailMessageTable::mine()),
        Box::new(gmail_settings::GmailSettingsTable::for_user()),
        Box::new(gmail_settings::GmailSettingsTable::mine()),
        Box::new(mobile_activity::MobileActivityTable::new()),
        Box::new(people::PeopleTable::contacts()),
        Box::new(people::PeopleTable::directory()),
        Box::new(people_contact_group::PeopleContactGroupTable::new()),
        Box::new(spreadsheet::SpreadsheetTable::new()),
    ]
});

/// Look up a table by its full name.
pub fn find(name: &str) -> Option<&'static dyn Table> {
    TABLES.iter().find(|t| t.schema().name == name).map(|t| t.as_ref())
}

pub fn descriptors() -> Vec<TableDescriptor> {
    TABLES.iter().map(|t| t.schema().descriptor()).collect()
}
