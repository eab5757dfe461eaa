//! `googleworkspace_calendar_event` and `googleworkspace_calendar_my_event`.

use async_trait::async_trait;
use chrono::DateTime;
use googleworkspace_protocol::Operator;
use serde_json::Value;

use crate::common::AppResult;
use crate::google::calendar_api::EventFilter;
use crate::table::qual::{time_quals, TimeWindow};
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

const PAGE_CAP: u64 = 2500;
const PRIMARY: &str = "primary";

/// All-day events carry only `date`; read those as midnight UTC.
fn event_time(bound: Option<&Value>) -> Option<String> {
    let bound = bound?;
    if let Some(dt) = bound.get("dateTime").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        return Some(dt.to_string());
    }
    bound
        .get("date")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|d| format!("{}T00:00:00Z", d))
}

fn start_time(item: &Value) -> Value {
    event_time(item.get("start")).map(Value::String).unwrap_or(Value::Null)
}

fn end_time(item: &Value) -> Value {
    event_time(item.get("end")).map(Value::String).unwrap_or(Value::Null)
}

fn weekday(item: &Value) -> Value {
    event_time(item.get("start"))
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| Value::String(t.format("%A").to_string()))
        .unwrap_or(Value::Null)
}

fn tag_calendar(items: &mut [Value], calendar_id: &str) {
    for item in items.iter_mut() {
        if let Some(obj) = item.as_object_mut() {
            obj.insert("calendarId".into(), Value::String(calendar_id.to_string()));
        }
    }
}

fn event_columns() -> Vec<Column> {
    vec![
        Column::string("id", "Opaque identifier of the event."),
        Column::string("summary", "Title of the event."),
        Column::string("status", "Status of the event."),
        Column::string("calendar_id", "Identifier of the calendar."),
        Column::timestamp("start_time", "Start time of the event.").func(start_time),
        Column::timestamp("end_time", "End time of the event.").func(end_time),
        Column::string("day", "Day of the week the event starts on.").func(weekday),
        Column::string("hangout_link", "Link to the Google Hangout associated with this event."),
        Column::string("event_type", "Type of the event."),
        Column::string("html_link", "Link to this event in the Google Calendar web UI."),
        Column::bool("attendees_omitted", "Whether attendees may have been omitted from the event."),
        Column::string("color_id", "The color of the event."),
        Column::timestamp("created_at", "Creation time of the event.").field("created"),
        Column::string("description", "Description of the event."),
        Column::bool("end_time_unspecified", "Whether the end time is actually unspecified."),
        Column::string("etag", "ETag of the resource."),
        Column::bool(
            "guests_can_invite_others",
            "Whether attendees other than the organizer can invite others.",
        )
        .default(true),
        Column::bool("guests_can_modify", "Whether attendees other than the organizer can modify the event.")
            .default(false),
        Column::bool(
            "guests_can_see_other_guests",
            "Whether attendees other than the organizer can see who the attendees are.",
        )
        .default(true),
        Column::string("ical_uid", "Event identifier as defined in RFC5545.").field("iCalUID"),
        Column::string("location", "Geographic location of the event as free-form text."),
        Column::bool("locked", "Whether this is a locked event copy.").default(false),
        Column::bool("private_copy", "Whether event propagation is disabled.").default(false),
        Column::string("query", "Free text filter on events.").from_qual(),
        Column::string(
            "recurring_event_id",
            "For an instance of a recurring event, the id of the recurring event.",
        ),
        Column::int("sequence", "Sequence number as per iCalendar."),
        Column::string("timezone", "Time zone the start time is specified in.").field("start.timeZone"),
        Column::string("transparency", "Whether the event blocks time on the calendar."),
        Column::timestamp("updated_at", "Last modification time of the event.").field("updated"),
        Column::string("visibility", "Visibility of the event."),
        Column::json("attachments", "File attachments for the event."),
        Column::json("attendees", "Attendees of the event."),
        Column::json("conference_data", "Conference details, such as a Google Meet link."),
        Column::json("creator", "Creator of the event."),
        Column::json("extended_properties", "Extended properties of the event."),
        Column::json("organizer", "Organizer of the event."),
        Column::json(
            "original_start_time",
            "For an instance of a recurring event, the start time given by its recurrence.",
        ),
        Column::json("recurrence", "RRULE, EXRULE, RDATE and EXDATE lines of a recurring event."),
        Column::json("reminders", "Reminders for the authenticated user."),
        Column::json("source", "Source from which the event was created."),
    ]
}

pub struct CalendarEventTable {
    schema: TableSchema,
}

impl CalendarEventTable {
    pub fn new() -> Self {
        Self {
            schema: TableSchema::new(
                "googleworkspace_calendar_event",
                "Events scheduled on the specified calendar.",
                event_columns(),
            )
            .list_keys(vec![
                KeyColumn::required("calendar_id"),
                KeyColumn::optional("query"),
                KeyColumn::optional("start_time").operators(&Operator::RANGE),
            ])
            .get_keys(&["calendar_id", "id"])
            .ignore(&[404]),
        }
    }
}

#[async_trait]
impl Table for CalendarEventTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let calendar_id = ctx.query.require_str("calendar_id")?;
        let window = TimeWindow::calendar(&time_quals(ctx.query, "start_time"));
        let filter = EventFilter {
            query: ctx.query.equals_str("query").map(str::to_string),
            time_min: window.min,
            time_max: window.max,
        };

        let api = ctx.conn.calendar().await?;
        let api = &api;
        let filter = &filter;
        paginate(PAGE_CAP, sink, |size, token| async move {
            let mut page = api.list_events(calendar_id, filter, size, token.as_deref()).await?;
            tag_calendar(&mut page.items, calendar_id);
            Ok(page)
        })
        .await
    }

    async fn get(&self, ctx: &ScanContext<'_>) -> AppResult<Option<Value>> {
        let calendar_id = ctx.query.require_str("calendar_id")?;
        let event_id = ctx.query.require_str("id")?;

        let mut event = ctx.conn.calendar().await?.get_event(calendar_id, event_id).await?;
        tag_calendar(std::slice::from_mut(&mut event), calendar_id);
        Ok(Some(event))
    }
}

/// Events on the caller's primary calendar.
pub struct CalendarMyEventTable {
    schema: TableSchema,
}

impl CalendarMyEventTable {
    pub fn new() -> Self {
        Self {
            schema: TableSchema::new(
                "googleworkspace_calendar_my_event",
                "Events scheduled on the current user's primary calendar.",
                event_columns(),
            )
            .list_keys(vec![
                KeyColumn::optional("query"),
                KeyColumn::optional("start_time").operators(&Operator::RANGE),
                KeyColumn::optional("end_time").operators(&Operator::RANGE),
            ])
            .ignore(&[404, 403]),
        }
    }
}

#[async_trait]
impl Table for CalendarMyEventTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let window = TimeWindow::open(&time_quals(ctx.query, "start_time"), &time_quals(ctx.query, "end_time"));
        let filter = EventFilter {
            query: ctx.query.equals_str("query").map(str::to_string),
            time_min: window.min,
            time_max: window.max,
        };

        let api = ctx.conn.calendar().await?;
        let api = &api;
        let filter = &filter;
        paginate(PAGE_CAP, sink, |size, token| async move {
            let mut page = api.list_events(PRIMARY, filter, size, token.as_deref()).await?;
            // The primary calendar's summary is the owner's address.
            let owner = page.summary.clone().unwrap_or_else(|| PRIMARY.to_string());
            tag_calendar(&mut page.items, &owner);
            Ok(page)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::{connection, list_rows, mount_token};
    use crate::table::execute_get;
    use chrono::{TimeZone, Utc};
    use googleworkspace_protocol::{QualValue, QueryRequest};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_event_time_and_weekday() {
        let timed = json!({"start": {"dateTime": "2024-03-04T09:30:00+01:00"}, "end": {"dateTime": "2024-03-04T10:00:00+01:00"}});
        assert_eq!(start_time(&timed), json!("2024-03-04T09:30:00+01:00"));
        assert_eq!(weekday(&timed), json!("Monday"));

        let all_day = json!({"start": {"date": "2024-03-09"}, "end": {"date": "2024-03-10"}});
        assert_eq!(start_time(&all_day), json!("2024-03-09T00:00:00Z"));
        assert_eq!(end_time(&all_day), json!("2024-03-10T00:00:00Z"));
        assert_eq!(weekday(&all_day), json!("Saturday"));

        assert_eq!(start_time(&json!({})), Value::Null);
    }

    #[tokio::test]
    async fn test_lists_events_across_pages() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "me@example.com",
                "items": [{"id": "e3", "start": {"date": "2024-03-09"}, "end": {"date": "2024-03-10"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("timeMin", "2024-03-01T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "me@example.com",
                "items": [
                    {"id": "e1", "guestsCanModify": true, "start": {"dateTime": "2024-03-04T09:00:00Z"}},
                    {"id": "e2", "guestsCanInviteOthers": false}
                ],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_calendar_my_event").with_qual(
            "start_time",
            Operator::Ge,
            QualValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
        );
        let (rows, result) = list_rows(&CalendarMyEventTable::new(), &conn, &query).await.unwrap();

        assert_eq!(result.rows_streamed, 3);
        assert_eq!(rows[0]["calendar_id"], json!("me@example.com"));
        assert_eq!(rows[0]["guests_can_modify"], json!(true));
        assert_eq!(rows[0]["guests_can_invite_others"], json!(true));
        assert_eq!(rows[1]["guests_can_invite_others"], json!(false));
        assert_eq!(rows[1]["guests_can_modify"], json!(false));
        assert_eq!(rows[2]["day"], json!("Saturday"));
    }

    #[tokio::test]
    async fn test_start_time_window_and_limit() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/calendars/team%40example.com/events"))
            .and(query_param("timeMin", "2024-03-01T00:00:01.000Z"))
            .and(query_param("maxResults", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "e1"}],
                "nextPageToken": "more"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_calendar_event")
            .with_qual("calendar_id", Operator::Eq, QualValue::String("team@example.com".into()))
            .with_qual(
                "start_time",
                Operator::Gt,
                QualValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            )
            .with_columns(&["id", "calendar_id"])
            .with_limit(1);
        let (rows, _) = list_rows(&CalendarEventTable::new(), &conn, &query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["calendar_id"], json!("team@example.com"));
    }

    #[tokio::test]
    async fn test_get_event() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/calendars/primary/events/e9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e9", "summary": "Standup"})))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_calendar_event")
            .with_qual("calendar_id", Operator::Eq, QualValue::String("primary".into()))
            .with_qual("id", Operator::Eq, QualValue::String("e9".into()));
        let row = execute_get(&CalendarEventTable::new(), &conn, &query).await.unwrap().unwrap();

        assert_eq!(row["summary"], json!("Standup"));
        assert_eq!(row["calendar_id"], json!("primary"));
    }
}
