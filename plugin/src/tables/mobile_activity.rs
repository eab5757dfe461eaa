//! `googleworkspace_admin_reports_mobile_activity`: device audit events.

use async_trait::async_trait;
use googleworkspace_protocol::Operator;
use serde_json::Value;

use super::activity_report::activity_filter;
use crate::common::AppResult;
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

const APPLICATION: &str = "mobile";
const PAGE_CAP: u64 = 1000;

/// Synthetic key holding the event name a row is reported under.
const MATCHED_EVENT: &str = "matchedEventName";

/// First value of the named parameter across an activity's events.
fn event_parameter(activity: &Value, name: &str) -> Value {
    let Some(events) = activity.get("events").and_then(Value::as_array) else {
        return Value::Null;
    };
    events
        .iter()
        .filter_map(|e| e.get("parameters").and_then(Value::as_array))
        .flatten()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|p| ["value", "intValue", "boolValue"].iter().find_map(|k| p.get(*k)))
        .cloned()
        .unwrap_or(Value::Null)
}

fn device_id(activity: &Value) -> Value {
    event_parameter(activity, "DEVICE_ID")
}

fn device_model(activity: &Value) -> Value {
    event_parameter(activity, "DEVICE_MODEL")
}

/// The queried event name, else the activity's first named event.
fn matched_event_name(activity: &Value, queried: Option<&str>) -> Option<String> {
    if let Some(name) = queried {
        return Some(name.to_string());
    }
    activity
        .get("events")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|e| e.get("name").and_then(Value::as_str))
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

pub struct MobileActivityTable {
    schema: TableSchema,
}

impl MobileActivityTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::timestamp("time", "Time of occurrence of the activity.").field("id.time"),
            Column::string("actor_email", "Email address of the actor.").field("actor.email"),
            Column::string("event_name", "Name of the device event.").field(MATCHED_EVENT),
            Column::string("unique_qualifier", "Unique qualifier ID for this activity.").field("id.uniqueQualifier"),
            Column::string("application_name", "Application name to which the event belongs.")
                .field("id.applicationName"),
            Column::string("device_id", "ID of the device.").func(device_id),
            Column::string("device_model", "Model of the device.").func(device_model),
            Column::json("events", "Activity events in the report."),
        ];

        Self {
            schema: TableSchema::new(
                "googleworkspace_admin_reports_mobile_activity",
                "Mobile device audit events such as registrations and syncs.",
                columns,
            )
            .list_keys(vec![
                KeyColumn::optional("time").operators(&Operator::RANGE),
                KeyColumn::optional("actor_email"),
                KeyColumn::optional("event_name"),
            ]),
        }
    }
}

#[async_trait]
impl Table for MobileActivityTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let filter = activity_filter(ctx);
        let queried = ctx.query.equals_str("event_name").filter(|s| !s.is_empty());

        let api = ctx.conn.reports().await?;
        let api = &api;
        let filter = &filter;
        paginate(PAGE_CAP, sink, |size, token| async move {
            let mut page = api.list_activities(APPLICATION, filter, size, token.as_deref()).await?;
            for item in page.items.iter_mut() {
                let Some(name) = matched_event_name(item, queried) else {
                    continue;
                };
                if let Some(fields) = item.as_object_mut() {
                    fields.insert(MATCHED_EVENT.to_string(), Value::String(name));
                }
            }
            Ok(page)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::{connection, list_rows, mount_token};
    use chrono::{TimeZone, Utc};
    use googleworkspace_protocol::{QualValue, QueryRequest};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn activity() -> Value {
        json!({
            "id": {
                "time": "2024-05-10T09:15:00.000Z",
                "uniqueQualifier": "-7",
                "applicationName": "mobile"
            },
            "actor": {"email": "ada@example.com"},
            "events": [
                {"name": "DEVICE_REGISTER_UNREGISTER_EVENT", "parameters": [
                    {"name": "DEVICE_ID", "value": "dev-42"},
                    {"name": "ACCOUNT_STATE", "value": "REGISTERED"}
                ]},
                {"name": "DEVICE_SYNC_EVENT", "parameters": [
                    {"name": "DEVICE_MODEL", "value": "Pixel 8"}
                ]}
            ]
        })
    }

    #[test]
    fn test_event_parameters() {
        let a = activity();
        assert_eq!(device_id(&a), json!("dev-42"));
        assert_eq!(device_model(&a), json!("Pixel 8"));
        assert_eq!(event_parameter(&a, "OS_VERSION"), Value::Null);
        assert_eq!(
            event_parameter(&json!({"events": [{"parameters": [{"name": "N", "intValue": "3"}]}]}), "N"),
            json!("3")
        );
    }

    #[test]
    fn test_matched_event_name() {
        let a = activity();
        assert_eq!(
            matched_event_name(&a, None).as_deref(),
            Some("DEVICE_REGISTER_UNREGISTER_EVENT")
        );
        assert_eq!(
            matched_event_name(&a, Some("DEVICE_SYNC_EVENT")).as_deref(),
            Some("DEVICE_SYNC_EVENT")
        );
        assert!(matched_event_name(&json!({}), None).is_none());
    }

    #[tokio::test]
    async fn test_lists_mobile_activities_for_all_users() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/admin/reports/v1/activity/users/all/applications/mobile"))
            .and(query_param("startTime", "2024-05-01T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [activity()] })))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_admin_reports_mobile_activity").with_qual(
            "time",
            Operator::Ge,
            QualValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
        );
        let (rows, result) = list_rows(&MobileActivityTable::new(), &conn, &query).await.unwrap();

        assert_eq!(result.rows_streamed, 1);
        let row = &rows[0];
        assert_eq!(row["time"], json!("2024-05-10T09:15:00.000Z"));
        assert_eq!(row["actor_email"], json!("ada@example.com"));
        assert_eq!(row["event_name"], json!("DEVICE_REGISTER_UNREGISTER_EVENT"));
        assert_eq!(row["application_name"], json!("mobile"));
        assert_eq!(row["device_id"], json!("dev-42"));
        assert_eq!(row["device_model"], json!("Pixel 8"));
        assert_eq!(row["events"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_actor_and_event_filters() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/admin/reports/v1/activity/users/ada%40example.com/applications/mobile"))
            .and(query_param("eventName", "DEVICE_SYNC_EVENT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [activity()] })))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_admin_reports_mobile_activity")
            .with_qual("actor_email", Operator::Eq, QualValue::String("ada@example.com".into()))
            .with_qual("event_name", Operator::Eq, QualValue::String("DEVICE_SYNC_EVENT".into()));
        let (rows, _) = list_rows(&MobileActivityTable::new(), &conn, &query).await.unwrap();

        assert_eq!(rows[0]["event_name"], json!("DEVICE_SYNC_EVENT"));
    }
}
