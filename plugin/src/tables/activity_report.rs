//! `googleworkspace_activity_report`: Admin SDK audit activities.

use async_trait::async_trait;
use googleworkspace_protocol::Operator;
use serde_json::Value;

use crate::common::{AppResult, PluginError};
use crate::google::reports::{is_supported_application, ActivityFilter};
use crate::table::qual::{time_quals, TimeWindow};
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

const PAGE_CAP: u64 = 1000;

fn event_names(activity: &Value) -> Value {
    let Some(events) = activity.get("events").and_then(Value::as_array) else {
        return Value::Null;
    };
    events
        .iter()
        .filter_map(|e| e.get("name").and_then(Value::as_str))
        .filter(|name| !name.is_empty())
        .map(|name| Value::String(name.to_string()))
        .collect()
}

pub struct ActivityReportTable {
    schema: TableSchema,
}

impl ActivityReportTable {
    pub fn new() -> Self {
        let columns = vec![
            Column::timestamp("time", "Time of occurrence of the activity.").field("id.time"),
            Column::string("actor_email", "Email address of the actor.").field("actor.email"),
            Column::string("event_name", "The name of the event, when queried.").from_qual(),
            Column::json("event_names", "Names of the events in this activity.").func(event_names),
            Column::string("unique_qualifier", "Unique qualifier ID for this activity.").field("id.uniqueQualifier"),
            Column::string("application_name", "Application name to which the event belongs.")
                .field("id.applicationName"),
            Column::inet("ip_address", "IP address associated with the activity."),
            Column::string("actor_profile_id", "The unique Google Workspace profile ID of the actor.")
                .field("actor.profileId"),
            Column::string("customer_id", "The unique ID of the customer.").field("id.customerId"),
            Column::json("events", "Activity events in the report."),
        ];

        Self {
            schema: TableSchema::new(
                "googleworkspace_activity_report",
                "Audit activities for a Google Workspace application.",
                columns,
            )
            .list_keys(vec![
                KeyColumn::required("application_name"),
                KeyColumn::optional("time").operators(&Operator::RANGE),
                KeyColumn::optional("actor_email"),
                KeyColumn::optional("ip_address"),
                KeyColumn::optional("event_name"),
            ]),
        }
    }
}

/// Native `activities.list` filters from the query's qualifiers.
pub(super) fn activity_filter(ctx: &ScanContext<'_>) -> ActivityFilter {
    let window = TimeWindow::reports(&time_quals(ctx.query, "time"));
    let non_empty = |column: &str| ctx.query.equals_str(column).filter(|s| !s.is_empty()).map(str::to_string);
    ActivityFilter {
        user_key: non_empty("actor_email"),
        start_time: window.min,
        end_time: window.max,
        actor_ip_address: non_empty("ip_address"),
        event_name: non_empty("event_name"),
    }
}

#[async_trait]
impl Table for ActivityReportTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let application = ctx.query.require_str("application_name")?;
        if !is_supported_application(application) {
            return Err(PluginError::invalid_query(format!(
                "unsupported application_name: {:?}",
                application
            )));
        }
        let filter = activity_filter(ctx);

        let api = ctx.conn.reports().await?;
        let api = &api;
        let filter = &filter;
        paginate(PAGE_CAP, sink, |size, token| async move {
            api.list_activities(application, filter, size, token.as_deref()).await
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

    fn app(name: &str) -> QueryRequest {
        QueryRequest::new("googleworkspace_activity_report").with_qual(
            "application_name",
            Operator::Eq,
            QualValue::String(name.into()),
        )
    }

    #[test]
    fn test_event_names() {
        let activity = json!({"events": [{"name": "login_success"}, {"name": ""}, {"type": "x"}]});
        assert_eq!(event_names(&activity), json!(["login_success"]));
        assert_eq!(event_names(&json!({})), Value::Null);
    }

    #[tokio::test]
    async fn test_unsupported_application() {
        let conn = connection("http://127.0.0.1:9");
        let err = list_rows(&ActivityReportTable::new(), &conn, &app("photos")).await.unwrap_err();
        assert!(matches!(err, PluginError::InvalidQuery(msg) if msg.contains("photos")));
    }

    #[tokio::test]
    async fn test_filters_and_columns() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/admin/reports/v1/activity/users/ada%40example.com/applications/login"))
            .and(query_param("startTime", "2024-03-01T00:00:00Z"))
            .and(query_param("actorIpAddress", "10.0.0.7"))
            .and(query_param("eventName", "login_success"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": {
                        "time": "2024-03-02T08:30:00.000Z",
                        "uniqueQualifier": "-42",
                        "applicationName": "login",
                        "customerId": "C01"
                    },
                    "actor": {"email": "ada@example.com", "profileId": "1001"},
                    "ipAddress": "10.0.0.7",
                    "events": [{"name": "login_success", "type": "login"}]
                }]
            })))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = app("login")
            .with_qual(
                "time",
                Operator::Ge,
                QualValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            )
            .with_qual("actor_email", Operator::Eq, QualValue::String("ada@example.com".into()))
            .with_qual("ip_address", Operator::Eq, QualValue::Inet("10.0.0.7".into()))
            .with_qual("event_name", Operator::Eq, QualValue::String("login_success".into()));
        let (rows, _) = list_rows(&ActivityReportTable::new(), &conn, &query).await.unwrap();

        let row = &rows[0];
        assert_eq!(row["time"], json!("2024-03-02T08:30:00.000Z"));
        assert_eq!(row["actor_email"], json!("ada@example.com"));
        assert_eq!(row["event_name"], json!("login_success"));
        assert_eq!(row["event_names"], json!(["login_success"]));
        assert_eq!(row["application_name"], json!("login"));
        assert_eq!(row["ip_address"], json!("10.0.0.7"));
        assert_eq!(row["customer_id"], json!("C01"));
    }
}
