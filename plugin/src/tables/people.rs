//! `googleworkspace_people_contact` and `googleworkspace_people_directory_people`.
//!
//! Both read `Person` resources and share one column set. The singleton
//! fields (names, birthdays, genders, biographies) project their first entry.

use async_trait::async_trait;
use serde_json::Value;

use crate::common::AppResult;
use crate::table::{paginate, Column, RowSink, ScanContext, Table, TableSchema};

const PAGE_CAP: u64 = 1000;

/// Where the person resources come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeopleSource {
    /// The caller's own contacts
    Connections,
    /// Domain profiles from the directory
    Directory,
}

fn primary_email_address(person: &Value) -> Value {
    person
        .get("emailAddresses")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|email| email.pointer("/metadata/primary").and_then(Value::as_bool) == Some(true))
        .and_then(|email| email.get("value").cloned())
        .unwrap_or(Value::Null)
}

fn person_columns() -> Vec<Column> {
    vec![
        Column::string("resource_name", "The resource name for the person, assigned by the server."),
        Column::string(
            "display_name",
            "The display name formatted according to the locale specified by the viewer's account.",
        )
        .field("names.0.displayName"),
        Column::string("given_name", "The given name of the person.").field("names.0.givenName"),
        Column::string("primary_email_address", "The primary email address of the person.").func(primary_email_address),
        Column::string("gender", "The gender for the person.").field("genders.0.value"),
        Column::json("birthday", "The date of the birthday.").field("birthdays.0.date"),
        Column::json("email_addresses", "The person's email addresses."),
        Column::json("addresses", "The person's street addresses."),
        Column::json("biography", "The person's biography.").field("biographies.0"),
        Column::json("calendar_urls", "The person's calendar URLs."),
        Column::json("client_data", "The person's client data."),
        Column::json("cover_photos", "The person's cover photos."),
        Column::json("events", "The person's events."),
        Column::json("external_ids", "The person's external IDs."),
        Column::json("interests", "The person's interests."),
        Column::json("locations", "The person's locations."),
        Column::json("memberships", "The person's group memberships."),
        Column::json("metadata", "Metadata about the person."),
        Column::json("nicknames", "The person's nicknames."),
        Column::json("occupations", "The person's occupations."),
        Column::json("organizations", "The person's past or current organizations."),
        Column::json("phone_numbers", "The person's phone numbers."),
        Column::json("photos", "The person's photos."),
    ]
}

pub struct PeopleTable {
    schema: TableSchema,
    source: PeopleSource,
}

impl PeopleTable {
    pub fn contacts() -> Self {
        Self {
            schema: TableSchema::new(
                "googleworkspace_people_contact",
                "Contacts owned by the authenticated user.",
                person_columns(),
            )
            .ignore(&[404]),
            source: PeopleSource::Connections,
        }
    }

    pub fn directory() -> Self {
        Self {
            schema: TableSchema::new(
                "googleworkspace_people_directory_people",
                "Domain profiles in the authenticated user's domain directory.",
                person_columns(),
            )
            .ignore(&[404]),
            source: PeopleSource::Directory,
        }
    }
}

#[async_trait]
impl Table for PeopleTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let api = ctx.conn.people().await?;
        let api = &api;
        let source = self.source;
        paginate(PAGE_CAP, sink, |size, token| async move {
            match source {
                PeopleSource::Connections => api.list_connections(size, token.as_deref()).await,
                PeopleSource::Directory => api.list_directory_people(size, token.as_deref()).await,
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::{connection, list_rows, mount_token};
    use googleworkspace_protocol::QueryRequest;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ada() -> Value {
        json!({
            "resourceName": "people/c1",
            "names": [{"displayName": "Ada Lovelace", "givenName": "Ada"}, {"displayName": "A. L."}],
            "genders": [{"value": "female"}],
            "birthdays": [{"date": {"month": 12, "day": 10}}],
            "emailAddresses": [
                {"value": "ada@home.example"},
                {"value": "ada@example.com", "metadata": {"primary": true}}
            ]
        })
    }

    #[test]
    fn test_primary_email_address() {
        assert_eq!(primary_email_address(&ada()), json!("ada@example.com"));
        assert_eq!(
            primary_email_address(&json!({"emailAddresses": [{"value": "x@example.com"}]})),
            Value::Null
        );
    }

    #[tokio::test]
    async fn test_contacts_singleton_fields() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/people/me/connections"))
            .and(query_param("pageSize", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"connections": [ada(), {"resourceName": "people/c2"}]})))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let (rows, _) = list_rows(&PeopleTable::contacts(), &conn, &QueryRequest::new("googleworkspace_people_contact"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["display_name"], json!("Ada Lovelace"));
        assert_eq!(rows[0]["given_name"], json!("Ada"));
        assert_eq!(rows[0]["gender"], json!("female"));
        assert_eq!(rows[0]["birthday"], json!({"month": 12, "day": 10}));
        assert_eq!(rows[0]["primary_email_address"], json!("ada@example.com"));
        assert_eq!(rows[1]["display_name"], Value::Null);
    }

    #[tokio::test]
    async fn test_directory_uses_domain_profiles() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/people:listDirectoryPeople"))
            .and(query_param("sources", "DIRECTORY_SOURCE_TYPE_DOMAIN_PROFILE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"people": [ada()]})))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_people_directory_people").with_columns(&["resource_name"]);
        let (rows, _) = list_rows(&PeopleTable::directory(), &conn, &query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["resource_name"], json!("people/c1"));
    }

    #[tokio::test]
    async fn test_only_not_found_is_ignored() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/people/me/connections"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": {"message": "denied"}})))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let err = list_rows(&PeopleTable::contacts(), &conn, &QueryRequest::new("googleworkspace_people_contact"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }
}
