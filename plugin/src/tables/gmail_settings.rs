//! `googleworkspace_gmail_settings` and `googleworkspace_gmail_my_settings`.
//!
//! One row per mailbox: the profile, with each settings resource fetched
//! only when its column is requested.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::gmail_message::Mailbox;
use crate::common::{AppResult, PluginError};
use crate::google::gmail::MailSetting;
use crate::table::{Column, RowSink, ScanContext, Table, TableSchema};

const DELEGATION_REQUIRED: &str =
    "Access restricted to service accounts that have been delegated domain-wide authority";

/// Keep only `fields`, filling absent ones with their defaults.
fn pick(setting: &Value, fields: &[(&str, Value)]) -> Value {
    let picked: Map<String, Value> = fields
        .iter()
        .map(|(name, default)| {
            let value = setting.get(*name).cloned().unwrap_or_else(|| default.clone());
            (name.to_string(), value)
        })
        .collect();
    Value::Object(picked)
}

fn auto_forwarding(setting: &Value) -> Value {
    pick(
        setting,
        &[
            ("disposition", json!("")),
            ("emailAddress", json!("")),
            ("enabled", json!(false)),
        ],
    )
}

fn imap(setting: &Value) -> Value {
    pick(
        setting,
        &[
            ("autoExpunge", json!(false)),
            ("enabled", json!(false)),
            ("expungeBehavior", json!("")),
            ("maxFolderSize", json!(0)),
        ],
    )
}

fn vacation(setting: &Value) -> Value {
    pick(
        setting,
        &[
            ("enableAutoReply", json!(false)),
            ("responseSubject", json!("")),
            ("restrictToContacts", json!(false)),
            ("restrictToDomain", json!(false)),
        ],
    )
}

pub struct GmailSettingsTable {
    schema: TableSchema,
    mailbox: Mailbox,
}

impl GmailSettingsTable {
    fn build(name: &'static str, description: &'static str, mailbox: Mailbox) -> Self {
        let columns = vec![
            Column::string("user_email", "The user's email address.").field("emailAddress"),
            Column::string("display_language", "The language to display Gmail in.")
                .field("language.displayLanguage")
                .hydrated(),
            Column::json("auto_forwarding", "Auto-forwarding settings for the account.")
                .field("autoForwarding")
                .hydrated(),
            Column::json("delegates", "Delegates with access to the mailbox.").hydrated(),
            Column::json("imap", "IMAP settings.").hydrated(),
            Column::json("pop", "POP settings.").hydrated(),
            Column::json("vacation", "Vacation responder settings.").hydrated(),
        ];

        Self {
            schema: TableSchema::new(name, description, columns).list_keys(mailbox.key_columns(Vec::new())),
            mailbox,
        }
    }

    pub fn for_user() -> Self {
        Self::build(
            "googleworkspace_gmail_settings",
            "Gmail settings of the specified user.",
            Mailbox::Qualified("user_email"),
        )
    }

    pub fn mine() -> Self {
        Self::build(
            "googleworkspace_gmail_my_settings",
            "Gmail settings of the current user.",
            Mailbox::Me,
        )
    }
}

#[async_trait]
impl Table for GmailSettingsTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let user_id = self.mailbox.user_id(ctx.query)?;
        let profile = ctx.conn.gmail().await?.get_profile(user_id).await?;
        sink.push(profile).await?;
        Ok(())
    }

    async fn hydrate(&self, ctx: &ScanContext<'_>, item: &mut Value) -> AppResult<()> {
        let user_id = match item.get("emailAddress").and_then(Value::as_str) {
            Some(address) => address.to_string(),
            None => self.mailbox.user_id(ctx.query)?.to_string(),
        };
        let api = ctx.conn.gmail().await?;
        let mut extra = Map::new();

        if ctx.query.wants("display_language") {
            extra.insert("language".into(), api.get_setting(&user_id, MailSetting::Language).await?);
        }
        if ctx.query.wants("auto_forwarding") {
            let setting = api.get_setting(&user_id, MailSetting::AutoForwarding).await?;
            extra.insert("autoForwarding".into(), auto_forwarding(&setting));
        }
        if ctx.query.wants("imap") {
            extra.insert("imap".into(), imap(&api.get_setting(&user_id, MailSetting::Imap).await?));
        }
        if ctx.query.wants("pop") {
            extra.insert("pop".into(), api.get_setting(&user_id, MailSetting::Pop).await?);
        }
        if ctx.query.wants("vacation") {
            extra.insert(
                "vacation".into(),
                vacation(&api.get_setting(&user_id, MailSetting::Vacation).await?),
            );
        }
        if ctx.query.wants("delegates") {
            let delegates = match api.list_delegates(&user_id).await {
                Ok(list) => Value::Array(list),
                Err(PluginError::Upstream { status: 403, message }) if message == DELEGATION_REQUIRED => {
                    debug!("Delegates need domain-wide delegation; leaving null");
                    Value::Null
                }
                Err(e) => return Err(e),
            };
            extra.insert("delegates".into(), delegates);
        }

        if let Some(obj) = item.as_object_mut() {
            obj.extend(extra);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::{connection, list_rows, mount_token};
    use googleworkspace_protocol::{Operator, QualValue, QueryRequest};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_get(server: &MockServer, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_pick_fills_defaults() {
        assert_eq!(
            vacation(&json!({"enableAutoReply": true, "responseBodyHtml": "<p>away</p>"})),
            json!({
                "enableAutoReply": true,
                "responseSubject": "",
                "restrictToContacts": false,
                "restrictToDomain": false
            })
        );
    }

    #[tokio::test]
    async fn test_settings_row() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let base = "/gmail/v1/users/ada%40example.com";
        mount_get(&server, &format!("{}/profile", base), json!({"emailAddress": "ada@example.com"})).await;
        mount_get(&server, &format!("{}/settings/language", base), json!({"displayLanguage": "en-GB"})).await;
        mount_get(&server, &format!("{}/settings/imap", base), json!({"enabled": true})).await;
        Mock::given(method("GET"))
            .and(path(format!("{}/settings/delegates", base)))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": {"code": 403, "message": DELEGATION_REQUIRED}})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/settings/pop", base)))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_gmail_settings")
            .with_qual("user_email", Operator::Eq, QualValue::String("ada@example.com".into()))
            .with_columns(&["user_email", "display_language", "imap", "delegates"]);
        let (rows, _) = list_rows(&GmailSettingsTable::for_user(), &conn, &query).await.unwrap();

        let row = &rows[0];
        assert_eq!(row["user_email"], json!("ada@example.com"));
        assert_eq!(row["display_language"], json!("en-GB"));
        assert_eq!(
            row["imap"],
            json!({"autoExpunge": false, "enabled": true, "expungeBehavior": "", "maxFolderSize": 0})
        );
        assert_eq!(row["delegates"], Value::Null);
    }

    #[tokio::test]
    async fn test_other_forbidden_hydrate_is_skipped() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_get(&server, "/gmail/v1/users/me/profile", json!({"emailAddress": "me@example.com"})).await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me%40example.com/settings/delegates"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": {"code": 403, "message": "Forbidden"}})))
            .mount(&server)
            .await;

        let conn = connection(&server.uri());
        let query = QueryRequest::new("googleworkspace_gmail_my_settings").with_columns(&["user_email", "delegates"]);
        let (rows, _) = list_rows(&GmailSettingsTable::mine(), &conn, &query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_email"], json!("me@example.com"));
        assert_eq!(rows[0]["delegates"], Value::Null);
    }
}
