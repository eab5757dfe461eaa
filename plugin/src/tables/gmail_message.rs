//! `googleworkspace_gmail_message` and `googleworkspace_gmail_my_message`.

use async_trait::async_trait;
use googleworkspace_protocol::{Operator, QueryRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::common::AppResult;
use crate::table::qual::{gmail_date_filter, query_or_filters, time_quals};
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

pub(crate) const PAGE_CAP: u64 = 500;

static SENDER_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(.*?) *>").expect("sender address pattern should compile"));

/// Whose mailbox a Gmail table reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mailbox {
    /// Address taken from the `=` qualifier on this column
    Qualified(&'static str),
    /// The authenticated user
    Me,
}

impl Mailbox {
    pub(crate) fn user_id<'q>(&self, query: &'q QueryRequest) -> AppResult<&'q str> {
        match self {
            Mailbox::Qualified(column) => query.require_str(column),
            Mailbox::Me => Ok("me"),
        }
    }

    /// Key columns that pick the mailbox, ahead of the table's own keys.
    pub(crate) fn key_columns(&self, mut rest: Vec<KeyColumn>) -> Vec<KeyColumn> {
        if let Mailbox::Qualified(column) = self {
            rest.insert(0, KeyColumn::required(*column));
        }
        rest
    }
}

/// Search string from `sender_email`, the date column and an explicit `query`.
pub(crate) fn search_filter(query: &QueryRequest, date_column: &str) -> Option<String> {
    let mut filters = Vec::new();
    if let Some(sender) = query.equals_str("sender_email") {
        filters.push(format!("from = \"{}\"", sender));
    }
    filters.extend(
        time_quals(query, date_column)
            .into_iter()
            .filter_map(|(op, t)| gmail_date_filter(op, t.timestamp())),
    );
    query_or_filters(query, filters)
}

fn sender_email(message: &Value) -> Value {
    let from = message
        .pointer("/payload/headers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|h| h.get("name").and_then(Value::as_str) == Some("From"))
        .and_then(|h| h.get("value").and_then(Value::as_str));

    from.and_then(|v| SENDER_ADDRESS.captures(v))
        .and_then(|c| c.get(1))
        .map(|m| Value::String(m.as_str().to_string()))
        .unwrap_or(Value::Null)
}

pub struct GmailMessageTable {
    schema: TableSchema,
    mailbox: Mailbox,
}

impl GmailMessageTable {
    fn build(name: &'static str, description: &'static str, mailbox: Mailbox) -> Self {
        let mut columns = vec![
            Column::string("id", "The immutable ID of the message."),
            Column::string("thread_id", "The ID of the thread the message belongs to."),
        ];
        if let Mailbox::Qualified(column) = mailbox {
            columns.push(Column::string(column, "User's email address.").from_qual());
        }
        columns.extend([
            Column::string("history_id", "The ID of the last history record that modified this message.").hydrated(),
            Column::string("sender_email", "Email address of the sender.")
                .func(sender_email)
                .hydrated(),
            Column::timestamp("internal_date", "The internal message creation timestamp.")
                .unix_ms("internalDate")
                .hydrated(),
            Column::string("raw", "The entire email message in an RFC 2822 formatted and base64url encoded string.")
                .hydrated(),
            Column::int("size_estimate", "Estimated size in bytes of the message.").hydrated(),
            Column::string("snippet", "A short part of the message text.").hydrated(),
            Column::string("query", "Gmail search query.").from_qual(),
            Column::json("label_ids", "List of IDs of labels applied to this message.").hydrated(),
            Column::json("payload", "The parsed email structure in the message parts.").hydrated(),
        ]);

        let list_keys = mailbox.key_columns(vec![
            KeyColumn::optional("sender_email"),
            KeyColumn::optional("internal_date").operators(&Operator::RANGE),
            KeyColumn::optional("query"),
        ]);
        let mut get_keys = vec!["id"];
        if let Mailbox::Qualified(column) = mailbox {
            get_keys.push(column);
        }

        Self {
            schema: TableSchema::new(name, description, columns)
                .list_keys(list_keys)
                .get_keys(&get_keys),
            mailbox,
        }
    }

    pub fn for_user() -> Self {
        Self::build(
            "googleworkspace_gmail_message",
            "Messages in the specified user's mailbox.",
            Mailbox::Qualified("user_id"),
        )
    }

    pub fn mine() -> Self {
        Self::build(
            "googleworkspace_gmail_my_message",
            "Messages in the current user's mailbox.",
            Mailbox::Me,
        )
    }
}

#[async_trait]
impl Table for GmailMessageTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let user_id = self.mailbox.user_id(ctx.query)?;
        let q = search_filter(ctx.query, "internal_date");

        let api = ctx.conn.gmail().await?;
        let api = &api;
        let q = q.as_deref();
        paginate(PAGE_CAP, sink, |size, token| async move {
            api.list_messages(user_id, q, size, token.as_deref()).await
        })
        .await
    }

    async fn get(&self, ctx: &ScanContext<'_>) -> AppResult<Option<Value>> {
        let user_id = self.mailbox.user_id(ctx.query)?;
        let id = ctx.query.require_str("id")?;
        Ok(Some(ctx.conn.gmail().await?.get_message(user_id, id).await?))
    }

    async fn hydrate(&self, ctx: &ScanContext<'_>, item: &mut Value) -> AppResult<()> {
        // Already a full message when it came from get.
        if item.get("historyId").is_some() {
            return Ok(());
        }
        let Some(id) = item.get("id").and_then(Value::as_str).map(str::to_string) else {
            return Ok(());
        };
        let user_id = self.mailbox.user_id(ctx.query)?;
        *item = ctx.conn.gmail().await?.get_message(user_id, &id).await?;
        Ok(())
    }
}
