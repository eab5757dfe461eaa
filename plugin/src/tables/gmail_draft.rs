//! `googleworkspace_gmail_draft` and `googleworkspace_gmail_my_draft`.

use async_trait::async_trait;
use googleworkspace_protocol::Operator;
use serde_json::Value;

use super::gmail_message::{search_filter, Mailbox, PAGE_CAP};
use crate::common::AppResult;
use crate::table::{paginate, Column, KeyColumn, QualLookup, RowSink, ScanContext, Table, TableSchema};

pub struct GmailDraftTable {
    schema: TableSchema,
    mailbox: Mailbox,
}

impl GmailDraftTable {
    fn build(name: &'static str, description: &'static str, mailbox: Mailbox) -> Self {
        let mut columns = vec![
            Column::string("draft_id", "The immutable ID of the draft.").field("id"),
            Column::string("message_id", "The immutable ID of the message.").field("message.id"),
            Column::string("message_thread_id", "The ID of the thread the message belongs to.")
                .field("message.threadId"),
        ];
        if let Mailbox::Qualified(column) = mailbox {
            columns.push(Column::string(column, "User's email address.").from_qual());
        }
        columns.extend([
            Column::string("message_history_id", "The ID of the last history record that modified this message.")
                .field("message.historyId")
                .hydrated(),
            Column::timestamp("message_internal_date", "The internal message creation timestamp.")
                .unix_ms("message.internalDate")
                .hydrated(),
            Column::string("message_raw", "The entire email message in an RFC 2822 formatted and base64url encoded string.")
                .field("message.raw")
                .hydrated(),
            Column::int("message_size_estimate", "Estimated size in bytes of the message.")
                .field("message.sizeEstimate")
                .hydrated(),
            Column::string("message_snippet", "A short part of the message text.")
                .field("message.snippet")
                .hydrated(),
            Column::string("query", "Gmail search query.").from_qual(),
            Column::json("message_label_ids", "List of IDs of labels applied to this message.")
                .field("message.labelIds")
                .hydrated(),
            Column::json("message_payload", "The parsed email structure in the message parts.")
                .field("message.payload")
                .hydrated(),
        ]);

        let list_keys = mailbox.key_columns(vec![
            KeyColumn::optional("query"),
            KeyColumn::optional("message_internal_date").operators(&Operator::RANGE),
        ]);
        let mut get_keys = vec!["draft_id"];
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
            "googleworkspace_gmail_draft",
            "Drafts in the specified user's mailbox.",
            Mailbox::Qualified("user_id"),
        )
    }

    pub fn mine() -> Self {
        Self::build(
            "googleworkspace_gmail_my_draft",
            "Drafts in the current user's mailbox.",
            Mailbox::Me,
        )
    }
}

#[async_trait]
impl Table for GmailDraftTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn list(&self, ctx: &ScanContext<'_>, sink: &mut RowSink<'_>) -> AppResult<()> {
        let user_id = self.mailbox.user_id(ctx.query)?;
        let q = search_filter(ctx.query, "message_internal_date");

        let api = ctx.conn.gmail().await?;
        let api = &api;
        let q = q.as_deref();
        paginate(PAGE_CAP, sink, |size, token| async move {
            api.list_drafts(user_id, q, size, token.as_deref()).await
        })
        .await
    }

    async fn get(&self, ctx: &ScanContext<'_>) -> AppResult<Option<Value>> {
        let user_id = self.mailbox.user_id(ctx.query)?;
        let draft_id = ctx.query.require_str("draft_id")?;
        Ok(Some(ctx.conn.gmail().await?.get_draft(user_id, draft_id).await?))
    }

    async fn hydrate(&self, ctx: &ScanContext<'_>, item: &mut Value) -> AppResult<()> {
        if item.pointer("/message/historyId").is_some() {
            return Ok(());
        }
        let Some(id) = item.get("id").and_then(Value::as_str).map(str::to_string) else {
            return Ok(());
        };
        let user_id = self.mailbox.user_id(ctx.query)?;
        *item = ctx.conn.gmail().await?.get_draft(user_id, &id).await?;
        Ok(())
    }
}
