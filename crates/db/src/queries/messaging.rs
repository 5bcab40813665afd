// crates/db/src/queries/messaging.rs
//! Conversations, participants and messages.
//!
//! Messages are ordered by `seq`, a per-database monotonic sequence. Each
//! participant row remembers the last `seq` it has read; everything after
//! it from someone else counts as unread.

use std::collections::HashMap;

use agencydesk_core::{preview, MessageDraft, ValidationError};
use agencydesk_types::{Attachment, ChangeEvent, ChangeOp, Role, Table};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use ts_rs::TS;

use super::row::{enum_col, json_col};
use crate::{new_id, now, Database, DbError, DbResult};

/// Characters of message text shown in a conversation list.
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    #[ts(type = "number")]
    pub created_at: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Conversation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub conversation_id: String,
    pub profile_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    #[ts(type = "number")]
    pub joined_at: i64,
    #[ts(type = "number | null")]
    pub last_read_at: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Participant {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            conversation_id: row.try_get("conversation_id")?,
            profile_id: row.try_get("profile_id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            avatar_url: row.try_get("avatar_url")?,
            role: enum_col(row, "role")?,
            joined_at: row.try_get("joined_at")?,
            last_read_at: row.try_get("last_read_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    /// Full name, falling back to email.
    pub sender_name: Option<String>,
    pub content: String,
    pub attachments: Vec<Attachment>,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Message {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender_id: row.try_get("sender_id")?,
            sender_name: row.try_get("sender_name")?,
            content: row.try_get("content")?,
            attachments: json_col(row, "attachments")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// One row of a profile's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub participants: Vec<Participant>,
    pub last_message_preview: Option<String>,
    #[ts(type = "number | null")]
    pub last_message_at: Option<i64>,
    #[ts(type = "number")]
    pub unread_count: i64,
    #[ts(type = "number")]
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    #[serde(default)]
    pub title: Option<String>,
    pub participant_ids: Vec<String>,
}

const MESSAGE_SELECT: &str = "
    SELECT m.id, m.conversation_id, m.sender_id,
           COALESCE(p.full_name, p.email) AS sender_name,
           m.content, m.attachments, m.created_at
    FROM messages m
    LEFT JOIN profiles p ON p.id = m.sender_id";

const PARTICIPANT_SELECT: &str = "
    SELECT cp.conversation_id, cp.profile_id, p.email, p.full_name, p.avatar_url, p.role,
           cp.joined_at, cp.last_read_at
    FROM conversation_participants cp
    JOIN profiles p ON p.id = cp.profile_id";

impl Database {
    /// Start a conversation between at least two distinct profiles.
    pub async fn create_conversation(&self, input: NewConversation) -> DbResult<Conversation> {
        let mut participants: Vec<String> = Vec::with_capacity(input.participant_ids.len());
        for id in input.participant_ids {
            let id = id.trim().to_string();
            if !id.is_empty() && !participants.contains(&id) {
                participants.push(id);
            }
        }
        if participants.len() < 2 {
            return Err(ValidationError::TooFewParticipants.into());
        }
        let title = input
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let id = new_id();
        let ts = now();
        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&title)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?;
        for profile_id in &participants {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, profile_id, joined_at)
                 VALUES (?, ?, ?)",
            )
            .bind(&id)
            .bind(profile_id)
            .bind(ts)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(conversation = %id, participants = participants.len(), "Conversation created");
        self.changes()
            .publish(ChangeEvent::new(Table::Conversations, ChangeOp::Insert, &id).in_conversation(&id));
        self.get_conversation(&id).await
    }

    /// The existing two-person conversation between `a` and `b`, or a new one.
    pub async fn find_or_create_direct_conversation(
        &self,
        a: &str,
        b: &str,
    ) -> DbResult<Conversation> {
        if a == b {
            return Err(ValidationError::TooFewParticipants.into());
        }
        let existing = sqlx::query_as::<_, Conversation>(
            "SELECT c.id, c.title, c.created_at, c.updated_at
             FROM conversations c
             WHERE (SELECT COUNT(*) FROM conversation_participants cp
                    WHERE cp.conversation_id = c.id) = 2
               AND EXISTS (SELECT 1 FROM conversation_participants cp
                           WHERE cp.conversation_id = c.id AND cp.profile_id = ?)
               AND EXISTS (SELECT 1 FROM conversation_participants cp
                           WHERE cp.conversation_id = c.id AND cp.profile_id = ?)
             ORDER BY c.created_at, c.rowid
             LIMIT 1",
        )
        .bind(a)
        .bind(b)
        .fetch_optional(self.pool())
        .await?;

        match existing {
            Some(conversation) => Ok(conversation),
            None => {
                self.create_conversation(NewConversation {
                    title: None,
                    participant_ids: vec![a.to_string(), b.to_string()],
                })
                .await
            }
        }
    }

    pub async fn get_conversation(&self, id: &str) -> DbResult<Conversation> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DbError::not_found("conversation", id))
    }

    pub async fn list_participants(&self, conversation_id: &str) -> DbResult<Vec<Participant>> {
        let rows = sqlx::query_as::<_, Participant>(&format!(
            "{PARTICIPANT_SELECT} WHERE cp.conversation_id = ? ORDER BY cp.joined_at, p.email"
        ))
        .bind(conversation_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn is_participant(&self, conversation_id: &str, profile_id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM conversation_participants WHERE conversation_id = ? AND profile_id = ?",
        )
        .bind(conversation_id)
        .bind(profile_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(found.is_some())
    }

    /// Inbox for a profile, most recently active first.
    pub async fn list_conversations_for_profile(
        &self,
        profile_id: &str,
    ) -> DbResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.title, c.updated_at,
                    lm.content AS last_content,
                    json_array_length(lm.attachments) AS last_attachments,
                    lm.created_at AS last_at,
                    (SELECT COUNT(*) FROM messages m
                     WHERE m.conversation_id = c.id
                       AND m.seq > me.last_read_seq
                       AND m.sender_id != me.profile_id) AS unread_count
             FROM conversation_participants me
             JOIN conversations c ON c.id = me.conversation_id
             LEFT JOIN messages lm
               ON lm.seq = (SELECT MAX(seq) FROM messages WHERE conversation_id = c.id)
             WHERE me.profile_id = ?
             ORDER BY COALESCE(lm.created_at, c.updated_at) DESC, c.rowid DESC",
        )
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;

        let participants = sqlx::query_as::<_, Participant>(&format!(
            "{PARTICIPANT_SELECT}
             WHERE cp.conversation_id IN
                (SELECT conversation_id FROM conversation_participants WHERE profile_id = ?)
             ORDER BY cp.joined_at, p.email"
        ))
        .bind(profile_id)
        .fetch_all(self.pool())
        .await?;
        let mut by_conversation: HashMap<String, Vec<Participant>> = HashMap::new();
        for participant in participants {
            by_conversation
                .entry(participant.conversation_id.clone())
                .or_default()
                .push(participant);
        }

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let last_content: Option<String> = row.try_get("last_content")?;
            let last_attachments: Option<i64> = row.try_get("last_attachments")?;
            let last_message_preview = last_content.map(|content| {
                preview(&content, last_attachments.unwrap_or(0).max(0) as usize, PREVIEW_CHARS)
            });
            summaries.push(ConversationSummary {
                participants: by_conversation.remove(&id).unwrap_or_default(),
                title: row.try_get("title")?,
                last_message_preview,
                last_message_at: row.try_get("last_at")?,
                unread_count: row.try_get("unread_count")?,
                updated_at: row.try_get("updated_at")?,
                id,
            });
        }
        Ok(summaries)
    }

    /// Every message in a conversation, oldest first.
    pub async fn get_messages(&self, conversation_id: &str) -> DbResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(&format!(
            "{MESSAGE_SELECT} WHERE m.conversation_id = ? ORDER BY m.seq"
        ))
        .bind(conversation_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Store a message from a participant.
    ///
    /// The draft is validated before any query runs. The sender's own read
    /// marker moves past the new message.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        draft: MessageDraft,
    ) -> DbResult<Message> {
        let draft = draft.validate()?;

        if !self.is_participant(conversation_id, sender_id).await? {
            // Distinguish a missing conversation from a foreign one.
            self.get_conversation(conversation_id).await?;
            return Err(DbError::Forbidden(format!(
                "{sender_id} is not a participant of conversation {conversation_id}"
            )));
        }

        let id = new_id();
        let ts = now();
        let attachments = serde_json::to_string(&draft.attachments)?;

        let mut tx = self.pool().begin().await?;
        let seq: i64 = sqlx::query_scalar(
            "INSERT INTO messages (id, conversation_id, sender_id, content, attachments, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING seq",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(&draft.content)
        .bind(&attachments)
        .bind(ts)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(ts)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE conversation_participants SET last_read_seq = ?, last_read_at = ?
             WHERE conversation_id = ? AND profile_id = ?",
        )
        .bind(seq)
        .bind(ts)
        .bind(conversation_id)
        .bind(sender_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(conversation = %conversation_id, message = %id, "Message sent");
        self.changes().publish(
            ChangeEvent::new(Table::Messages, ChangeOp::Insert, &id).in_conversation(conversation_id),
        );

        sqlx::query_as::<_, Message>(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
            .bind(&id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DbError::not_found("message", &id))
    }

    /// Move the viewer's read marker to the newest message.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: &str,
        profile_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE conversation_participants
             SET last_read_seq = COALESCE(
                    (SELECT MAX(seq) FROM messages WHERE conversation_id = ?), last_read_seq),
                 last_read_at = ?
             WHERE conversation_id = ? AND profile_id = ?",
        )
        .bind(conversation_id)
        .bind(now())
        .bind(conversation_id)
        .bind(profile_id)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            self.get_conversation(conversation_id).await?;
            return Err(DbError::Forbidden(format!(
                "{profile_id} is not a participant of conversation {conversation_id}"
            )));
        }
        Ok(())
    }
}
