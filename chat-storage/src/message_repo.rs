//! Messages: creation, edits, deletion, listing, and edit history.
//!
//! Creation and content updates run their observers inside the write's transaction, so a reader
//! never sees a message without its notification, or an edited flag without its history row.

use chat_core::{Message, MessageHistory, NewMessage};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::conversation_repo::load_conversation;
use crate::error::StorageError;
use crate::models::{
    MessageHistoryRecord, MessageOrdering, MessageQuery, MessageRecord, MESSAGE_COLUMNS,
};
use crate::store::ChatStore;

fn validate_content(content: &str) -> Result<(), StorageError> {
    if content.trim().is_empty() {
        return Err(StorageError::Validation("message content is required".to_string()));
    }
    Ok(())
}

/// `%keyword%` with LIKE wildcards in the keyword escaped by `\`.
fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

async fn fetch_message(
    conn: &mut SqliteConnection,
    message_id: Uuid,
) -> Result<Option<Message>, StorageError> {
    sqlx::query_as::<_, MessageRecord>(&format!(
        "SELECT {} FROM messages WHERE id = ?",
        MESSAGE_COLUMNS
    ))
    .bind(message_id.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .map(Message::try_from)
    .transpose()
}

impl ChatStore {
    /// Inserts a message from `sender_id` and fires the message-created observers.
    ///
    /// The conversation must exist; the receiver, if any, must be a participant; the parent, if
    /// any, must exist in the same conversation. A repeated `idempotency_key` from the same sender
    /// returns the stored message without inserting or notifying again; reusing the key for another
    /// conversation is `AlreadyExists`.
    #[instrument(skip(self, new_message), fields(conversation_id = %new_message.conversation_id))]
    pub async fn create_message(
        &self,
        sender_id: Uuid,
        new_message: &NewMessage,
    ) -> Result<Message, StorageError> {
        validate_content(&new_message.content)?;

        let mut tx = self.pool().begin().await?;

        if let Some(key) = &new_message.idempotency_key {
            let existing = sqlx::query_as::<_, MessageRecord>(&format!(
                "SELECT {} FROM messages WHERE sender_id = ? AND idempotency_key = ?",
                MESSAGE_COLUMNS
            ))
            .bind(sender_id.to_string())
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(record) = existing {
                let message = Message::try_from(record)?;
                if message.conversation_id != new_message.conversation_id {
                    return Err(StorageError::AlreadyExists(format!(
                        "idempotency key {} was already used in another conversation",
                        key
                    )));
                }
                info!(message_id = %message.id, idempotency_key = %key, "Replayed message send");
                return Ok(message);
            }
        }

        let conversation = load_conversation(&mut *tx, new_message.conversation_id)
            .await?
            .ok_or_else(|| {
                StorageError::NotFound(format!("conversation {}", new_message.conversation_id))
            })?;

        if let Some(receiver_id) = new_message.receiver_id {
            if !conversation.has_participant(receiver_id) {
                return Err(StorageError::Validation(format!(
                    "receiver {} is not a participant of this conversation",
                    receiver_id
                )));
            }
        }

        if let Some(parent_id) = new_message.parent_id {
            let parent = fetch_message(&mut *tx, parent_id)
                .await?
                .ok_or_else(|| StorageError::NotFound(format!("parent message {}", parent_id)))?;
            if parent.conversation_id != conversation.id {
                return Err(StorageError::Validation(
                    "a reply must belong to the same conversation as its parent".to_string(),
                ));
            }
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: conversation.id,
            sender_id,
            receiver_id: new_message.receiver_id,
            parent_id: new_message.parent_id,
            content: new_message.content.clone(),
            edited: false,
            timestamp: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, receiver_id, parent_id, content, edited, timestamp, idempotency_key)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.receiver_id.map(|id| id.to_string()))
        .bind(message.parent_id.map(|id| id.to_string()))
        .bind(&message.content)
        .bind(message.timestamp)
        .bind(&new_message.idempotency_key)
        .execute(&mut *tx)
        .await?;

        for observer in &self.observers {
            observer.message_created(&mut *tx, &message).await?;
        }

        tx.commit().await?;
        info!(message_id = %message.id, sender_id = %sender_id, "Saved message");
        Ok(message)
    }

    pub async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>, StorageError> {
        let mut conn = self.pool().acquire().await?;
        fetch_message(&mut *conn, message_id).await
    }

    /// Replaces a message's content. Observers see the incoming state before it is written and
    /// may flag it (the coordinator snapshots the old content and sets `edited`).
    #[instrument(skip(self, content))]
    pub async fn update_message_content(
        &self,
        message_id: Uuid,
        content: &str,
        editor: Option<Uuid>,
    ) -> Result<Message, StorageError> {
        validate_content(content)?;

        let mut tx = self.pool().begin().await?;

        let mut message = fetch_message(&mut *tx, message_id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("message {}", message_id)))?;
        message.content = content.to_string();

        for observer in &self.observers {
            observer
                .message_before_update(&mut *tx, &mut message, editor)
                .await?;
        }

        sqlx::query("UPDATE messages SET content = ?, edited = ? WHERE id = ?")
            .bind(&message.content)
            .bind(message.edited)
            .bind(message.id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(message_id = %message.id, edited = message.edited, "Updated message");
        Ok(message)
    }

    /// Deletes a message; its replies, notifications and history go with it.
    pub async fn delete_message(&self, message_id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(message_id.to_string())
            .execute(self.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(message_id = %message_id, "Deleted message");
        } else {
            warn!(message_id = %message_id, "Delete of unknown message");
        }
        Ok(deleted)
    }

    /// Filtered, ordered, paged listing. A query without a conversation returns nothing.
    pub async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Message>, StorageError> {
        let Some(conversation_id) = query.conversation_id else {
            return Ok(Vec::new());
        };

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM messages WHERE conversation_id = ",
            MESSAGE_COLUMNS
        ));
        builder.push_bind(conversation_id.to_string());

        if let Some(sender_id) = query.sender_id {
            builder.push(" AND sender_id = ").push_bind(sender_id.to_string());
        }
        if let Some(after) = query.sent_after {
            builder.push(" AND timestamp >= ").push_bind(after);
        }
        if let Some(before) = query.sent_before {
            builder.push(" AND timestamp <= ").push_bind(before);
        }
        if let Some(keyword) = &query.search {
            builder
                .push(" AND content LIKE ")
                .push_bind(contains_pattern(keyword))
                .push(" ESCAPE '\\'");
        }

        builder.push(match query.ordering {
            MessageOrdering::NewestFirst => " ORDER BY timestamp DESC, rowid DESC",
            MessageOrdering::OldestFirst => " ORDER BY timestamp ASC, rowid ASC",
        });

        match (query.limit, query.offset) {
            (Some(limit), offset) => {
                builder.push(" LIMIT ").push_bind(limit);
                builder.push(" OFFSET ").push_bind(offset.unwrap_or(0));
            }
            (None, Some(offset)) => {
                builder.push(" LIMIT -1 OFFSET ").push_bind(offset);
            }
            (None, None) => {}
        }

        let records = builder
            .build_query_as::<MessageRecord>()
            .fetch_all(self.pool())
            .await?;
        info!(count = records.len(), conversation_id = %conversation_id, "Retrieved messages");

        records.into_iter().map(Message::try_from).collect()
    }

    /// Every message of a conversation, oldest first.
    pub async fn conversation_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, StorageError> {
        self.list_messages(
            &MessageQuery::for_conversation(conversation_id).ordering(MessageOrdering::OldestFirst),
        )
        .await
    }

    /// Edit snapshots of a message, oldest first.
    pub async fn message_history(
        &self,
        message_id: Uuid,
    ) -> Result<Vec<MessageHistory>, StorageError> {
        let records: Vec<MessageHistoryRecord> = sqlx::query_as(
            "SELECT * FROM message_history WHERE message_id = ? ORDER BY edited_at ASC, rowid ASC",
        )
        .bind(message_id.to_string())
        .fetch_all(self.pool())
        .await?;

        records.into_iter().map(MessageHistory::try_from).collect()
    }
}
