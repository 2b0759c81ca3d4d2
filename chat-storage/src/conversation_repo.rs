//! Conversations and their participant sets.

use std::collections::HashSet;

use chat_core::Conversation;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::parse_id;
use crate::store::ChatStore;

pub(crate) const MIN_PARTICIPANTS: usize = 2;

pub(crate) async fn participants_of(
    conn: &mut SqliteConnection,
    conversation_id: &str,
) -> Result<Vec<Uuid>, StorageError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT user_id FROM conversation_participants WHERE conversation_id = ? ORDER BY rowid",
    )
    .bind(conversation_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(|(id,)| parse_id(id)).collect()
}

pub(crate) async fn load_conversation(
    conn: &mut SqliteConnection,
    conversation_id: Uuid,
) -> Result<Option<Conversation>, StorageError> {
    let row: Option<(String, DateTime<Utc>)> =
        sqlx::query_as("SELECT id, created_at FROM conversations WHERE id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

    let Some((id, created_at)) = row else {
        return Ok(None);
    };
    let participants = participants_of(conn, &id).await?;

    Ok(Some(Conversation {
        id: parse_id(&id)?,
        participants,
        created_at,
    }))
}

impl ChatStore {
    /// Creates a conversation between at least two distinct existing users.
    #[instrument(skip(self, participant_ids), fields(participants = participant_ids.len()))]
    pub async fn create_conversation(
        &self,
        participant_ids: &[Uuid],
    ) -> Result<Conversation, StorageError> {
        let mut seen = HashSet::new();
        let participants: Vec<Uuid> = participant_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        if participants.len() < MIN_PARTICIPANTS {
            return Err(StorageError::Validation(
                "A conversation must have at least 2 participants.".to_string(),
            ));
        }

        let mut tx = self.pool().begin().await?;

        for user_id in &participants {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE id = ?")
                .bind(user_id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(StorageError::NotFound(format!("user {}", user_id)));
            }
        }

        let conversation = Conversation {
            id: Uuid::new_v4(),
            participants,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO conversations (id, created_at) VALUES (?, ?)")
            .bind(conversation.id.to_string())
            .bind(conversation.created_at)
            .execute(&mut *tx)
            .await?;

        for user_id in &conversation.participants {
            sqlx::query("INSERT INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)")
                .bind(conversation.id.to_string())
                .bind(user_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(conversation_id = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    pub async fn get_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, StorageError> {
        let mut conn = self.pool().acquire().await?;
        load_conversation(&mut *conn, conversation_id).await
    }

    /// Conversations the user participates in, newest first.
    pub async fn list_conversations_for(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Conversation>, StorageError> {
        let mut conn = self.pool().acquire().await?;

        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT c.id, c.created_at FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id
            WHERE p.user_id = ?
            ORDER BY c.created_at DESC, c.rowid DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

        let mut conversations = Vec::with_capacity(rows.len());
        for (id, created_at) in rows {
            let participants = participants_of(&mut *conn, &id).await?;
            conversations.push(Conversation {
                id: parse_id(&id)?,
                participants,
                created_at,
            });
        }
        Ok(conversations)
    }

    /// Checks that `user_id` is a participant of `conversation_id`.
    pub async fn is_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StorageError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await?;
        Ok(row.is_some())
    }
}
