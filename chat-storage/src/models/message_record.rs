//! Message record model for persistence.
//!
//! Maps to the `messages` table; `idempotency_key` is only used for lookups and is not loaded.

use chat_core::Message;
use chrono::{DateTime, Utc};

use super::{parse_id, parse_optional_id};
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub parent_id: Option<String>,
    pub content: String,
    pub edited: bool,
    pub timestamp: DateTime<Utc>,
}

/// Column list matching [`MessageRecord`].
pub(crate) const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, receiver_id, parent_id, content, edited, timestamp";

impl TryFrom<MessageRecord> for Message {
    type Error = StorageError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        Ok(Message {
            id: parse_id(&record.id)?,
            conversation_id: parse_id(&record.conversation_id)?,
            sender_id: parse_id(&record.sender_id)?,
            receiver_id: parse_optional_id(record.receiver_id.as_deref())?,
            parent_id: parse_optional_id(record.parent_id.as_deref())?,
            content: record.content,
            edited: record.edited,
            timestamp: record.timestamp,
        })
    }
}
