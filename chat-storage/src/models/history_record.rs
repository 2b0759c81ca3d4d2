use chat_core::MessageHistory;
use chrono::{DateTime, Utc};

use super::{parse_id, parse_optional_id};
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct MessageHistoryRecord {
    pub id: String,
    pub message_id: String,
    pub old_content: String,
    pub edited_at: DateTime<Utc>,
    pub edited_by: Option<String>,
}

impl TryFrom<MessageHistoryRecord> for MessageHistory {
    type Error = StorageError;

    fn try_from(record: MessageHistoryRecord) -> Result<Self, Self::Error> {
        Ok(MessageHistory {
            id: parse_id(&record.id)?,
            message_id: parse_id(&record.message_id)?,
            old_content: record.old_content,
            edited_at: record.edited_at,
            edited_by: parse_optional_id(record.edited_by.as_deref())?,
        })
    }
}
