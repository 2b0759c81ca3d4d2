use chat_core::Notification;
use chrono::{DateTime, Utc};

use super::parse_id;
use crate::error::StorageError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = StorageError;

    fn try_from(record: NotificationRecord) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: parse_id(&record.id)?,
            user_id: parse_id(&record.user_id)?,
            message_id: parse_id(&record.message_id)?,
            is_read: record.is_read,
            created_at: record.created_at,
        })
    }
}
