//! Row models for the store's tables, plus the message listing query.
//!
//! Records mirror the SQLite columns (ids as TEXT); `TryFrom` converts them into `chat_core` types.

mod history_record;
mod message_query;
mod message_record;
mod notification_record;
mod user_record;

pub(crate) use history_record::MessageHistoryRecord;
pub use message_query::{MessageOrdering, MessageQuery};
pub(crate) use message_record::{MessageRecord, MESSAGE_COLUMNS};
pub(crate) use notification_record::NotificationRecord;
pub(crate) use user_record::UserRecord;

use uuid::Uuid;

use crate::error::StorageError;

pub(crate) fn parse_id(value: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(value).map_err(|e| StorageError::Decode(format!("invalid id {}: {}", value, e)))
}

pub(crate) fn parse_optional_id(value: Option<&str>) -> Result<Option<Uuid>, StorageError> {
    value.map(parse_id).transpose()
}
