//! Query parameters for listing/filtering messages.
//!
//! Used by ChatStore::list_messages. Without a conversation the query matches nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrdering {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageQuery {
    pub conversation_id: Option<Uuid>,
    pub sender_id: Option<Uuid>,
    /// Inclusive lower bound on the message timestamp.
    pub sent_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the message timestamp.
    pub sent_before: Option<DateTime<Utc>>,
    /// Substring match on content.
    pub search: Option<String>,
    #[serde(default)]
    pub ordering: MessageOrdering,
    pub limit: Option<i64>,
    /// Pagination offset (used with limit).
    pub offset: Option<i64>,
}

impl MessageQuery {
    pub fn for_conversation(conversation_id: Uuid) -> Self {
        Self {
            conversation_id: Some(conversation_id),
            ..Self::default()
        }
    }

    pub fn sender(mut self, sender_id: Uuid) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn between(mut self, after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        self.sent_after = after;
        self.sent_before = before;
        self
    }

    pub fn search(mut self, keyword: impl Into<String>) -> Self {
        self.search = Some(keyword.into());
        self
    }

    pub fn ordering(mut self, ordering: MessageOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}
