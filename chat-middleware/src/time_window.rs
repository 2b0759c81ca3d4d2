use async_trait::async_trait;
use chat_core::{ChatError, ChatRequest, Middleware, Result};
use chrono::{FixedOffset, Local, Timelike};
use tracing::{instrument, warn};

use crate::TIME_WINDOW_REJECTION;

/// Rejects requests received during `[closed_from, closed_until)` wall-clock hours.
///
/// The window may wrap midnight (21 → 6). Equal bounds mean the chat is never closed. The hour is
/// taken from the request's `received_at` in `offset`, or in the local zone when no offset is set.
#[derive(Debug, Clone)]
pub struct TimeWindowMiddleware {
    closed_from: u32,
    closed_until: u32,
    offset: Option<FixedOffset>,
}

impl TimeWindowMiddleware {
    pub fn new(closed_from: u32, closed_until: u32) -> Self {
        Self {
            closed_from,
            closed_until,
            offset: None,
        }
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_closed_at(&self, hour: u32) -> bool {
        if self.closed_from == self.closed_until {
            false
        } else if self.closed_from < self.closed_until {
            hour >= self.closed_from && hour < self.closed_until
        } else {
            hour >= self.closed_from || hour < self.closed_until
        }
    }

    fn request_hour(&self, request: &ChatRequest) -> u32 {
        match self.offset {
            Some(offset) => request.received_at().with_timezone(&offset).hour(),
            None => request.received_at().with_timezone(&Local).hour(),
        }
    }
}

impl Default for TimeWindowMiddleware {
    fn default() -> Self {
        Self::new(21, 6)
    }
}

#[async_trait]
impl Middleware for TimeWindowMiddleware {
    #[instrument(skip(self, request), fields(path = %request.path))]
    async fn before(&self, request: &ChatRequest) -> Result<bool> {
        let hour = self.request_hour(request);
        if self.is_closed_at(hour) {
            warn!(hour, remote_addr = %request.remote_addr(), "Request outside opening hours");
            return Err(ChatError::PermissionDenied(TIME_WINDOW_REJECTION.to_string()));
        }
        Ok(true)
    }
}
