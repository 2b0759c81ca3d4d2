//! Hook points on the store's write paths.
//!
//! Observers are registered when the store is built and run, in registration order, inside the
//! transaction of the write that triggers them. An observer error rolls the whole write back.

use async_trait::async_trait;
use chat_core::{Message, User};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::StorageError;

#[async_trait]
pub trait StoreObserver: Send + Sync {
    /// After a new message row is inserted. Not called for idempotent replays or updates.
    async fn message_created(
        &self,
        _conn: &mut SqliteConnection,
        _message: &Message,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    /// Before a message update is written. `message` carries the incoming content and may be
    /// modified; the stored row still holds the old state.
    async fn message_before_update(
        &self,
        _conn: &mut SqliteConnection,
        _message: &mut Message,
        _editor: Option<Uuid>,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    /// After the user row has been deleted.
    async fn user_deleted(
        &self,
        _conn: &mut SqliteConnection,
        _user: &User,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}
