//! Derived records produced by message and user mutations.
//!
//! - new message: one notification for the receiver
//! - content change: history snapshot of the old content, message flagged as edited
//! - user deleted: messages sent or received by the user and the user's notifications are removed

use async_trait::async_trait;
use chat_core::{Message, User};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::StorageError;
use crate::observer::StoreObserver;

/// Rows removed by one user cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub messages_deleted: u64,
    pub notifications_deleted: u64,
}

/// The default observer registered by `ChatStore::new`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideEffectCoordinator;

impl SideEffectCoordinator {
    /// Deletes every message the user sent or received and every notification addressed to them.
    /// Running it again for the same user deletes nothing.
    #[instrument(skip(self, conn))]
    pub async fn cleanup_user_data(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
    ) -> Result<CleanupReport, StorageError> {
        let user_id = user_id.to_string();

        let messages = sqlx::query("DELETE FROM messages WHERE sender_id = ? OR receiver_id = ?")
            .bind(&user_id)
            .bind(&user_id)
            .execute(&mut *conn)
            .await?;

        let notifications = sqlx::query("DELETE FROM notifications WHERE user_id = ?")
            .bind(&user_id)
            .execute(&mut *conn)
            .await?;

        let report = CleanupReport {
            messages_deleted: messages.rows_affected(),
            notifications_deleted: notifications.rows_affected(),
        };
        info!(
            user_id = %user_id,
            messages_deleted = report.messages_deleted,
            notifications_deleted = report.notifications_deleted,
            "User data cleaned up"
        );
        Ok(report)
    }
}

#[async_trait]
impl StoreObserver for SideEffectCoordinator {
    async fn message_created(
        &self,
        conn: &mut SqliteConnection,
        message: &Message,
    ) -> Result<(), StorageError> {
        let Some(receiver_id) = message.receiver_id else {
            debug!(message_id = %message.id, "Message has no receiver, no notification");
            return Ok(());
        };

        let notification_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO notifications (id, user_id, message_id, is_read, created_at) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(notification_id.to_string())
        .bind(receiver_id.to_string())
        .bind(message.id.to_string())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        info!(
            notification_id = %notification_id,
            user_id = %receiver_id,
            message_id = %message.id,
            "Notification created"
        );
        Ok(())
    }

    async fn message_before_update(
        &self,
        conn: &mut SqliteConnection,
        message: &mut Message,
        editor: Option<Uuid>,
    ) -> Result<(), StorageError> {
        let stored: Option<(String,)> = sqlx::query_as("SELECT content FROM messages WHERE id = ?")
            .bind(message.id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        // Not stored yet: this is a creation, nothing to snapshot.
        let Some((old_content,)) = stored else {
            return Ok(());
        };

        if old_content == message.content {
            debug!(message_id = %message.id, "Content unchanged, no history");
            return Ok(());
        }

        let history_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO message_history (id, message_id, old_content, edited_at, edited_by) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(history_id.to_string())
        .bind(message.id.to_string())
        .bind(&old_content)
        .bind(Utc::now())
        .bind(editor.map(|id| id.to_string()))
        .execute(&mut *conn)
        .await?;

        message.edited = true;
        info!(history_id = %history_id, message_id = %message.id, "Message edit logged");
        Ok(())
    }

    async fn user_deleted(&self, conn: &mut SqliteConnection, user: &User) -> Result<(), StorageError> {
        self.cleanup_user_data(conn, user.id).await.map(|_| ())
    }
}
