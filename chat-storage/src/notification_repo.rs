//! Notifications addressed to a user.

use chat_core::Notification;
use tracing::info;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::NotificationRecord;
use crate::store::ChatStore;

impl ChatStore {
    /// The user's notifications, newest first.
    pub async fn notifications_for(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, StorageError> {
        let sql = if unread_only {
            "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 ORDER BY created_at DESC, rowid DESC"
        } else {
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
        };

        let records: Vec<NotificationRecord> = sqlx::query_as(sql)
            .bind(user_id.to_string())
            .fetch_all(self.pool())
            .await?;

        records.into_iter().map(Notification::try_from).collect()
    }

    /// Marks one of the user's notifications as read. Returns `false` if the notification does not
    /// exist or belongs to someone else.
    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(notification_id.to_string())
            .bind(user_id.to_string())
            .execute(self.pool())
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            info!(notification_id = %notification_id, "Notification marked as read");
        }
        Ok(updated)
    }
}
