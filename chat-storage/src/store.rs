//! The entity store: users, conversations, messages, notifications and edit history on SQLite.
//!
//! Per-entity operations live in `user_repo`, `conversation_repo`, `message_repo` and
//! `notification_repo`; this module owns the pool and the observer list.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::error::StorageError;
use crate::observer::StoreObserver;
use crate::schema::init_schema;
use crate::side_effects::SideEffectCoordinator;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct ChatStore {
    pool_manager: SqlitePoolManager,
    pub(crate) observers: Vec<Arc<dyn StoreObserver>>,
}

impl ChatStore {
    /// Opens the store with the [`SideEffectCoordinator`] as its only observer.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        Self::with_observers(database_url, vec![Arc::new(SideEffectCoordinator)]).await
    }

    /// Opens the store with an explicit observer list, run in the given order.
    pub async fn with_observers(
        database_url: &str,
        observers: Vec<Arc<dyn StoreObserver>>,
    ) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        init_schema(pool_manager.pool()).await?;
        info!(observers = observers.len(), "Chat store ready");
        Ok(Self {
            pool_manager,
            observers,
        })
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        self.pool_manager.pool()
    }
}
