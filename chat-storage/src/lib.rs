//! Storage crate: SQLite persistence for users, conversations, messages, notifications and edit
//! history.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – Row records and [`MessageQuery`]
//! - [`observer`] – [`StoreObserver`] hook points run inside write transactions
//! - [`side_effects`] – [`SideEffectCoordinator`]: notifications, edit history, user cleanup
//! - [`store`] – [`ChatStore`]
//! - [`sqlite_pool`] – SqlitePoolManager
//!
//! Entity operations are `ChatStore` methods split across `user_repo`, `conversation_repo`,
//! `message_repo` and `notification_repo`.

mod conversation_repo;
mod error;
mod message_repo;
mod models;
mod notification_repo;
mod observer;
mod schema;
mod side_effects;
mod sqlite_pool;
mod store;
mod user_repo;

pub use error::StorageError;
pub use models::{MessageOrdering, MessageQuery};
pub use observer::StoreObserver;
pub use side_effects::{CleanupReport, SideEffectCoordinator};
pub use sqlite_pool::SqlitePoolManager;
pub use store::ChatStore;
