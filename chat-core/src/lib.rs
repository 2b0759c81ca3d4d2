//! # chat-core
//!
//! Domain types for the chat: users, conversations, messages, notifications and edit history;
//! the [`AccessPolicy`] and [`RolePolicy`] decisions, the reply-tree assembler, the
//! [`Middleware`] trait, and tracing initialization. No I/O besides the log file.

pub mod error;
pub mod logger;
pub mod policy;
pub mod thread;
pub mod types;

pub use error::{ChatError, Result};
pub use logger::init_tracing;
pub use policy::{AccessPolicy, Resource, RolePolicy};
pub use thread::{assemble_thread, assemble_threads, flatten_threads, ThreadEntry, ThreadNode};
pub use types::{
    ChatRequest, Conversation, Message, MessageHistory, Method, Middleware, NewMessage, NewUser,
    Notification, Outcome, RequestContext, Role, User,
};
