//! Core types: users, conversations, messages and their derived records, inbound requests, and the Middleware trait.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

/// Account role. Closed set; stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Host,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Host => "host",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Role::Guest),
            "host" => Ok(Role::Host),
            "admin" => Ok(Role::Admin),
            other => Err(ChatError::Validation(format!("unknown role: {}", other))),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all users.
    pub email: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.first_name, self.last_name, self.email)
    }
}

/// Input for registering a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// A conversation and the ids of its participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }
}

/// A message inside a conversation, optionally replying to another message of the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub edited: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Input for sending a message. `idempotency_key` lets a client retry a send without duplicating it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub idempotency_key: Option<String>,
}

/// Created once per newly inserted message, addressed to its receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a message's content taken right before a content-changing edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHistory {
    pub id: Uuid,
    pub message_id: Uuid,
    pub old_content: String,
    pub edited_at: DateTime<Utc>,
    /// `None` once the editor's account is gone.
    pub edited_by: Option<Uuid>,
}

/// Request method. Safe methods never mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn is_safe(&self) -> bool {
        matches!(self, Method::Get | Method::Head | Method::Options)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is calling, from where, and when. `actor` is `None` for unauthenticated callers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: Option<User>,
    pub remote_addr: IpAddr,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn anonymous(remote_addr: IpAddr) -> Self {
        Self {
            actor: None,
            remote_addr,
            received_at: Utc::now(),
        }
    }

    pub fn authenticated(actor: User, remote_addr: IpAddr) -> Self {
        Self {
            actor: Some(actor),
            remote_addr,
            received_at: Utc::now(),
        }
    }

    /// Overrides the receive time (used by time-based gates).
    pub fn at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn request(&self, method: Method, path: impl Into<String>) -> ChatRequest {
        ChatRequest {
            context: self.clone(),
            method,
            path: path.into(),
        }
    }
}

/// One inbound operation as seen by the middleware chain.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub context: RequestContext,
    pub method: Method,
    pub path: String,
}

impl ChatRequest {
    pub fn actor(&self) -> Option<&User> {
        self.context.actor.as_ref()
    }

    pub fn remote_addr(&self) -> IpAddr {
        self.context.remote_addr
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.context.received_at
    }
}

/// Result of the wrapped operation, handed to `Middleware::after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed(String),
}

/// Request filter run by the handler chain. `before` runs in registration order and may stop the
/// request by returning `Ok(false)` or an error; `after` runs in reverse order with the outcome.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn before(&self, _request: &ChatRequest) -> crate::error::Result<bool> {
        Ok(true)
    }

    async fn after(&self, _request: &ChatRequest, _outcome: &Outcome) -> crate::error::Result<()> {
        Ok(())
    }
}
