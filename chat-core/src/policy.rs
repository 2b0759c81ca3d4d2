//! Access policy: decides whether an acting identity may touch a conversation or a message.
//!
//! Every decision requires an authenticated actor. For conversations the actor must be a
//! participant; for messages the actor must be a participant of the message's conversation.
//! Within a conversation, participants may read, post, edit and delete any message, including
//! messages sent by other participants.

use tracing::{debug, warn};

use crate::error::{ChatError, Result};
use crate::types::{Conversation, Message, Method, Role, User};

/// The resource a request targets.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Conversation(&'a Conversation),
    /// A message together with the conversation it belongs to.
    Message {
        message: &'a Message,
        conversation: &'a Conversation,
    },
}

/// Participant-based policy for conversations and messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Request-level check: only authenticated actors pass.
    pub fn has_permission(&self, actor: Option<&User>) -> bool {
        actor.is_some()
    }

    /// Object-level decision.
    pub fn allows(&self, actor: Option<&User>, resource: Resource<'_>, method: Method) -> bool {
        let Some(actor) = actor else {
            return false;
        };

        match resource {
            Resource::Conversation(conversation) => conversation.has_participant(actor.id),
            Resource::Message {
                message,
                conversation,
            } => message_decision(actor, message, conversation, method),
        }
    }

    /// Returns the actor, or `PermissionDenied` for anonymous requests.
    pub fn authenticated<'u>(&self, actor: Option<&'u User>) -> Result<&'u User> {
        match actor {
            Some(user) if self.has_permission(actor) => Ok(user),
            _ => {
                warn!("Unauthenticated request denied");
                Err(ChatError::PermissionDenied(
                    "Authentication credentials were not provided.".to_string(),
                ))
            }
        }
    }

    /// Same as [`allows`](Self::allows) but returns `PermissionDenied` on deny.
    pub fn authorize(&self, actor: Option<&User>, resource: Resource<'_>, method: Method) -> Result<()> {
        self.authenticated(actor)?;

        if self.allows(actor, resource, method) {
            Ok(())
        } else {
            warn!(
                user_id = ?actor.map(|a| a.id),
                method = %method,
                "Non-participant denied"
            );
            Err(ChatError::PermissionDenied(
                "You are not a participant of this conversation.".to_string(),
            ))
        }
    }
}

fn message_decision(actor: &User, message: &Message, conversation: &Conversation, method: Method) -> bool {
    if message.conversation_id != conversation.id || !conversation.has_participant(actor.id) {
        return false;
    }

    // Every method is open to participants, whoever sent the message.
    debug!(user_id = %actor.id, message_id = %message.id, method = %method, "Message access granted");
    true
}

/// Role-gated variant: authenticated and holding one of the allowed roles.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    allowed: Vec<Role>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            allowed: vec![Role::Admin],
        }
    }
}

impl RolePolicy {
    pub fn new(allowed: Vec<Role>) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, actor: Option<&User>) -> bool {
        actor.is_some_and(|a| self.allowed.contains(&a.role))
    }

    pub fn authorize(&self, actor: Option<&User>) -> Result<()> {
        if self.allows(actor) {
            Ok(())
        } else {
            Err(ChatError::PermissionDenied(
                "You do not have permission to perform this action.".to_string(),
            ))
        }
    }
}
