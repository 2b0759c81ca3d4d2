//! User-facing chat operations.
//!
//! Each operation builds a [`ChatRequest`] from the caller's [`RequestContext`], runs through the
//! handler chain (time window, rate limit, request log), checks the access policy and then talks to
//! the store. Policy failures return before any write.

use std::sync::Arc;

use chat_core::{
    assemble_thread, assemble_threads, AccessPolicy, ChatError, ChatRequest, Conversation, Message,
    MessageHistory, Method, NewMessage, NewUser, Notification, RequestContext, Resource, Result,
    RolePolicy, ThreadNode, User,
};
use chat_middleware::RateLimitStore;
use chat_storage::{ChatStore, MessageQuery};
use handler_chain::HandlerChain;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatService {
    store: ChatStore,
    chain: HandlerChain,
    access: AccessPolicy,
    roles: RolePolicy,
    rate_limits: Arc<RateLimitStore>,
    page_size: i64,
}

impl ChatService {
    pub fn new(
        store: ChatStore,
        chain: HandlerChain,
        rate_limits: Arc<RateLimitStore>,
        page_size: i64,
    ) -> Self {
        Self {
            store,
            chain,
            access: AccessPolicy::new(),
            roles: RolePolicy::default(),
            rate_limits,
            page_size,
        }
    }

    /// Replaces the role gate used by [`remove_user`](Self::remove_user).
    pub fn with_role_policy(mut self, roles: RolePolicy) -> Self {
        self.roles = roles;
        self
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn rate_limits(&self) -> &Arc<RateLimitStore> {
        &self.rate_limits
    }

    async fn conversation(&self, conversation_id: Uuid) -> Result<Conversation> {
        self.store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("conversation {}", conversation_id)))
    }

    async fn message_in_conversation(&self, message_id: Uuid) -> Result<(Message, Conversation)> {
        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("message {}", message_id)))?;
        let conversation = self.conversation(message.conversation_id).await?;
        Ok((message, conversation))
    }

    /// Denies anonymous callers, then loads the conversation and checks the actor participates in it.
    async fn participant_conversation(
        &self,
        request: &ChatRequest,
        conversation_id: Uuid,
    ) -> Result<Conversation> {
        self.access.authenticated(request.actor())?;
        let conversation = self.conversation(conversation_id).await?;
        self.access.authorize(
            request.actor(),
            Resource::Conversation(&conversation),
            request.method,
        )?;
        Ok(conversation)
    }

    /// Denies anonymous callers, then loads the message and checks the actor participates in its
    /// conversation.
    async fn participant_message(&self, request: &ChatRequest, message_id: Uuid) -> Result<Message> {
        self.access.authenticated(request.actor())?;
        let (message, conversation) = self.message_in_conversation(message_id).await?;
        self.access.authorize(
            request.actor(),
            Resource::Message {
                message: &message,
                conversation: &conversation,
            },
            request.method,
        )?;
        Ok(message)
    }

    #[instrument(skip(self, ctx, new_user), fields(email = %new_user.email))]
    pub async fn register_user(&self, ctx: &RequestContext, new_user: NewUser) -> Result<User> {
        let request = ctx.request(Method::Post, "/users");
        self.chain
            .handle(&request, || async {
                let user = self.store.create_user(&new_user).await?;
                info!(user_id = %user.id, "User registered");
                Ok(user)
            })
            .await
    }

    /// Creates a conversation. The creator does not have to be among the participants.
    #[instrument(skip(self, ctx, participant_ids))]
    pub async fn create_conversation(
        &self,
        ctx: &RequestContext,
        participant_ids: &[Uuid],
    ) -> Result<Conversation> {
        let request = ctx.request(Method::Post, "/conversations");
        self.chain
            .handle(&request, || async {
                self.access.authenticated(request.actor())?;
                Ok(self.store.create_conversation(participant_ids).await?)
            })
            .await
    }

    pub async fn list_conversations(&self, ctx: &RequestContext) -> Result<Vec<Conversation>> {
        let request = ctx.request(Method::Get, "/conversations");
        self.chain
            .handle(&request, || async {
                let actor = self.access.authenticated(request.actor())?;
                Ok(self.store.list_conversations_for(actor.id).await?)
            })
            .await
    }

    pub async fn get_conversation(
        &self,
        ctx: &RequestContext,
        conversation_id: Uuid,
    ) -> Result<Conversation> {
        let request = ctx.request(Method::Get, format!("/conversations/{}", conversation_id));
        self.chain
            .handle(&request, || async {
                self.participant_conversation(&request, conversation_id).await
            })
            .await
    }

    /// Sends a message as the actor. Receiver and parent rules are enforced by the store.
    #[instrument(skip(self, ctx, new_message), fields(conversation_id = %new_message.conversation_id))]
    pub async fn send_message(&self, ctx: &RequestContext, new_message: NewMessage) -> Result<Message> {
        let request = ctx.request(
            Method::Post,
            format!("/conversations/{}/messages", new_message.conversation_id),
        );
        self.chain
            .handle(&request, || async {
                self.participant_conversation(&request, new_message.conversation_id)
                    .await?;
                let sender = self.access.authenticated(request.actor())?;
                Ok(self.store.create_message(sender.id, &new_message).await?)
            })
            .await
    }

    /// Replaces a message's content. Any participant may edit; the editor is recorded in history.
    #[instrument(skip(self, ctx, content))]
    pub async fn edit_message(
        &self,
        ctx: &RequestContext,
        message_id: Uuid,
        content: &str,
    ) -> Result<Message> {
        let request = ctx.request(Method::Patch, format!("/messages/{}", message_id));
        self.chain
            .handle(&request, || async {
                self.participant_message(&request, message_id).await?;
                let editor = request.actor().map(|user| user.id);
                Ok(self
                    .store
                    .update_message_content(message_id, content, editor)
                    .await?)
            })
            .await
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_message(&self, ctx: &RequestContext, message_id: Uuid) -> Result<()> {
        let request = ctx.request(Method::Delete, format!("/messages/{}", message_id));
        self.chain
            .handle(&request, || async {
                self.participant_message(&request, message_id).await?;
                if !self.store.delete_message(message_id).await? {
                    return Err(ChatError::NotFound(format!("message {}", message_id)));
                }
                Ok(())
            })
            .await
    }

    /// Lists a conversation's messages. Without an explicit limit one page of the configured size
    /// is returned.
    pub async fn list_messages(
        &self,
        ctx: &RequestContext,
        mut query: MessageQuery,
    ) -> Result<Vec<Message>> {
        let path = match query.conversation_id {
            Some(conversation_id) => format!("/conversations/{}/messages", conversation_id),
            None => "/messages".to_string(),
        };
        let request = ctx.request(Method::Get, path);
        if query.limit.is_none() {
            query.limit = Some(self.page_size);
        }

        self.chain
            .handle(&request, || async {
                self.access.authenticated(request.actor())?;
                let conversation_id = query.conversation_id.ok_or_else(|| {
                    ChatError::Validation("conversation_id is required".to_string())
                })?;
                self.participant_conversation(&request, conversation_id)
                    .await?;
                Ok(self.store.list_messages(&query).await?)
            })
            .await
    }

    /// Root threads of a conversation, replies nested under their parents.
    pub async fn threaded_messages(
        &self,
        ctx: &RequestContext,
        conversation_id: Uuid,
    ) -> Result<Vec<ThreadNode>> {
        let request = ctx.request(
            Method::Get,
            format!("/conversations/{}/threads", conversation_id),
        );
        self.chain
            .handle(&request, || async {
                self.participant_conversation(&request, conversation_id)
                    .await?;
                let messages = self.store.conversation_messages(conversation_id).await?;
                Ok(assemble_threads(&messages))
            })
            .await
    }

    /// The reply tree rooted at one message.
    pub async fn message_thread(&self, ctx: &RequestContext, message_id: Uuid) -> Result<ThreadNode> {
        let request = ctx.request(Method::Get, format!("/messages/{}/thread", message_id));
        self.chain
            .handle(&request, || async {
                let message = self.participant_message(&request, message_id).await?;
                let messages = self
                    .store
                    .conversation_messages(message.conversation_id)
                    .await?;
                assemble_thread(&messages, message_id)
                    .ok_or_else(|| ChatError::NotFound(format!("message {}", message_id)))
            })
            .await
    }

    pub async fn message_history(
        &self,
        ctx: &RequestContext,
        message_id: Uuid,
    ) -> Result<Vec<MessageHistory>> {
        let request = ctx.request(Method::Get, format!("/messages/{}/history", message_id));
        self.chain
            .handle(&request, || async {
                self.participant_message(&request, message_id).await?;
                Ok(self.store.message_history(message_id).await?)
            })
            .await
    }

    /// The actor's own notifications, newest first.
    pub async fn notifications(
        &self,
        ctx: &RequestContext,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let request = ctx.request(Method::Get, "/notifications");
        self.chain
            .handle(&request, || async {
                let actor = self.access.authenticated(request.actor())?;
                Ok(self.store.notifications_for(actor.id, unread_only).await?)
            })
            .await
    }

    /// Marks one of the actor's notifications read. Someone else's notification is `NotFound`.
    pub async fn mark_notification_read(
        &self,
        ctx: &RequestContext,
        notification_id: Uuid,
    ) -> Result<()> {
        let request = ctx.request(
            Method::Patch,
            format!("/notifications/{}", notification_id),
        );
        self.chain
            .handle(&request, || async {
                let actor = self.access.authenticated(request.actor())?;
                if !self
                    .store
                    .mark_notification_read(notification_id, actor.id)
                    .await?
                {
                    return Err(ChatError::NotFound(format!(
                        "notification {}",
                        notification_id
                    )));
                }
                Ok(())
            })
            .await
    }

    /// Deletes the acting user's account together with their messages and notifications.
    #[instrument(skip(self, ctx))]
    pub async fn delete_account(&self, ctx: &RequestContext) -> Result<()> {
        let request = ctx.request(Method::Delete, "/users/me");
        self.chain
            .handle(&request, || async {
                let actor = self.access.authenticated(request.actor())?;
                if !self.store.delete_user(actor.id).await? {
                    return Err(ChatError::NotFound(format!("user {}", actor.id)));
                }
                info!(user_id = %actor.id, "Account deleted");
                Ok(())
            })
            .await
    }

    /// Deletes another user. Only actors holding an allowed role (admin by default) may do this.
    #[instrument(skip(self, ctx))]
    pub async fn remove_user(&self, ctx: &RequestContext, user_id: Uuid) -> Result<()> {
        let request = ctx.request(Method::Delete, format!("/users/{}", user_id));
        self.chain
            .handle(&request, || async {
                self.access.authenticated(request.actor())?;
                self.roles.authorize(request.actor())?;
                if !self.store.delete_user(user_id).await? {
                    return Err(ChatError::NotFound(format!("user {}", user_id)));
                }
                info!(user_id = %user_id, "User removed");
                Ok(())
            })
            .await
    }
}
