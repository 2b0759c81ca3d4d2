//! CLI parser.

use chat_core::Role;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "chat")]
#[command(about = "Chat CLI: users, conversations, messages, threads, notifications", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Email of the registered user to act as.
    #[arg(long = "as", global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database tables (DATABASE_URL) if missing.
    Migrate,
    /// Register a user.
    AddUser {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        /// guest, host or admin.
        #[arg(long, default_value = "guest")]
        role: Role,
    },
    /// Start a conversation between the given users (emails).
    NewConversation {
        #[arg(long = "with", required = true)]
        participants: Vec<String>,
    },
    /// List the conversations you participate in.
    Conversations,
    /// Send a message to a conversation.
    Send {
        conversation: Uuid,
        content: String,
        /// Receiver email; must be a participant.
        #[arg(long)]
        to: Option<String>,
        /// Parent message id for a reply.
        #[arg(long)]
        reply_to: Option<Uuid>,
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Replace a message's content.
    Edit { message: Uuid, content: String },
    DeleteMessage { message: Uuid },
    /// List messages of a conversation, newest first.
    Messages {
        conversation: Uuid,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
        #[arg(long)]
        oldest_first: bool,
    },
    /// Print the reply trees of a conversation, or the tree under one message.
    Threads {
        conversation: Option<Uuid>,
        #[arg(long, conflicts_with = "conversation")]
        root: Option<Uuid>,
    },
    /// Print the edit history of a message.
    History { message: Uuid },
    /// Print your notifications; optionally mark one read.
    Notifications {
        #[arg(long)]
        unread: bool,
        #[arg(long)]
        mark_read: Option<Uuid>,
    },
    /// Delete your own account, or another user's (admin only).
    DeleteUser { email: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_with_actor() {
        let conversation = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "chat",
            "--as",
            "alice@example.com",
            "send",
            &conversation.to_string(),
            "hello",
            "--to",
            "bob@example.com",
        ])
        .unwrap();

        assert_eq!(cli.actor.as_deref(), Some("alice@example.com"));
        match cli.command {
            Commands::Send {
                conversation: parsed,
                content,
                to,
                reply_to,
                ..
            } => {
                assert_eq!(parsed, conversation);
                assert_eq!(content, "hello");
                assert_eq!(to.as_deref(), Some("bob@example.com"));
                assert!(reply_to.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_user_role() {
        let cli = Cli::try_parse_from([
            "chat",
            "add-user",
            "--first-name",
            "Ada",
            "--last-name",
            "Admin",
            "--email",
            "ada@example.com",
            "--role",
            "admin",
        ])
        .unwrap();

        match cli.command {
            Commands::AddUser { role, phone, .. } => {
                assert_eq!(role, Role::Admin);
                assert!(phone.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_role_and_missing_participants() {
        assert!(Cli::try_parse_from([
            "chat", "add-user", "--first-name", "A", "--last-name", "B", "--email", "a@b", "--role",
            "moderator",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["chat", "--as", "a@b", "new-conversation"]).is_err());
    }

    #[test]
    fn test_actor_after_subcommand() {
        let cli = Cli::try_parse_from(["chat", "notifications", "--unread", "--as", "bob@example.com"])
            .unwrap();
        assert_eq!(cli.actor.as_deref(), Some("bob@example.com"));
        assert!(matches!(cli.command, Commands::Notifications { unread: true, .. }));
    }
}
