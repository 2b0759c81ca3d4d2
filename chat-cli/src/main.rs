//! chat CLI: drives the chat service against a local SQLite database. Config from env.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::{Context, Result};
use chat_cli::{Cli, Commands};
use chat_core::{flatten_threads, init_tracing, NewMessage, NewUser, RequestContext, User};
use chat_service::{build_chat_service, AppConfig, ChatService};
use chat_storage::{MessageOrdering, MessageQuery};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

const LOCAL_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Load config from env")?;
    init_tracing(&config.log_file)?;

    let service = build_chat_service(&config).await?;
    run(&service, cli).await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn user_by_email(service: &ChatService, email: &str) -> Result<User> {
    service
        .store()
        .find_user_by_email(email)
        .await?
        .with_context(|| format!("No user registered with email {}", email))
}

/// Context for the `--as` user; commands that act on someone's behalf require it.
async fn acting_as(service: &ChatService, actor: Option<&str>) -> Result<RequestContext> {
    let email = actor.context("This command needs --as <email>")?;
    let user = user_by_email(service, email).await?;
    Ok(RequestContext::authenticated(user, LOCAL_ADDR))
}

async fn run(service: &ChatService, cli: Cli) -> Result<()> {
    let actor = cli.actor.as_deref();

    match cli.command {
        Commands::Migrate => {
            info!("Schema ready");
            println!("Database ready.");
        }
        Commands::AddUser {
            first_name,
            last_name,
            email,
            phone,
            role,
        } => {
            let user = service
                .register_user(
                    &RequestContext::anonymous(LOCAL_ADDR),
                    NewUser {
                        first_name,
                        last_name,
                        email,
                        phone_number: phone,
                        role,
                    },
                )
                .await?;
            print_json(&user)?;
        }
        Commands::NewConversation { participants } => {
            let ctx = acting_as(service, actor).await?;
            let mut ids = Vec::with_capacity(participants.len());
            for email in &participants {
                ids.push(user_by_email(service, email).await?.id);
            }
            let conversation = service.create_conversation(&ctx, &ids).await?;
            print_json(&conversation)?;
        }
        Commands::Conversations => {
            let ctx = acting_as(service, actor).await?;
            print_json(&service.list_conversations(&ctx).await?)?;
        }
        Commands::Send {
            conversation,
            content,
            to,
            reply_to,
            idempotency_key,
        } => {
            let ctx = acting_as(service, actor).await?;
            let receiver_id = match to {
                Some(email) => Some(user_by_email(service, &email).await?.id),
                None => None,
            };
            let message = service
                .send_message(
                    &ctx,
                    NewMessage {
                        conversation_id: conversation,
                        receiver_id,
                        parent_id: reply_to,
                        content,
                        idempotency_key,
                    },
                )
                .await?;
            print_json(&message)?;
        }
        Commands::Edit { message, content } => {
            let ctx = acting_as(service, actor).await?;
            print_json(&service.edit_message(&ctx, message, &content).await?)?;
        }
        Commands::DeleteMessage { message } => {
            let ctx = acting_as(service, actor).await?;
            service.delete_message(&ctx, message).await?;
            println!("Deleted message {}.", message);
        }
        Commands::Messages {
            conversation,
            search,
            limit,
            offset,
            oldest_first,
        } => {
            let ctx = acting_as(service, actor).await?;
            let mut query = MessageQuery::for_conversation(conversation);
            query.search = search;
            query.limit = limit;
            query.offset = offset;
            if oldest_first {
                query = query.ordering(MessageOrdering::OldestFirst);
            }
            print_json(&service.list_messages(&ctx, query).await?)?;
        }
        Commands::Threads { conversation, root } => {
            let ctx = acting_as(service, actor).await?;
            match (conversation, root) {
                (_, Some(root)) => print_json(&service.message_thread(&ctx, root).await?.flatten())?,
                (Some(conversation), None) => {
                    let threads = service.threaded_messages(&ctx, conversation).await?;
                    print_json(&flatten_threads(&threads))?
                }
                (None, None) => anyhow::bail!("Give a conversation id or --root <message id>"),
            }
        }
        Commands::History { message } => {
            let ctx = acting_as(service, actor).await?;
            print_json(&service.message_history(&ctx, message).await?)?;
        }
        Commands::Notifications { unread, mark_read } => {
            let ctx = acting_as(service, actor).await?;
            if let Some(notification_id) = mark_read {
                service.mark_notification_read(&ctx, notification_id).await?;
            }
            print_json(&service.notifications(&ctx, unread).await?)?;
        }
        Commands::DeleteUser { email } => {
            let ctx = acting_as(service, actor).await?;
            match email {
                Some(email) => {
                    let target: Uuid = user_by_email(service, &email).await?.id;
                    service.remove_user(&ctx, target).await?;
                    println!("Removed user {}.", email);
                }
                None => {
                    service.delete_account(&ctx).await?;
                    println!("Account deleted.");
                }
            }
        }
    }

    Ok(())
}
