//! Integration tests for [`chat_service::ChatService`].
//!
//! Drives every operation through the gate middleware, the access policy and an in-memory store.
//! Requests carry a fixed `received_at` and the time window is pinned to UTC.

use std::net::{IpAddr, Ipv4Addr};

use chat_core::{ChatError, NewMessage, NewUser, RequestContext, Role, User};
use chat_middleware::{TimeWindowMiddleware, RATE_LIMIT_REJECTION, TIME_WINDOW_REJECTION};
use chat_service::{build_chat_service_with, AppConfig, ChatService};
use chat_storage::MessageQuery;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use uuid::Uuid;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn localhost() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        rate_limit_max_requests: 1000,
        ..AppConfig::default()
    }
}

async fn service_with(config: AppConfig) -> ChatService {
    let time_window = TimeWindowMiddleware::new(
        config.chat_closed_from_hour,
        config.chat_closed_until_hour,
    )
    .with_offset(FixedOffset::east_opt(0).expect("zero offset"));
    build_chat_service_with(&config, time_window)
        .await
        .expect("Failed to build service")
}

async fn service() -> ChatService {
    service_with(test_config()).await
}

fn anonymous() -> RequestContext {
    RequestContext::anonymous(localhost()).at(at(12))
}

fn as_user(user: &User) -> RequestContext {
    RequestContext::authenticated(user.clone(), localhost()).at(at(12))
}

async fn register(service: &ChatService, first_name: &str, role: Role) -> User {
    service
        .register_user(
            &anonymous(),
            NewUser {
                first_name: first_name.to_string(),
                last_name: "Tester".to_string(),
                email: format!("{}@example.com", first_name.to_lowercase()),
                phone_number: None,
                role,
            },
        )
        .await
        .expect("Failed to register user")
}

fn message(conversation_id: Uuid, receiver: Option<&User>, content: &str) -> NewMessage {
    NewMessage {
        conversation_id,
        receiver_id: receiver.map(|u| u.id),
        content: content.to_string(),
        ..NewMessage::default()
    }
}

fn reply(conversation_id: Uuid, parent_id: Uuid, content: &str) -> NewMessage {
    NewMessage {
        parent_id: Some(parent_id),
        ..message(conversation_id, None, content)
    }
}

fn assert_denied<T: std::fmt::Debug>(result: chat_core::Result<T>, reason: &str) {
    match result {
        Err(ChatError::PermissionDenied(msg)) => assert_eq!(msg, reason),
        other => panic!("expected PermissionDenied({:?}), got {:?}", reason, other),
    }
}

/// **Test: Send, notify, edit by another participant, history.**
///
/// **Setup:** Alice and Bob share a conversation.
/// **Action:** Alice messages Bob; Bob edits Alice's message.
/// **Expected:** Bob has one notification; the edit is allowed, flagged, and logged with Bob as editor.
#[tokio::test]
async fn test_message_lifecycle() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Host).await;

    let conversation = service
        .create_conversation(&as_user(&alice), &[alice.id, bob.id])
        .await
        .unwrap();

    let sent = service
        .send_message(&as_user(&alice), message(conversation.id, Some(&bob), "Hi Bob"))
        .await
        .unwrap();
    assert_eq!(sent.sender_id, alice.id);

    let notifications = service.notifications(&as_user(&bob), false).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message_id, sent.id);

    let edited = service
        .edit_message(&as_user(&bob), sent.id, "Hi Bob!")
        .await
        .unwrap();
    assert!(edited.edited);

    let history = service.message_history(&as_user(&alice), sent.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_content, "Hi Bob");
    assert_eq!(history[0].edited_by, Some(bob.id));

    // The edit did not notify anyone again.
    assert_eq!(service.notifications(&as_user(&bob), false).await.unwrap().len(), 1);
}

/// **Test: A non-participant is denied on every conversation and message operation.**
#[tokio::test]
async fn test_non_participant_denied() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Guest).await;
    let mallory = register(&service, "Mallory", Role::Admin).await;

    let conversation = service
        .create_conversation(&as_user(&alice), &[alice.id, bob.id])
        .await
        .unwrap();
    let sent = service
        .send_message(&as_user(&alice), message(conversation.id, Some(&bob), "private"))
        .await
        .unwrap();

    let reason = "You are not a participant of this conversation.";
    let ctx = as_user(&mallory);
    assert_denied(service.get_conversation(&ctx, conversation.id).await, reason);
    assert_denied(
        service
            .send_message(&ctx, message(conversation.id, None, "let me in"))
            .await,
        reason,
    );
    assert_denied(
        service
            .list_messages(&ctx, MessageQuery::for_conversation(conversation.id))
            .await,
        reason,
    );
    assert_denied(service.threaded_messages(&ctx, conversation.id).await, reason);
    assert_denied(service.message_thread(&ctx, sent.id).await, reason);
    assert_denied(service.message_history(&ctx, sent.id).await, reason);
    assert_denied(service.edit_message(&ctx, sent.id, "defaced").await, reason);
    assert_denied(service.delete_message(&ctx, sent.id).await, reason);

    let stored = service.get_conversation(&as_user(&bob), conversation.id).await.unwrap();
    assert!(!stored.has_participant(mallory.id));
    let messages = service
        .list_messages(&as_user(&bob), MessageQuery::for_conversation(conversation.id))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "private");
}

/// **Test: Anonymous callers may register but nothing else.**
#[tokio::test]
async fn test_anonymous_denied() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Guest).await;

    let reason = "Authentication credentials were not provided.";
    assert_denied(
        service
            .create_conversation(&anonymous(), &[alice.id, bob.id])
            .await,
        reason,
    );
    assert_denied(service.list_conversations(&anonymous()).await, reason);
    assert_denied(service.notifications(&anonymous(), false).await, reason);
    assert_denied(service.delete_account(&anonymous()).await, reason);

    // Unknown ids are denied before any lookup.
    let unknown = Uuid::new_v4();
    assert_denied(service.get_conversation(&anonymous(), unknown).await, reason);
    assert_denied(service.threaded_messages(&anonymous(), unknown).await, reason);
    assert_denied(
        service
            .list_messages(&anonymous(), MessageQuery::for_conversation(unknown))
            .await,
        reason,
    );
    assert_denied(
        service.list_messages(&anonymous(), MessageQuery::default()).await,
        reason,
    );
    assert_denied(
        service
            .send_message(&anonymous(), message(unknown, None, "hello?"))
            .await,
        reason,
    );
    assert_denied(service.message_history(&anonymous(), unknown).await, reason);
    assert_denied(service.message_thread(&anonymous(), unknown).await, reason);
    assert_denied(service.edit_message(&anonymous(), unknown, "x").await, reason);
    assert_denied(service.delete_message(&anonymous(), unknown).await, reason);
}

/// **Test: Conversation creation validates participants.**
#[tokio::test]
async fn test_create_conversation_validation() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;

    match service.create_conversation(&as_user(&alice), &[alice.id]).await {
        Err(ChatError::Validation(msg)) => {
            assert_eq!(msg, "A conversation must have at least 2 participants.")
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let unknown = service
        .create_conversation(&as_user(&alice), &[alice.id, Uuid::new_v4()])
        .await;
    assert!(matches!(unknown, Err(ChatError::NotFound(_))));
}

/// **Test: Registering an email twice is a Conflict.**
#[tokio::test]
async fn test_register_duplicate_email() {
    let service = service().await;
    register(&service, "Alice", Role::Guest).await;

    let again = service
        .register_user(
            &anonymous(),
            NewUser {
                first_name: "Alice".to_string(),
                last_name: "Again".to_string(),
                email: "alice@example.com".to_string(),
                phone_number: None,
                role: Role::Guest,
            },
        )
        .await;
    assert!(matches!(again, Err(ChatError::Conflict(_))));
}

/// **Test: Threads nest replies under their parents.**
///
/// **Setup:** A (root), B replies to A, C replies to B, D (root).
/// **Action:** `threaded_messages` and `message_thread(A)`.
/// **Expected:** Two roots [A, D]; A → B → C.
#[tokio::test]
async fn test_threads() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Guest).await;
    let conversation = service
        .create_conversation(&as_user(&alice), &[alice.id, bob.id])
        .await
        .unwrap();

    let a = service
        .send_message(&as_user(&alice), message(conversation.id, Some(&bob), "A"))
        .await
        .unwrap();
    let b = service
        .send_message(&as_user(&bob), reply(conversation.id, a.id, "B"))
        .await
        .unwrap();
    let c = service
        .send_message(&as_user(&alice), reply(conversation.id, b.id, "C"))
        .await
        .unwrap();
    let d = service
        .send_message(&as_user(&bob), message(conversation.id, None, "D"))
        .await
        .unwrap();

    let threads = service
        .threaded_messages(&as_user(&bob), conversation.id)
        .await
        .unwrap();
    let roots: Vec<Uuid> = threads.iter().map(|t| t.id).collect();
    assert_eq!(roots, vec![a.id, d.id]);

    let thread = service.message_thread(&as_user(&alice), a.id).await.unwrap();
    assert_eq!(thread.replies.len(), 1);
    assert_eq!(thread.replies[0].id, b.id);
    assert_eq!(thread.replies[0].replies[0].id, c.id);
    assert!(thread.replies[0].replies[0].replies.is_empty());
    assert_eq!(thread.message_count(), 3);

    let subtree = service.message_thread(&as_user(&alice), b.id).await.unwrap();
    assert_eq!(subtree.message_count(), 2);
}

/// **Test: A very deep reply chain can be assembled, flattened and dropped.**
///
/// **Setup:** A chain of 20,000 messages, each replying to the previous one.
/// **Action:** `threaded_messages`, `message_thread` on the root, then drop both results.
/// **Expected:** One root holding every message; flattened depth reaches 19,999; no stack overflow.
#[tokio::test]
async fn test_deep_reply_chain() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Guest).await;
    let conversation = service
        .create_conversation(&as_user(&alice), &[alice.id, bob.id])
        .await
        .unwrap();

    let root = service
        .store()
        .create_message(alice.id, &message(conversation.id, None, "root"))
        .await
        .unwrap();
    let mut parent_id = root.id;
    for i in 1..20_000 {
        let next = service
            .store()
            .create_message(alice.id, &reply(conversation.id, parent_id, &format!("r{}", i)))
            .await
            .unwrap();
        parent_id = next.id;
    }

    let threads = service
        .threaded_messages(&as_user(&bob), conversation.id)
        .await
        .unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].message_count(), 20_000);
    drop(threads);

    let thread = service.message_thread(&as_user(&alice), root.id).await.unwrap();
    let entries = thread.flatten();
    assert_eq!(entries.len(), 20_000);
    assert_eq!(entries.last().map(|e| e.depth), Some(19_999));
    drop(thread);
}

/// **Test: Listing uses the configured page size unless a limit is given.**
#[tokio::test]
async fn test_list_messages_default_page() {
    let service = service_with(AppConfig {
        message_page_size: 3,
        ..test_config()
    })
    .await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Guest).await;
    let conversation = service
        .create_conversation(&as_user(&alice), &[alice.id, bob.id])
        .await
        .unwrap();

    for i in 0..5 {
        service
            .send_message(
                &as_user(&alice),
                message(conversation.id, Some(&bob), &format!("message {}", i)),
            )
            .await
            .unwrap();
    }

    let page = service
        .list_messages(&as_user(&bob), MessageQuery::for_conversation(conversation.id))
        .await
        .unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page[0].content, "message 4");

    let all = service
        .list_messages(
            &as_user(&bob),
            MessageQuery::for_conversation(conversation.id).page(10, 0),
        )
        .await
        .unwrap();
    assert_eq!(all.len(), 5);

    let missing = service.list_messages(&as_user(&bob), MessageQuery::default()).await;
    assert!(matches!(missing, Err(ChatError::Validation(_))));
}

/// **Test: Notifications can only be marked read by their owner.**
#[tokio::test]
async fn test_mark_notification_read() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Guest).await;
    let conversation = service
        .create_conversation(&as_user(&alice), &[alice.id, bob.id])
        .await
        .unwrap();
    service
        .send_message(&as_user(&alice), message(conversation.id, Some(&bob), "ping"))
        .await
        .unwrap();

    let notification = service
        .notifications(&as_user(&bob), true)
        .await
        .unwrap()
        .remove(0);

    let by_alice = service
        .mark_notification_read(&as_user(&alice), notification.id)
        .await;
    assert!(matches!(by_alice, Err(ChatError::NotFound(_))));

    service
        .mark_notification_read(&as_user(&bob), notification.id)
        .await
        .unwrap();
    assert!(service.notifications(&as_user(&bob), true).await.unwrap().is_empty());
}

/// **Test: Deleting an account removes the user's messages and notifications.**
#[tokio::test]
async fn test_delete_account() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Guest).await;
    let bob = register(&service, "Bob", Role::Guest).await;
    let carol = register(&service, "Carol", Role::Guest).await;
    let conversation = service
        .create_conversation(&as_user(&alice), &[alice.id, bob.id, carol.id])
        .await
        .unwrap();

    service
        .send_message(&as_user(&alice), message(conversation.id, Some(&bob), "from alice"))
        .await
        .unwrap();
    service
        .send_message(&as_user(&bob), message(conversation.id, Some(&alice), "to alice"))
        .await
        .unwrap();
    service
        .send_message(&as_user(&bob), message(conversation.id, Some(&carol), "to carol"))
        .await
        .unwrap();

    service.delete_account(&as_user(&alice)).await.unwrap();

    let remaining = service
        .list_messages(&as_user(&bob), MessageQuery::for_conversation(conversation.id))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content, "to carol");
    assert!(service.notifications(&as_user(&bob), false).await.unwrap().is_empty());
    assert!(service.store().get_user(alice.id).await.unwrap().is_none());

    // A stale context for the deleted user finds nothing to delete.
    let again = service.delete_account(&as_user(&alice)).await;
    assert!(matches!(again, Err(ChatError::NotFound(_))));
}

/// **Test: Removing another user is limited to admins.**
#[tokio::test]
async fn test_remove_user_requires_admin() {
    let service = service().await;
    let admin = register(&service, "Root", Role::Admin).await;
    let host = register(&service, "Host", Role::Host).await;
    let guest = register(&service, "Guest", Role::Guest).await;

    assert_denied(
        service.remove_user(&as_user(&host), guest.id).await,
        "You do not have permission to perform this action.",
    );
    assert_denied(
        service.remove_user(&anonymous(), guest.id).await,
        "Authentication credentials were not provided.",
    );

    service.remove_user(&as_user(&admin), guest.id).await.unwrap();
    assert!(service.store().get_user(guest.id).await.unwrap().is_none());

    let missing = service.remove_user(&as_user(&admin), guest.id).await;
    assert!(matches!(missing, Err(ChatError::NotFound(_))));
}

/// **Test: The sixth POST from one address within a minute is rejected.**
///
/// **Setup:** Default limit (5 per 60 s).
/// **Action:** Five registrations, a sixth, a GET, then a sixth POST a minute later.
/// **Expected:** Sixth rejected with the limit message; reads pass; the later POST passes.
#[tokio::test]
async fn test_rate_limit_through_service() {
    let service = service_with(AppConfig {
        rate_limit_max_requests: 5,
        ..test_config()
    })
    .await;

    let users = ["Ann", "Ben", "Cat", "Dan", "Eve"];
    for name in users {
        register(&service, name, Role::Guest).await;
    }

    let sixth = service
        .register_user(
            &anonymous(),
            NewUser {
                first_name: "Fay".to_string(),
                last_name: "Tester".to_string(),
                email: "fay@example.com".to_string(),
                phone_number: None,
                role: Role::Guest,
            },
        )
        .await;
    assert_denied(sixth, RATE_LIMIT_REJECTION);

    let ann = service
        .store()
        .find_user_by_email("ann@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(service.list_conversations(&as_user(&ann)).await.is_ok());

    let later = RequestContext::anonymous(localhost()).at(at(12) + Duration::seconds(60));
    let fay = service
        .register_user(
            &later,
            NewUser {
                first_name: "Fay".to_string(),
                last_name: "Tester".to_string(),
                email: "fay@example.com".to_string(),
                phone_number: None,
                role: Role::Guest,
            },
        )
        .await;
    assert!(fay.is_ok());
}

/// **Test: Requests during the closed hours are rejected regardless of identity.**
#[tokio::test]
async fn test_time_window_through_service() {
    let service = service().await;
    let alice = register(&service, "Alice", Role::Admin).await;

    let late = RequestContext::authenticated(alice.clone(), localhost()).at(at(22));
    assert_denied(service.list_conversations(&late).await, TIME_WINDOW_REJECTION);
    assert_denied(
        service.list_messages(&late, MessageQuery::default()).await,
        TIME_WINDOW_REJECTION,
    );

    let early = RequestContext::anonymous(localhost()).at(at(5));
    let result = service
        .register_user(
            &early,
            NewUser {
                first_name: "Night".to_string(),
                last_name: "Owl".to_string(),
                email: "owl@example.com".to_string(),
                phone_number: None,
                role: Role::Guest,
            },
        )
        .await;
    assert_denied(result, TIME_WINDOW_REJECTION);
    assert!(service
        .store()
        .find_user_by_email("owl@example.com")
        .await
        .unwrap()
        .is_none());

    let morning = RequestContext::authenticated(alice, localhost()).at(at(6));
    assert!(service.list_conversations(&morning).await.is_ok());
}

/// **Test: A file-backed service keeps its data.**
#[tokio::test]
async fn test_file_backed_service() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("chat.db");
    let config = AppConfig {
        database_url: path.to_string_lossy().into_owned(),
        ..test_config()
    };

    let alice_id = {
        let service = service_with(config.clone()).await;
        register(&service, "Alice", Role::Guest).await.id
    };

    let service = service_with(config).await;
    assert!(service.store().get_user(alice_id).await.unwrap().is_some());
}
