use uuid::Uuid;

use courier_domain::pagination::Pagination;
use courier_messaging::domain::repository::ConversationRepository as _;
use courier_messaging::error::MessagingError;
use courier_messaging::hub::{EVENT_MESSAGE_RECEIVED, EVENT_MESSAGE_SEEN};
use courier_messaging::usecase::message::{
    CreateMessageInput, CreateMessageUseCase, GetMessagesUseCase, MediaReference,
};

use crate::helpers::{
    MockConversationRepo, MockFileStore, MockMessageRepo, MockNotifier, test_message,
};

fn page(limit: u64, page: u64) -> Pagination {
    Pagination { limit, page }
}

struct Fixture {
    conversations: MockConversationRepo,
    messages: MockMessageRepo,
    notifier: MockNotifier,
    me: Uuid,
    peer: Uuid,
    conversation_id: Uuid,
}

fn fixture() -> Fixture {
    let conversations = MockConversationRepo::empty();
    let me = Uuid::now_v7();
    let peer = Uuid::now_v7();
    let conversation_id = conversations.seed_pair(me, peer);
    let messages = MockMessageRepo::sharing(conversations.messages.clone());
    Fixture {
        conversations,
        messages,
        notifier: MockNotifier::new(),
        me,
        peer,
        conversation_id,
    }
}

// ── GetMessages ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn reading_marks_others_messages_seen_and_notifies_them() {
    let f = fixture();
    {
        let mut messages = f.messages.messages.lock().unwrap();
        messages.push(test_message(f.conversation_id, f.peer, "hi"));
        messages.push(test_message(f.conversation_id, f.peer, "there"));
        messages.push(test_message(f.conversation_id, f.me, "mine"));
    }
    let events = f.notifier.events_handle();

    let uc = GetMessagesUseCase {
        conversations: f.conversations.clone(),
        messages: f.messages.clone(),
        notifier: f.notifier,
    };
    let result = uc.execute(f.me, f.conversation_id, page(10, 1)).await.unwrap();

    assert_eq!(result.count, 3);
    assert!(
        result
            .rows
            .iter()
            .filter(|m| m.message.user_id == f.peer)
            .all(|m| m.message.is_seen),
        "all of the peer's messages are now seen"
    );

    // Unread count drops to zero after the read.
    let unread = f
        .conversations
        .unread_counts(&[f.conversation_id], f.me)
        .await
        .unwrap();
    assert_eq!(unread.get(&f.conversation_id), None);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let (target, event, payload) = &events[0];
    assert_eq!(*target, f.peer);
    assert_eq!(event, EVENT_MESSAGE_SEEN);
    assert_eq!(payload["status"], true);
}

#[tokio::test]
async fn reading_notifies_even_when_nothing_was_unseen() {
    // Seen-state push happens unconditionally on every read of the endpoint.
    let f = fixture();
    let events = f.notifier.events_handle();

    let uc = GetMessagesUseCase {
        conversations: f.conversations,
        messages: f.messages,
        notifier: f.notifier,
    };
    uc.execute(f.me, f.conversation_id, page(10, 1)).await.unwrap();

    assert_eq!(events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_reject_reader_who_is_not_a_member() {
    let f = fixture();
    let outsider = Uuid::now_v7();

    let uc = GetMessagesUseCase {
        conversations: f.conversations,
        messages: f.messages,
        notifier: f.notifier,
    };
    let result = uc.execute(outsider, f.conversation_id, page(10, 1)).await;

    assert!(
        matches!(result, Err(MessagingError::BadRequest(ref m))
            if m == "You are not in the conversation"),
        "got {result:?}"
    );
}

#[tokio::test]
async fn should_page_messages_newest_first() {
    let f = fixture();
    {
        let mut messages = f.messages.messages.lock().unwrap();
        for i in 0..5 {
            messages.push(test_message(f.conversation_id, f.peer, &format!("m{i}")));
        }
    }

    let uc = GetMessagesUseCase {
        conversations: f.conversations,
        messages: f.messages,
        notifier: f.notifier,
    };
    let result = uc.execute(f.me, f.conversation_id, page(2, 2)).await.unwrap();

    assert_eq!(result.count, 5);
    assert_eq!(result.limit, 2);
    assert_eq!(result.page, 2);
    let contents: Vec<_> = result
        .rows
        .iter()
        .map(|m| m.message.content.clone().unwrap())
        .collect();
    // Newest first, second page: m4 m3 | m2 m1 | m0.
    assert_eq!(contents, vec!["m2", "m1"]);
}

// ── CreateMessage ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_persist_message_with_relocated_media() {
    let f = fixture();
    let files = MockFileStore::with_temporary(&["a.png", "b.png"]);
    let events = f.notifier.events_handle();

    let uc = CreateMessageUseCase {
        conversations: f.conversations,
        messages: f.messages.clone(),
        files: files.clone(),
        notifier: f.notifier,
    };
    let created = uc
        .execute(
            f.me,
            f.conversation_id,
            CreateMessageInput {
                content: Some("look".to_owned()),
                media: vec![
                    MediaReference {
                        src: "a.png".to_owned(),
                    },
                    MediaReference {
                        src: "b.png".to_owned(),
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(created.media.len(), 2, "one media row per reference");
    assert!(
        files.temporary.lock().unwrap().is_empty(),
        "files left temporary storage"
    );
    assert_eq!(
        files.moved.lock().unwrap().as_slice(),
        ["message_media/a.png", "message_media/b.png"]
    );
    assert_eq!(f.messages.messages.lock().unwrap().len(), 1);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let (target, event, payload) = &events[0];
    assert_eq!(*target, f.peer);
    assert_eq!(event, EVENT_MESSAGE_RECEIVED);
    assert_eq!(payload["data"]["content"], "look");
    assert_eq!(payload["data"]["media"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn failed_relocation_leaves_no_message_behind() {
    let f = fixture();
    // Only the first referenced file exists; the second move fails.
    let files = MockFileStore::with_temporary(&["a.png"]);
    let events = f.notifier.events_handle();

    let uc = CreateMessageUseCase {
        conversations: f.conversations,
        messages: f.messages.clone(),
        files,
        notifier: f.notifier,
    };
    let result = uc
        .execute(
            f.me,
            f.conversation_id,
            CreateMessageInput {
                content: Some("broken".to_owned()),
                media: vec![
                    MediaReference {
                        src: "a.png".to_owned(),
                    },
                    MediaReference {
                        src: "missing.png".to_owned(),
                    },
                ],
            },
        )
        .await;

    assert!(matches!(result, Err(MessagingError::BadRequest(_))));
    assert!(
        f.messages.messages.lock().unwrap().is_empty(),
        "the message row must be rolled back with the failed relocation"
    );
    assert!(events.lock().unwrap().is_empty(), "no notification either");
}

#[tokio::test]
async fn should_reject_sender_who_is_not_a_member() {
    let f = fixture();
    let outsider = Uuid::now_v7();

    let uc = CreateMessageUseCase {
        conversations: f.conversations,
        messages: f.messages.clone(),
        files: MockFileStore::empty(),
        notifier: f.notifier,
    };
    let result = uc
        .execute(
            outsider,
            f.conversation_id,
            CreateMessageInput {
                content: Some("hi".to_owned()),
                media: vec![],
            },
        )
        .await;

    assert!(
        matches!(result, Err(MessagingError::BadRequest(ref m))
            if m == "You are not in the conversation"),
        "got {result:?}"
    );
    assert!(f.messages.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn plain_text_message_needs_no_media() {
    let f = fixture();

    let uc = CreateMessageUseCase {
        conversations: f.conversations,
        messages: f.messages.clone(),
        files: MockFileStore::empty(),
        notifier: f.notifier,
    };
    let created = uc
        .execute(
            f.me,
            f.conversation_id,
            CreateMessageInput {
                content: Some("just text".to_owned()),
                media: vec![],
            },
        )
        .await
        .unwrap();

    assert!(created.media.is_empty());
    assert!(!created.message.is_seen, "new messages start unseen");
}
