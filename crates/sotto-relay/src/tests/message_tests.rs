use super::{connect, envelope, test_node, user};
use crate::error::RelayError;
use crate::storage::{
    InMemoryFriendshipStore, InMemoryKeyDirectory, InMemoryMessageStore, MessageStore,
};
use crate::RelayNode;
use async_trait::async_trait;
use sotto_api::types::{ClientEvent, Message, Reaction, ServerEvent, UserId};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn online_recipient_with_two_devices_gets_both_copies_and_read_receipt_flows_back() {
    let env = test_node();
    let alice = user("alice");
    let bob = user("bob");
    env.friends.accept(&alice, &bob).await;

    let (_, mut bob_phone) = connect(&env.node, &bob).await;
    let (bob_laptop_id, mut bob_laptop) = connect(&env.node, &bob).await;
    let (alice_id, mut alice_rx) = connect(&env.node, &alice).await;
    // Presence noise from alice connecting.
    let _ = bob_phone.recv().await;
    let _ = bob_laptop.recv().await;

    let ack = env
        .node
        .handle_event(
            &alice,
            alice_id,
            ClientEvent::SendMessage {
                recipient_id: bob.clone(),
                encrypted_for_recipient: envelope(1),
                encrypted_for_sender: Some(envelope(2)),
                reply_to: None,
                file: None,
            },
        )
        .await
        .expect("send")
        .expect("ack");
    let message = match ack {
        ServerEvent::MessageAck { message } => message,
        other => panic!("unexpected ack {other:?}"),
    };
    assert!(message.delivered);
    assert!(!message.read);

    for rx in [&mut bob_phone, &mut bob_laptop] {
        match rx.recv().await.expect("new_message") {
            ServerEvent::NewMessage { message: pushed } => assert_eq!(pushed.id, message.id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    env.node
        .handle_event(
            &bob,
            bob_laptop_id,
            ClientEvent::MarkRead {
                message_ids: vec![message.id],
                sender_id: alice.clone(),
            },
        )
        .await
        .expect("mark read");
    match alice_rx.recv().await.expect("messages_read") {
        ServerEvent::MessagesRead {
            message_ids,
            read_by,
        } => {
            assert_eq!(message_ids, vec![message.id]);
            assert_eq!(read_by, bob);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let stored = env.store.get(message.id).await.expect("get").expect("stored");
    assert!(stored.delivered);
    assert!(stored.read);
}

#[tokio::test]
async fn offline_recipient_message_is_persisted_undelivered_and_pulled_via_history() {
    let env = test_node();
    let alice = user("alice");
    let bob = user("bob");
    env.friends.accept(&alice, &bob).await;
    let (alice_id, _alice_rx) = connect(&env.node, &alice).await;

    let ack = env
        .node
        .handle_event(
            &alice,
            alice_id,
            ClientEvent::SendMessage {
                recipient_id: bob.clone(),
                encrypted_for_recipient: envelope(3),
                encrypted_for_sender: None,
                reply_to: None,
                file: None,
            },
        )
        .await
        .expect("send")
        .expect("ack");
    let message = match ack {
        ServerEvent::MessageAck { message } => message,
        other => panic!("unexpected ack {other:?}"),
    };
    assert!(!message.delivered);

    // No push retry happens; the message surfaces through history once
    // the recipient comes back.
    let (bob_id, _bob_rx) = connect(&env.node, &bob).await;
    let history = env
        .node
        .handle_event(
            &bob,
            bob_id,
            ClientEvent::FetchHistory {
                peer_id: alice.clone(),
            },
        )
        .await
        .expect("history")
        .expect("frame");
    match history {
        ServerEvent::History { messages, .. } => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].id, message.id);
            assert!(!messages[0].delivered);
        }
        other => panic!("unexpected frame {other:?}"),
    }
}

#[tokio::test]
async fn reply_and_file_metadata_survive_the_round_trip() {
    let env = test_node();
    let alice = user("alice");
    let bob = user("bob");
    env.friends.accept(&alice, &bob).await;
    let (alice_id, _alice_rx) = connect(&env.node, &alice).await;

    let first = env
        .node
        .messages
        .send(&alice, &bob, envelope(4), None, None, None)
        .await
        .expect("first");
    let file = sotto_api::types::FileInfo {
        name: "photo.png".to_string(),
        mime_type: "image/png".to_string(),
        size: 2048,
    };
    let second = env
        .node
        .messages
        .send(
            &alice,
            &bob,
            envelope(5),
            Some(envelope(6)),
            Some(first.id),
            Some(file.clone()),
        )
        .await
        .expect("second");
    assert_eq!(second.reply_to, Some(first.id));
    assert_eq!(second.file, Some(file));
    let _ = alice_id;
}

/// Store where the recipient's read lands between the `new_message`
/// push and the delivery flip, the tightest interleaving an online
/// recipient can produce.
struct ReadBeforeDeliveryStore {
    inner: InMemoryMessageStore,
    reader: UserId,
}

#[async_trait]
impl MessageStore for ReadBeforeDeliveryStore {
    async fn insert(&self, message: Message) -> Result<(), RelayError> {
        self.inner.insert(message).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Message>, RelayError> {
        self.inner.get(id).await
    }

    async fn mark_delivered(&self, id: Uuid) -> Result<(), RelayError> {
        self.inner.mark_read(&[id], &self.reader).await?;
        self.inner.mark_delivered(id).await
    }

    async fn toggle_reaction(
        &self,
        id: Uuid,
        user: &UserId,
        emoji: &str,
    ) -> Result<Vec<Reaction>, RelayError> {
        self.inner.toggle_reaction(id, user, emoji).await
    }

    async fn mark_read(&self, ids: &[Uuid], reader: &UserId) -> Result<Vec<Message>, RelayError> {
        self.inner.mark_read(ids, reader).await
    }

    async fn history_between(&self, a: &UserId, b: &UserId) -> Result<Vec<Message>, RelayError> {
        self.inner.history_between(a, b).await
    }
}

#[tokio::test]
async fn immediate_read_survives_the_delivery_flip() {
    let alice = user("alice");
    let bob = user("bob");
    let friends = Arc::new(InMemoryFriendshipStore::new());
    friends.accept(&alice, &bob).await;
    let store = Arc::new(ReadBeforeDeliveryStore {
        inner: InMemoryMessageStore::new(),
        reader: bob.clone(),
    });
    let node = RelayNode::new(
        friends,
        store.clone(),
        Arc::new(InMemoryKeyDirectory::new()),
    );
    let (_, _bob_rx) = connect(&node, &bob).await;

    let message = node
        .messages
        .send(&alice, &bob, envelope(7), None, None, None)
        .await
        .expect("send");
    assert!(message.delivered);

    let stored = store.get(message.id).await.expect("get").expect("stored");
    assert!(stored.delivered);
    assert!(stored.read);
}

#[tokio::test]
async fn typing_is_fanned_out_without_persistence() {
    let env = test_node();
    let alice = user("alice");
    let bob = user("bob");
    env.friends.accept(&alice, &bob).await;
    let (_, mut bob_rx) = connect(&env.node, &bob).await;
    let (alice_id, _alice_rx) = connect(&env.node, &alice).await;
    let _ = bob_rx.recv().await; // presence

    let ack = env
        .node
        .handle_event(
            &alice,
            alice_id,
            ClientEvent::Typing {
                recipient_id: bob.clone(),
                is_typing: true,
            },
        )
        .await
        .expect("typing");
    assert!(ack.is_none());
    match bob_rx.recv().await.expect("user_typing") {
        ServerEvent::UserTyping { user_id, is_typing } => {
            assert_eq!(user_id, alice);
            assert!(is_typing);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
