pub mod message_tests;

use crate::connections::ConnectionId;
use crate::storage::{InMemoryFriendshipStore, InMemoryKeyDirectory, InMemoryMessageStore};
use crate::RelayNode;
use sotto_api::types::{EncryptedEnvelope, ServerEvent, UserId, IV_LEN, TAG_LEN};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct TestNode {
    pub node: RelayNode,
    pub friends: Arc<InMemoryFriendshipStore>,
    pub store: Arc<InMemoryMessageStore>,
    pub keys: Arc<InMemoryKeyDirectory>,
}

pub fn test_node() -> TestNode {
    let friends = Arc::new(InMemoryFriendshipStore::new());
    let store = Arc::new(InMemoryMessageStore::new());
    let keys = Arc::new(InMemoryKeyDirectory::new());
    let node = RelayNode::new(friends.clone(), store.clone(), keys.clone());
    TestNode {
        node,
        friends,
        store,
        keys,
    }
}

pub fn user(value: &str) -> UserId {
    UserId::new(value)
}

/// Shape-valid opaque envelope; the relay never looks inside it.
pub fn envelope(seed: u8) -> EncryptedEnvelope {
    EncryptedEnvelope {
        ephemeral_public_key: format!("{{\"kty\":\"EC\",\"crv\":\"P-256\",\"seed\":{seed}}}"),
        iv: vec![seed; IV_LEN],
        ciphertext: vec![seed; TAG_LEN + 8],
    }
}

pub async fn connect(
    node: &RelayNode,
    user: &UserId,
) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
    let (tx, rx) = mpsc::channel(16);
    let id = node.connect(user, tx).await.expect("connect");
    (id, rx)
}

pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
