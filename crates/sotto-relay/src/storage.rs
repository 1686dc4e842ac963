use crate::error::RelayError;
use async_trait::async_trait;
use sotto_api::types::{Message, Reaction, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Clone, Debug)]
pub struct Friendship {
    pub requester: UserId,
    pub recipient: UserId,
    pub status: FriendshipStatus,
}

impl Friendship {
    fn involves(&self, a: &UserId, b: &UserId) -> bool {
        (&self.requester == a && &self.recipient == b)
            || (&self.requester == b && &self.recipient == a)
    }
}

/// The friend-request system itself is an external collaborator; the
/// relay only ever asks these two questions about it.
#[async_trait]
pub trait FriendshipStore: Send + Sync {
    async fn is_accepted(&self, a: &UserId, b: &UserId) -> Result<bool, RelayError>;
    async fn accepted_friends(&self, user: &UserId) -> Result<Vec<UserId>, RelayError>;
}

/// Every mutation is a targeted single-field transition, never a full
/// document overwrite, so concurrent `delivered`/`read`/reaction
/// updates to the same message compose instead of clobbering each
/// other. Envelopes are written once at `insert` and immutable after.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: Message) -> Result<(), RelayError>;
    async fn get(&self, id: Uuid) -> Result<Option<Message>, RelayError>;
    /// Sets `delivered = true`, touching nothing else.
    async fn mark_delivered(&self, id: Uuid) -> Result<(), RelayError>;
    /// Toggles the (user, emoji) pair in one step and returns the
    /// updated set.
    async fn toggle_reaction(
        &self,
        id: Uuid,
        user: &UserId,
        emoji: &str,
    ) -> Result<Vec<Reaction>, RelayError>;
    /// Sets `read = true` on every listed message whose recipient is
    /// `reader`; returns the messages that actually flipped.
    async fn mark_read(&self, ids: &[Uuid], reader: &UserId) -> Result<Vec<Message>, RelayError>;
    async fn history_between(&self, a: &UserId, b: &UserId) -> Result<Vec<Message>, RelayError>;
}

/// Public-key lookup against the user directory (external collaborator).
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    async fn public_key_jwk(&self, user: &UserId) -> Result<Option<String>, RelayError>;
}

#[derive(Clone, Default)]
pub struct InMemoryFriendshipStore {
    entries: Arc<Mutex<Vec<Friendship>>>,
}

impl InMemoryFriendshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, friendship: Friendship) {
        let mut guard = self.entries.lock().await;
        guard.retain(|f| !f.involves(&friendship.requester, &friendship.recipient));
        guard.push(friendship);
    }

    pub async fn accept(&self, a: &UserId, b: &UserId) {
        self.upsert(Friendship {
            requester: a.clone(),
            recipient: b.clone(),
            status: FriendshipStatus::Accepted,
        })
        .await;
    }
}

#[async_trait]
impl FriendshipStore for InMemoryFriendshipStore {
    async fn is_accepted(&self, a: &UserId, b: &UserId) -> Result<bool, RelayError> {
        let guard = self.entries.lock().await;
        Ok(guard
            .iter()
            .any(|f| f.involves(a, b) && f.status == FriendshipStatus::Accepted))
    }

    async fn accepted_friends(&self, user: &UserId) -> Result<Vec<UserId>, RelayError> {
        let guard = self.entries.lock().await;
        Ok(guard
            .iter()
            .filter(|f| f.status == FriendshipStatus::Accepted)
            .filter_map(|f| {
                if &f.requester == user {
                    Some(f.recipient.clone())
                } else if &f.recipient == user {
                    Some(f.requester.clone())
                } else {
                    None
                }
            })
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    entries: Arc<Mutex<Vec<Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: Message) -> Result<(), RelayError> {
        let mut guard = self.entries.lock().await;
        guard.push(message);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Message>, RelayError> {
        let guard = self.entries.lock().await;
        Ok(guard.iter().find(|m| m.id == id).cloned())
    }

    async fn mark_delivered(&self, id: Uuid) -> Result<(), RelayError> {
        let mut guard = self.entries.lock().await;
        let stored = guard
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RelayError::NotFound)?;
        stored.delivered = true;
        Ok(())
    }

    async fn toggle_reaction(
        &self,
        id: Uuid,
        user: &UserId,
        emoji: &str,
    ) -> Result<Vec<Reaction>, RelayError> {
        let mut guard = self.entries.lock().await;
        let stored = guard
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RelayError::NotFound)?;
        let before = stored.reactions.len();
        stored
            .reactions
            .retain(|r| !(r.user_id == *user && r.emoji == emoji));
        if stored.reactions.len() == before {
            stored.reactions.push(Reaction {
                emoji: emoji.to_string(),
                user_id: user.clone(),
            });
        }
        Ok(stored.reactions.clone())
    }

    async fn mark_read(&self, ids: &[Uuid], reader: &UserId) -> Result<Vec<Message>, RelayError> {
        let mut guard = self.entries.lock().await;
        let mut flipped = Vec::new();
        for message in guard.iter_mut() {
            if ids.contains(&message.id) && &message.recipient_id == reader && !message.read {
                message.read = true;
                flipped.push(message.clone());
            }
        }
        Ok(flipped)
    }

    async fn history_between(&self, a: &UserId, b: &UserId) -> Result<Vec<Message>, RelayError> {
        let guard = self.entries.lock().await;
        let mut out: Vec<Message> = guard
            .iter()
            .filter(|m| {
                (&m.sender_id == a && &m.recipient_id == b)
                    || (&m.sender_id == b && &m.recipient_id == a)
            })
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at_ms);
        Ok(out)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryKeyDirectory {
    keys: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user: &UserId, jwk: impl Into<String>) {
        let mut guard = self.keys.lock().await;
        guard.insert(user.value.clone(), jwk.into());
    }
}

#[async_trait]
impl KeyDirectory for InMemoryKeyDirectory {
    async fn public_key_jwk(&self, user: &UserId) -> Result<Option<String>, RelayError> {
        let guard = self.keys.lock().await;
        Ok(guard.get(&user.value).cloned())
    }
}
