use crate::connections::{ConnectionId, ConnectionRegistry};
use crate::error::RelayError;
use crate::storage::FriendshipStore;
use sotto_api::types::{PresenceStatus, ServerEvent, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Tracks live connections and fans online/offline transitions out to
/// accepted friends. Only the first connection and the last disconnect
/// of a user produce a broadcast; extra devices attach silently.
#[derive(Clone)]
pub struct PresenceRelay {
    registry: ConnectionRegistry,
    friends: Arc<dyn FriendshipStore>,
}

impl PresenceRelay {
    pub fn new(registry: ConnectionRegistry, friends: Arc<dyn FriendshipStore>) -> Self {
        Self { registry, friends }
    }

    pub async fn connect(
        &self,
        user: &UserId,
        tx: mpsc::Sender<ServerEvent>,
    ) -> Result<ConnectionId, RelayError> {
        let (id, first) = self.registry.register(user, tx).await;
        if first {
            log::info!("user {} online", user);
            self.broadcast(user, PresenceStatus::Online, None).await?;
        }
        Ok(id)
    }

    pub async fn disconnect(&self, user: &UserId, id: ConnectionId) -> Result<(), RelayError> {
        let offline = self.registry.deregister(user, id).await;
        if offline {
            log::info!("user {} offline", user);
            let last_seen = self.registry.last_seen_ms(user).await;
            self.broadcast(user, PresenceStatus::Offline, last_seen)
                .await?;
        }
        Ok(())
    }

    /// Best-effort, unordered: a message pushed right after connecting
    /// may reach a friend before this status does.
    async fn broadcast(
        &self,
        user: &UserId,
        status: PresenceStatus,
        last_seen_ms: Option<u64>,
    ) -> Result<(), RelayError> {
        let event = ServerEvent::FriendStatus {
            user_id: user.clone(),
            status,
            last_seen_ms,
        };
        for friend in self.friends.accepted_friends(user).await? {
            self.registry.push(&friend, &event).await;
        }
        Ok(())
    }
}
