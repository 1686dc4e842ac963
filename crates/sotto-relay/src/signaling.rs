use crate::connections::ConnectionRegistry;
use crate::error::RelayError;
use crate::storage::FriendshipStore;
use serde_json::Value;
use sotto_api::types::{ServerEvent, UserId};
use std::sync::Arc;

/// Verbatim relay for WebRTC signaling frames. The server keeps no call
/// state and asserts nothing about the SDP or candidate payloads; the
/// state machines live on the two peers.
#[derive(Clone)]
pub struct CallRelay {
    registry: ConnectionRegistry,
    friends: Arc<dyn FriendshipStore>,
}

impl CallRelay {
    pub fn new(registry: ConnectionRegistry, friends: Arc<dyn FriendshipStore>) -> Self {
        Self { registry, friends }
    }

    async fn relay(&self, from: &UserId, to: &UserId, event: ServerEvent) -> Result<(), RelayError> {
        if !self.friends.is_accepted(from, to).await? {
            return Err(RelayError::Unauthorized);
        }
        self.registry.push(to, &event).await;
        Ok(())
    }

    pub async fn offer(
        &self,
        from: &UserId,
        to: &UserId,
        offer: Value,
        is_video: bool,
    ) -> Result<(), RelayError> {
        self.relay(
            from,
            to,
            ServerEvent::CallOffer {
                from: from.clone(),
                offer,
                is_video,
            },
        )
        .await
    }

    pub async fn answer(&self, from: &UserId, to: &UserId, answer: Value) -> Result<(), RelayError> {
        self.relay(
            from,
            to,
            ServerEvent::CallAnswer {
                from: from.clone(),
                answer,
            },
        )
        .await
    }

    pub async fn candidate(
        &self,
        from: &UserId,
        to: &UserId,
        candidate: Value,
    ) -> Result<(), RelayError> {
        self.relay(
            from,
            to,
            ServerEvent::IceCandidate {
                from: from.clone(),
                candidate,
            },
        )
        .await
    }

    pub async fn end(&self, from: &UserId, to: &UserId) -> Result<(), RelayError> {
        self.relay(from, to, ServerEvent::CallEnded { from: from.clone() })
            .await
    }
}
