pub mod connections;
pub mod error;
pub mod messages;
pub mod presence;
pub mod signaling;
pub mod storage;
pub mod time;

use connections::{ConnectionId, ConnectionRegistry};
use error::RelayError;
use messages::MessageRelay;
use presence::PresenceRelay;
use signaling::CallRelay;
use sotto_api::types::{ClientEvent, ServerEvent, UserId};
use std::sync::Arc;
use storage::{FriendshipStore, KeyDirectory, MessageStore};
use tokio::sync::mpsc;

#[cfg(test)]
mod tests;

/// One relay node: a shared connection registry plus the three relays
/// riding on it. Stores are injected; the node owns no persistence of
/// its own.
#[derive(Clone)]
pub struct RelayNode {
    pub presence: PresenceRelay,
    pub messages: MessageRelay,
    pub calls: CallRelay,
    keys: Arc<dyn KeyDirectory>,
}

impl RelayNode {
    pub fn new(
        friends: Arc<dyn FriendshipStore>,
        store: Arc<dyn MessageStore>,
        keys: Arc<dyn KeyDirectory>,
    ) -> Self {
        let registry = ConnectionRegistry::new();
        Self {
            presence: PresenceRelay::new(registry.clone(), friends.clone()),
            messages: MessageRelay::new(registry.clone(), friends.clone(), store),
            calls: CallRelay::new(registry, friends),
            keys,
        }
    }

    pub async fn connect(
        &self,
        user: &UserId,
        tx: mpsc::Sender<ServerEvent>,
    ) -> Result<ConnectionId, RelayError> {
        self.presence.connect(user, tx).await
    }

    pub async fn disconnect(&self, user: &UserId, id: ConnectionId) -> Result<(), RelayError> {
        self.presence.disconnect(user, id).await
    }

    /// Dispatches one authenticated client event. Returns the ack frame
    /// for the originating connection, if the event has one; errors are
    /// answered as `error` frames by the caller and never terminate the
    /// connection.
    pub async fn handle_event(
        &self,
        user: &UserId,
        origin: ConnectionId,
        event: ClientEvent,
    ) -> Result<Option<ServerEvent>, RelayError> {
        match event {
            ClientEvent::SendMessage {
                recipient_id,
                encrypted_for_recipient,
                encrypted_for_sender,
                reply_to,
                file,
            } => {
                let message = self
                    .messages
                    .send(
                        user,
                        &recipient_id,
                        encrypted_for_recipient,
                        encrypted_for_sender,
                        reply_to,
                        file,
                    )
                    .await?;
                Ok(Some(ServerEvent::MessageAck { message }))
            }
            ClientEvent::Typing {
                recipient_id,
                is_typing,
            } => {
                self.messages.typing(user, &recipient_id, is_typing).await?;
                Ok(None)
            }
            ClientEvent::AddReaction {
                message_id, emoji, ..
            } => {
                let reactions = self
                    .messages
                    .toggle_reaction(user, message_id, &emoji, Some(origin))
                    .await?;
                Ok(Some(ServerEvent::ReactionUpdated {
                    message_id,
                    reactions,
                }))
            }
            ClientEvent::MarkRead { message_ids, .. } => {
                self.messages.mark_read(user, &message_ids).await?;
                Ok(None)
            }
            ClientEvent::FetchHistory { peer_id } => {
                let messages = self.messages.history(user, &peer_id).await?;
                Ok(Some(ServerEvent::History {
                    peer_id,
                    messages,
                }))
            }
            ClientEvent::FetchKey { user_id } => {
                let public_key_jwk = self
                    .keys
                    .public_key_jwk(&user_id)
                    .await?
                    .ok_or(RelayError::NotFound)?;
                Ok(Some(ServerEvent::PublicKey {
                    user_id,
                    public_key_jwk,
                }))
            }
            ClientEvent::CallOffer {
                recipient_id,
                offer,
                is_video,
            } => {
                self.calls.offer(user, &recipient_id, offer, is_video).await?;
                Ok(None)
            }
            ClientEvent::CallAnswer {
                recipient_id,
                answer,
            } => {
                self.calls.answer(user, &recipient_id, answer).await?;
                Ok(None)
            }
            ClientEvent::IceCandidate {
                recipient_id,
                candidate,
            } => {
                self.calls.candidate(user, &recipient_id, candidate).await?;
                Ok(None)
            }
            ClientEvent::CallEnd { recipient_id } => {
                self.calls.end(user, &recipient_id).await?;
                Ok(None)
            }
        }
    }
}
