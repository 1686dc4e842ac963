use crate::connections::{ConnectionId, ConnectionRegistry};
use crate::error::RelayError;
use crate::storage::{FriendshipStore, MessageStore};
use crate::time::now_ms;
use sotto_api::types::{
    EncryptedEnvelope, FileInfo, Message, Reaction, ServerEvent, UserId,
};
use sotto_api::validation::{validate_emoji, validate_envelope, validate_user};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Persists opaque envelopes and drives the delivered/read state
/// transitions. Never inspects ciphertext.
#[derive(Clone)]
pub struct MessageRelay {
    registry: ConnectionRegistry,
    friends: Arc<dyn FriendshipStore>,
    store: Arc<dyn MessageStore>,
}

impl MessageRelay {
    pub fn new(
        registry: ConnectionRegistry,
        friends: Arc<dyn FriendshipStore>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            registry,
            friends,
            store,
        }
    }

    /// Validates, persists and best-effort delivers one encrypted
    /// message. The returned message is the acknowledgement; `delivered`
    /// reflects whether at least one recipient connection accepted the
    /// push. Offline recipients pull it later via history, the relay
    /// never retries.
    pub async fn send(
        &self,
        sender: &UserId,
        recipient: &UserId,
        encrypted_for_recipient: EncryptedEnvelope,
        encrypted_for_sender: Option<EncryptedEnvelope>,
        reply_to: Option<Uuid>,
        file: Option<FileInfo>,
    ) -> Result<Message, RelayError> {
        validate_user(sender).map_err(|_| RelayError::InvalidPayload("sender"))?;
        validate_user(recipient).map_err(|_| RelayError::InvalidPayload("recipient"))?;
        validate_envelope(&encrypted_for_recipient)
            .map_err(|_| RelayError::InvalidPayload("encryptedForRecipient"))?;
        // The sender copy is optional for legacy clients, but when
        // present it has to be well-formed too.
        if let Some(envelope) = encrypted_for_sender.as_ref() {
            validate_envelope(envelope)
                .map_err(|_| RelayError::InvalidPayload("encryptedForSender"))?;
        }
        if !self.friends.is_accepted(sender, recipient).await? {
            return Err(RelayError::Unauthorized);
        }
        let mut message = Message {
            id: Uuid::new_v4(),
            sender_id: sender.clone(),
            recipient_id: recipient.clone(),
            encrypted_for_recipient,
            encrypted_for_sender,
            delivered: false,
            read: false,
            reactions: Vec::new(),
            reply_to,
            file,
            created_at_ms: now_ms(),
        };
        self.store.insert(message.clone()).await?;
        let pushed = self
            .registry
            .push(
                recipient,
                &ServerEvent::NewMessage {
                    message: message.clone(),
                },
            )
            .await;
        if pushed > 0 {
            // Targeted flip: the recipient may already be marking the
            // pushed copy as read, and that must not be overwritten.
            self.store.mark_delivered(message.id).await?;
            message.delivered = true;
        }
        log::debug!(
            "message {} {} -> {} delivered={}",
            message.id,
            sender,
            recipient,
            message.delivered
        );
        Ok(message)
    }

    /// Fire-and-forget typing signal. No persistence, no delivery
    /// guarantee, silently dropped for non-friends.
    pub async fn typing(
        &self,
        sender: &UserId,
        recipient: &UserId,
        is_typing: bool,
    ) -> Result<(), RelayError> {
        if !self.friends.is_accepted(sender, recipient).await? {
            return Ok(());
        }
        self.registry
            .push(
                recipient,
                &ServerEvent::UserTyping {
                    user_id: sender.clone(),
                    is_typing,
                },
            )
            .await;
        Ok(())
    }

    /// Toggles the (user, emoji) pair on a message and broadcasts the
    /// updated set to every live connection of both parties, minus the
    /// acting connection, which gets the returned set as its ack.
    pub async fn toggle_reaction(
        &self,
        user: &UserId,
        message_id: Uuid,
        emoji: &str,
        origin: Option<ConnectionId>,
    ) -> Result<Vec<Reaction>, RelayError> {
        validate_emoji(emoji).map_err(|_| RelayError::InvalidPayload("emoji"))?;
        let message = self
            .store
            .get(message_id)
            .await?
            .ok_or(RelayError::NotFound)?;
        if &message.sender_id != user && &message.recipient_id != user {
            return Err(RelayError::Unauthorized);
        }
        // The toggle itself happens inside the store, so two devices
        // toggling the same message concurrently both land.
        let reactions = self.store.toggle_reaction(message_id, user, emoji).await?;
        let event = ServerEvent::ReactionUpdated {
            message_id,
            reactions: reactions.clone(),
        };
        for party in [&message.sender_id, &message.recipient_id] {
            let skip = if party == user { origin } else { None };
            self.registry.push_except(party, skip, &event).await;
        }
        Ok(reactions)
    }

    /// Bulk read receipt: flips `read` on the reader's copies and tells
    /// each affected sender which of their messages are now read.
    pub async fn mark_read(
        &self,
        reader: &UserId,
        message_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, RelayError> {
        let flipped = self.store.mark_read(message_ids, reader).await?;
        let mut by_sender: HashMap<&UserId, Vec<Uuid>> = HashMap::new();
        for message in flipped.iter() {
            by_sender.entry(&message.sender_id).or_default().push(message.id);
        }
        for (sender, ids) in by_sender {
            self.registry
                .push(
                    sender,
                    &ServerEvent::MessagesRead {
                        message_ids: ids,
                        read_by: reader.clone(),
                    },
                )
                .await;
        }
        Ok(flipped.into_iter().map(|m| m.id).collect())
    }

    /// Reconnect-time pull of the stored conversation, oldest first.
    pub async fn history(&self, user: &UserId, peer: &UserId) -> Result<Vec<Message>, RelayError> {
        if !self.friends.is_accepted(user, peer).await? {
            return Err(RelayError::Unauthorized);
        }
        self.store.history_between(user, peer).await
    }
}
