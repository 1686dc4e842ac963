use sotto_api::types::{Message, UserId};
use sotto_crypto::{hybrid, IdentityKeyPair};

/// A stored message after the local identity key has had a go at it.
/// Unreadable entries render as a placeholder; one bad envelope never
/// aborts the rest of a conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenedMessage {
    Text(String),
    Unreadable,
}

/// Picks the envelope matching our role in the conversation and
/// decrypts it. Sent messages without a sender copy (legacy clients)
/// and any decryption or encoding failure come back `Unreadable`.
pub fn open_message(message: &Message, me: &UserId, keys: &IdentityKeyPair) -> OpenedMessage {
    let envelope = if &message.recipient_id == me {
        &message.encrypted_for_recipient
    } else if &message.sender_id == me {
        match message.encrypted_for_sender.as_ref() {
            Some(envelope) => envelope,
            None => return OpenedMessage::Unreadable,
        }
    } else {
        return OpenedMessage::Unreadable;
    };
    match hybrid::decrypt(envelope, keys) {
        Ok(plaintext) => match String::from_utf8(plaintext) {
            Ok(text) => OpenedMessage::Text(text),
            Err(_) => OpenedMessage::Unreadable,
        },
        Err(err) => {
            log::debug!("message {} unreadable: {}", message.id, err);
            OpenedMessage::Unreadable
        }
    }
}
