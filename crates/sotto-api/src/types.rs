use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Number of bytes in an AES-GCM nonce.
pub const IV_LEN: usize = 12;
/// Number of bytes of authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserId {
    pub value: String,
}

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// One hybrid-encrypted payload addressed to exactly one public key.
///
/// The ephemeral public key travels as a P-256 JWK string so the recipient
/// can rederive the shared secret; the tag is the trailing [`TAG_LEN`]
/// bytes of `ciphertext`. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    pub ephemeral_public_key: String,
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    pub user_id: UserId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub encrypted_for_recipient: EncryptedEnvelope,
    pub encrypted_for_sender: Option<EncryptedEnvelope>,
    pub delivered: bool,
    pub read: bool,
    pub reactions: Vec<Reaction>,
    pub reply_to: Option<Uuid>,
    pub file: Option<FileInfo>,
    pub created_at_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Client to server frames, one JSON object per event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    SendMessage {
        recipient_id: UserId,
        encrypted_for_recipient: EncryptedEnvelope,
        encrypted_for_sender: Option<EncryptedEnvelope>,
        reply_to: Option<Uuid>,
        file: Option<FileInfo>,
    },
    #[serde(rename_all = "camelCase")]
    Typing {
        recipient_id: UserId,
        is_typing: bool,
    },
    #[serde(rename_all = "camelCase")]
    AddReaction {
        message_id: Uuid,
        emoji: String,
        recipient_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    MarkRead {
        message_ids: Vec<Uuid>,
        sender_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    FetchHistory { peer_id: UserId },
    /// Public key lookup for a peer, needed before the first encrypt.
    #[serde(rename_all = "camelCase")]
    FetchKey { user_id: UserId },
    #[serde(rename_all = "camelCase")]
    CallOffer {
        recipient_id: UserId,
        offer: Value,
        is_video: bool,
    },
    #[serde(rename_all = "camelCase")]
    CallAnswer { recipient_id: UserId, answer: Value },
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        recipient_id: UserId,
        candidate: Value,
    },
    #[serde(rename_all = "camelCase")]
    CallEnd { recipient_id: UserId },
}

/// Server to client frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    NewMessage { message: Message },
    /// Acknowledgement for a `send_message`; exactly one of `message_ack`
    /// or `error` answers each request.
    #[serde(rename_all = "camelCase")]
    MessageAck { message: Message },
    #[serde(rename_all = "camelCase")]
    FriendStatus {
        user_id: UserId,
        status: PresenceStatus,
        last_seen_ms: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    UserTyping { user_id: UserId, is_typing: bool },
    #[serde(rename_all = "camelCase")]
    ReactionUpdated {
        message_id: Uuid,
        reactions: Vec<Reaction>,
    },
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        message_ids: Vec<Uuid>,
        read_by: UserId,
    },
    #[serde(rename_all = "camelCase")]
    History {
        peer_id: UserId,
        messages: Vec<Message>,
    },
    #[serde(rename_all = "camelCase")]
    PublicKey {
        user_id: UserId,
        public_key_jwk: String,
    },
    #[serde(rename_all = "camelCase")]
    CallOffer {
        from: UserId,
        offer: Value,
        is_video: bool,
    },
    #[serde(rename_all = "camelCase")]
    CallAnswer { from: UserId, answer: Value },
    #[serde(rename_all = "camelCase")]
    IceCandidate { from: UserId, candidate: Value },
    #[serde(rename_all = "camelCase")]
    CallEnded { from: UserId },
    #[serde(rename_all = "camelCase")]
    Error { code: String, message: String },
}
