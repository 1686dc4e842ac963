use crate::types::{EncryptedEnvelope, UserId, IV_LEN, TAG_LEN};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty field {0}")]
    Empty(&'static str),
    #[error("invalid size {0}")]
    InvalidSize(&'static str),
}

/// Shape check for an envelope before it is persisted or handed to any
/// cryptographic routine. Rejects the malformed input the wire could
/// otherwise smuggle past a duck-typed check.
pub fn validate_envelope(envelope: &EncryptedEnvelope) -> Result<(), ValidationError> {
    if envelope.ephemeral_public_key.trim().is_empty() {
        return Err(ValidationError::Empty("ephemeralPublicKey"));
    }
    if envelope.iv.len() != IV_LEN {
        return Err(ValidationError::InvalidSize("iv"));
    }
    if envelope.ciphertext.len() < TAG_LEN {
        return Err(ValidationError::InvalidSize("ciphertext"));
    }
    Ok(())
}

pub fn validate_user(user: &UserId) -> Result<(), ValidationError> {
    if user.value.trim().is_empty() {
        return Err(ValidationError::Empty("userId"));
    }
    Ok(())
}

pub fn validate_emoji(emoji: &str) -> Result<(), ValidationError> {
    if emoji.trim().is_empty() {
        return Err(ValidationError::Empty("emoji"));
    }
    if emoji.len() > 32 {
        return Err(ValidationError::InvalidSize("emoji"));
    }
    Ok(())
}
