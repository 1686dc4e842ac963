use crate::error::CryptoError;
use crate::keystore::IdentityKeyPair;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use p256::ecdh::{diffie_hellman, EphemeralSecret};
use p256::PublicKey;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use sotto_api::types::{EncryptedEnvelope, IV_LEN};
use sotto_api::validation::validate_envelope;

const HKDF_INFO: &[u8] = b"sotto:envelope:v1";
// Constant all-zero salt, shared by every conversation for wire
// compatibility with deployed clients. See DESIGN.md before changing.
const HKDF_SALT: [u8; 32] = [0u8; 32];

fn derive_key(shared: &[u8]) -> Result<[u8; 32], CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(&HKDF_SALT), shared);
    let mut key = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut key)
        .map_err(|_| CryptoError::Derive)?;
    Ok(key)
}

/// Encrypts one plaintext to one recipient public key (P-256 JWK).
///
/// A fresh ephemeral key pair is generated per call; its secret half is
/// consumed by the ECDH computation and dropped here, never stored.
pub fn encrypt(plaintext: &[u8], recipient_jwk: &str) -> Result<EncryptedEnvelope, CryptoError> {
    let recipient = PublicKey::from_jwk_str(recipient_jwk).map_err(|_| CryptoError::InvalidKey)?;
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_public_key = ephemeral.public_key().to_jwk_string();
    let shared = ephemeral.diffie_hellman(&recipient);
    let key = derive_key(shared.raw_secret_bytes().as_slice())?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Derive)?;
    let mut iv = vec![0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::Encryption)?;
    Ok(EncryptedEnvelope {
        ephemeral_public_key,
        iv,
        ciphertext,
    })
}

/// Decrypts an envelope with the receiver's long-term secret key.
///
/// Any tamper or key mismatch surfaces as [`CryptoError::Decryption`];
/// callers render a placeholder instead of plaintext.
pub fn decrypt(envelope: &EncryptedEnvelope, own: &IdentityKeyPair) -> Result<Vec<u8>, CryptoError> {
    validate_envelope(envelope).map_err(|_| CryptoError::InvalidEnvelope)?;
    let ephemeral = PublicKey::from_jwk_str(&envelope.ephemeral_public_key)
        .map_err(|_| CryptoError::InvalidEnvelope)?;
    let shared = diffie_hellman(own.secret().to_nonzero_scalar(), ephemeral.as_affine());
    let key = derive_key(shared.raw_secret_bytes().as_slice())?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Derive)?;
    cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decryption)
}

/// Produces the dual-envelope pair for one outgoing message: one copy the
/// recipient can open and one independent copy the sender can open later.
pub fn encrypt_for_both(
    plaintext: &[u8],
    recipient_jwk: &str,
    own_jwk: &str,
) -> Result<(EncryptedEnvelope, EncryptedEnvelope), CryptoError> {
    let for_recipient = encrypt(plaintext, recipient_jwk)?;
    let for_sender = encrypt(plaintext, own_jwk)?;
    Ok((for_recipient, for_sender))
}
