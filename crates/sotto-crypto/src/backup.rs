use crate::error::CryptoError;
use crate::keystore::{IdentityKeyPair, KeyStore};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const BACKUP_VERSION: u8 = 1;
const PBKDF2_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;

#[derive(Serialize, Deserialize)]
struct BackupBlob {
    version: u8,
    salt: String,
    iv: String,
    data: String,
}

#[derive(Serialize, Deserialize)]
struct BackupPayload {
    private_jwk: String,
    public_jwk: String,
}

fn derive_backup_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// Wraps the identity key pair in a password-derived AES-GCM envelope.
/// The blob is self-describing JSON so a future version bump can change
/// the KDF without breaking old backups.
pub fn export(pair: &IdentityKeyPair, password: &str) -> Result<Vec<u8>, CryptoError> {
    let payload = BackupPayload {
        private_jwk: pair.secret_jwk(),
        public_jwk: pair.public_key_jwk(),
    };
    let plaintext = serde_json::to_vec(&payload).map_err(|_| CryptoError::BackupFormat)?;
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut iv = vec![0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let key = derive_backup_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Derive)?;
    let data = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_slice())
        .map_err(|_| CryptoError::Encryption)?;
    let blob = BackupBlob {
        version: BACKUP_VERSION,
        salt: STANDARD.encode(&salt),
        iv: STANDARD.encode(&iv),
        data: STANDARD.encode(&data),
    };
    serde_json::to_vec(&blob).map_err(|_| CryptoError::BackupFormat)
}

/// Recovers a key pair from a backup blob. A wrong password fails the
/// AEAD tag check and surfaces as [`CryptoError::BackupFormat`], never
/// as a silently corrupt key pair.
pub fn import(blob: &[u8], password: &str) -> Result<IdentityKeyPair, CryptoError> {
    let blob: BackupBlob = serde_json::from_slice(blob).map_err(|_| CryptoError::BackupFormat)?;
    if blob.version != BACKUP_VERSION {
        return Err(CryptoError::BackupFormat);
    }
    let salt = STANDARD
        .decode(&blob.salt)
        .map_err(|_| CryptoError::BackupFormat)?;
    let iv = STANDARD
        .decode(&blob.iv)
        .map_err(|_| CryptoError::BackupFormat)?;
    if iv.len() != IV_LEN {
        return Err(CryptoError::BackupFormat);
    }
    let data = STANDARD
        .decode(&blob.data)
        .map_err(|_| CryptoError::BackupFormat)?;
    let key = derive_backup_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Derive)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), data.as_slice())
        .map_err(|_| CryptoError::BackupFormat)?;
    let payload: BackupPayload =
        serde_json::from_slice(&plaintext).map_err(|_| CryptoError::BackupFormat)?;
    IdentityKeyPair::from_secret_jwk(&payload.private_jwk)
}

/// Imports a backup and persists it as the active identity, replacing
/// whatever pair the store held. Messages encrypted under a previous
/// identity become unreadable; accepted lossy behavior, see DESIGN.md.
pub fn restore(store: &KeyStore, blob: &[u8], password: &str) -> Result<IdentityKeyPair, CryptoError> {
    let pair = import(blob, password)?;
    store.persist(&pair)?;
    Ok(pair)
}
