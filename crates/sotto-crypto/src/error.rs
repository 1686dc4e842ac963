use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key")]
    InvalidKey,
    #[error("invalid envelope")]
    InvalidEnvelope,
    #[error("derive")]
    Derive,
    #[error("encryption")]
    Encryption,
    #[error("decryption")]
    Decryption,
    #[error("backup format")]
    BackupFormat,
    #[error("storage")]
    Storage,
}
