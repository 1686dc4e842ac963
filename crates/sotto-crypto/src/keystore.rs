use crate::error::CryptoError;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const IDENTITY_FILE: &str = "identity.json";

/// Long-term P-256 identity key pair. The secret half never leaves the
/// device; only [`IdentityKeyPair::public_key_jwk`] is ever registered
/// or sent anywhere.
#[derive(Debug)]
pub struct IdentityKeyPair {
    secret: SecretKey,
}

impl IdentityKeyPair {
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    pub fn from_secret_jwk(jwk: &str) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_jwk_str(jwk).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { secret })
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn secret_jwk(&self) -> String {
        self.secret.to_jwk_string().to_string()
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    pub fn public_key_jwk(&self) -> String {
        self.secret.public_key().to_jwk_string()
    }
}

impl Clone for IdentityKeyPair {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret.clone(),
        }
    }
}

impl PartialEq for IdentityKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.secret == other.secret
    }
}

#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    private_jwk: String,
    public_jwk: String,
}

/// File-backed store with a single fixed identity slot per installation.
/// Re-login on the same device reuses the stored pair; a new device
/// generates a fresh one.
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CryptoError> {
        fs::create_dir_all(dir.as_ref()).map_err(|_| CryptoError::Storage)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    fn slot(&self) -> PathBuf {
        self.dir.join(IDENTITY_FILE)
    }

    pub fn persist(&self, pair: &IdentityKeyPair) -> Result<(), CryptoError> {
        let stored = StoredIdentity {
            private_jwk: pair.secret_jwk(),
            public_jwk: pair.public_key_jwk(),
        };
        let bytes = serde_json::to_vec(&stored).map_err(|_| CryptoError::Storage)?;
        fs::write(self.slot(), bytes).map_err(|_| CryptoError::Storage)
    }

    pub fn load(&self) -> Result<Option<IdentityKeyPair>, CryptoError> {
        let path = self.slot();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|_| CryptoError::Storage)?;
        let stored: StoredIdentity =
            serde_json::from_slice(&bytes).map_err(|_| CryptoError::Storage)?;
        IdentityKeyPair::from_secret_jwk(&stored.private_jwk).map(Some)
    }

    pub fn load_or_generate(&self) -> Result<IdentityKeyPair, CryptoError> {
        if let Some(pair) = self.load()? {
            return Ok(pair);
        }
        let pair = IdentityKeyPair::generate();
        self.persist(&pair)?;
        Ok(pair)
    }
}
