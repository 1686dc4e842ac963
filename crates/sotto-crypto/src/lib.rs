pub mod backup;
pub mod error;
pub mod hybrid;
pub mod keystore;

pub use error::CryptoError;
pub use keystore::{IdentityKeyPair, KeyStore};
