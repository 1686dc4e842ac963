use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    pub listen_addr: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Bearer tokens issued by the account service; the daemon only
    /// checks membership.
    #[serde(default)]
    pub auth: Vec<AuthEntry>,
    /// Accepted friendships seeded at startup, stand-in for the
    /// friend-request service.
    #[serde(default)]
    pub friendships: Vec<FriendshipEntry>,
    /// Registered public keys, stand-in for the registration service.
    #[serde(default)]
    pub keys: Vec<KeyEntry>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthEntry {
    pub token: String,
    pub user_id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendshipEntry {
    pub a: String,
    pub b: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyEntry {
    pub user_id: String,
    pub public_key_jwk: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_queue_capacity() -> usize {
    32
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io")]
    Io,
    #[error("parse")]
    Parse,
}

pub fn load_config(path: &Path) -> Result<DaemonConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::Io)?;
    toml::from_str(&content).map_err(|_| ConfigError::Parse)
}
