use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("media")]
    Media,
    #[error("signaling")]
    Signaling,
    #[error("busy")]
    Busy,
    #[error("signaling state")]
    SignalingState,
}
