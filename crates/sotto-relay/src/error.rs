use sotto_api::types::ServerEvent;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("invalid payload {0}")]
    InvalidPayload(&'static str),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("storage")]
    Storage,
}

impl RelayError {
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidPayload(_) => "invalid_payload",
            RelayError::Unauthorized => "unauthorized",
            RelayError::NotFound => "not_found",
            RelayError::Storage => "storage",
        }
    }

    /// Acknowledgement frame for the caller. Relay errors are answered,
    /// never thrown across the connection.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}
