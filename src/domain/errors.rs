use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not allowed: {0}")]
    NotAllowed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl DomainError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        DomainError::BadRequest(msg.into())
    }

    pub fn not_allowed(msg: impl Into<String>) -> Self {
        DomainError::NotAllowed(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        DomainError::ServerError(msg.into())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::ServerError(format!("serialization failed: {e}"))
    }
}
