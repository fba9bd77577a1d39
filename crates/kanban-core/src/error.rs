use thiserror::Error;

#[derive(Error, Debug)]
pub enum KanbanError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KanbanError {
    /// HTTP-style status code carried in the external error envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::BadRequest(_) | Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Io(_) | Self::Serialization(_) | Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Caller-fault errors are never retried and are safe to show to clients.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn forbidden(what: impl std::fmt::Display) -> Self {
        Self::Forbidden(what.to_string())
    }

    pub fn bad_request(what: impl std::fmt::Display) -> Self {
        Self::BadRequest(what.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(KanbanError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(KanbanError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(KanbanError::NotFound("x".into()).status_code(), 404);
        assert_eq!(KanbanError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(KanbanError::Validation("x".into()).status_code(), 400);
        assert_eq!(KanbanError::Conflict("x".into()).status_code(), 409);
        assert_eq!(KanbanError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_client_errors() {
        assert!(KanbanError::not_found("Board 1").is_client_error());
        assert!(!KanbanError::Serialization("bad".into()).is_client_error());
    }
}
