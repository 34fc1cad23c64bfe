use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("ACCESS_DENIED: {0}")]
    AccessDenied(String),
    #[error("STORAGE_FAILURE: {0}")]
    Storage(String),
    #[error("MALFORMED_INPUT: {0}")]
    Malformed(String),
    #[error("UNAVAILABLE: {0}")]
    Unavailable(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Message without the `CODE:` prefix, suitable for client-facing bodies.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::AccessDenied(message)
            | Self::Storage(message)
            | Self::Malformed(message)
            | Self::Unavailable(message)
            | Self::Config(message)
            | Self::Internal(message) => message,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub(crate) fn poisoned(what: &str) -> AppError {
    AppError::Internal(format!("{what} lock poisoned"))
}
