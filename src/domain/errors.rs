use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasteError {
    #[error("validation failed: {0}")]
    Validation(String),
    /// Missing, expired and view-exhausted pastes all land here.
    #[error("paste not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PasteError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Failures raised by the store adapter and the KV backends beneath it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unavailable(String),
    #[error("store misconfigured: {0}")]
    Misconfigured(String),
    #[error("corrupt record at '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for PasteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) | StoreError::Misconfigured(message) => {
                Self::StoreUnavailable(message)
            }
            corrupt @ StoreError::Corrupt { .. } => Self::Internal(corrupt.to_string()),
        }
    }
}
