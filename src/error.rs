/// Error types shared by the controller, storage adapter and import code
use crate::storage::Scope;
use thiserror::Error;

/// I/O failure reported by a storage area
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{scope} storage failed for '{key}': {message}")]
pub struct StorageError {
    pub scope: Scope,
    pub key: String,
    pub message: String,
}

impl StorageError {
    pub fn new(scope: Scope, key: &str, message: impl Into<String>) -> Self {
        StorageError {
            scope,
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Rejection of an imported document or a new entry. Nothing is stored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
    #[error("expected a list of history entries")]
    NotASequence,
    #[error("entry {index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("expected an object with a `settings` field")]
    MissingSettings,
    #[error("entry text is empty")]
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid document: {0}")]
    Validation(#[from] ValidationError),
    #[error("no history entry with id {0}")]
    NotFound(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ControllerError {
    fn from(err: serde_json::Error) -> Self {
        ControllerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = StorageError::new(Scope::Sync, "settings", "QUOTA_BYTES_PER_ITEM exceeded");
        assert_eq!(
            err.to_string(),
            "sync storage failed for 'settings': QUOTA_BYTES_PER_ITEM exceeded"
        );

        let err = ControllerError::from(ValidationError::MissingField { index: 2, field: "timestamp" });
        assert_eq!(err.to_string(), "invalid document: entry 2 is missing `timestamp`");

        let err = ControllerError::from(StorageError::new(Scope::Local, "qrHistory", "boom"));
        assert_eq!(err.to_string(), "local storage failed for 'qrHistory': boom");
    }
}
