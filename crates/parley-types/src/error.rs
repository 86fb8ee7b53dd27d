use thiserror::Error;

/// Errors from repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors surfaced by the message relay.
///
/// `Validation` is rejected before any store call and reported to the
/// immediate caller only; `Store` aborts the broadcast for the failed
/// operation. Neither is fatal to the process.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
}

impl RelayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RelayError::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_relay_error_display() {
        let err = RelayError::validation("content must not be empty");
        assert_eq!(
            err.to_string(),
            "validation error: content must not be empty"
        );
    }

    #[test]
    fn test_store_error_wraps_repository_error() {
        let err: RelayError = RepositoryError::NotFound.into();
        assert!(matches!(err, RelayError::Store(RepositoryError::NotFound)));
    }
}
