//! Error types for metadata pruning
//!
//! Every failure aborts the run; nothing here is retried or recovered locally.

use thiserror::Error;

/// Error types for pruning operations
#[derive(Debug, Error)]
pub enum PruneError {
    /// Invalid combination of task options, raised before any file is touched
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Selector expression could not be compiled or evaluated
    #[error("Query error: {0}")]
    Query(String),

    /// Input is not a well-formed document
    #[error("Parse error: {0}")]
    Parse(String),

    /// File could not be read or rewritten
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Canonical output could not be produced
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Category of a [`PruneError`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Query,
    Parse,
    Io,
    Serialization,
}

impl PruneError {
    /// Get the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PruneError::Configuration(_) => ErrorKind::Configuration,
            PruneError::Query(_) => ErrorKind::Query,
            PruneError::Parse(_) => ErrorKind::Parse,
            PruneError::Io(_) => ErrorKind::Io,
            PruneError::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

/// Result type alias for pruning operations
pub type PruneResult<T> = Result<T, PruneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PruneError::Query("unexpected token".to_string());
        assert!(err.to_string().contains("Query error: unexpected token"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PruneError = io_err.into();
        assert!(matches!(err, PruneError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            PruneError::Configuration("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(PruneError::Parse("x".into()).kind(), ErrorKind::Parse);
    }
}
