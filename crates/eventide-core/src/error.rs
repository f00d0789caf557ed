//! Error types for eventide-core

use thiserror::Error;

/// Core error type
///
/// These are the *fatal* data-integrity errors surfaced while building
/// reactions or object tables. Runtime failures during command execution are
/// advisory instead: see [`EngineError`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed command stream: {0}")]
    MalformedStream(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("inheritance cycle involving model {0}")]
    InheritanceCycle(i64),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Advisory engine errors
///
/// Reported through [`crate::Platform::report_error`] (and `tracing`), never
/// returned: the failing resolution yields a null value or a no-op and the
/// game keeps running in a degraded state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("missing {table} entry: {id}")]
    MissingEntityReference { table: &'static str, id: i64 },

    #[error("no active game session for {what} access")]
    InvalidSessionAccess { what: &'static str },

    #[error("asset format mismatch: {0}")]
    AssetFormatMismatch(String),

    #[error("unknown label: {0}")]
    UnknownLabel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::MissingEntityReference {
            table: "item",
            id: 5,
        };
        assert_eq!(format!("{}", err), "missing item entry: 5");
    }
}
