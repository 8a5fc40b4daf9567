//! Error types for termscreen.

use thiserror::Error;

/// Main error type for termscreen operations.
///
/// Malformed terminal input never surfaces here - it is clamped or ignored
/// at the point of entry. Errors are reserved for conditions the host has to
/// act on, chiefly a torn-down engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The emulation engine is not initialized or has been torn down
    #[error("terminal engine unavailable")]
    EngineUnavailable,

    /// Invalid terminal dimensions
    #[error("invalid dimensions: {rows}x{cols}")]
    InvalidDimensions {
        /// Number of rows
        rows: u16,
        /// Number of columns
        cols: u16,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_unavailable_display() {
        assert_eq!(
            Error::EngineUnavailable.to_string(),
            "terminal engine unavailable"
        );
    }

    #[test]
    fn test_invalid_dimensions_display() {
        let err = Error::InvalidDimensions { rows: 0, cols: 80 };
        assert_eq!(err.to_string(), "invalid dimensions: 0x80");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
