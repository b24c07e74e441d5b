//! Error types for setup operations.
//!
//! Problems found inside a document are never errors: they are reported as
//! [`Diagnostic`](crate::Diagnostic) values. The types here cover the few
//! operations that can genuinely fail, such as building a settings catalog
//! from malformed descriptor data.

use thiserror::Error;

/// Result type for fallible setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for catalog construction and descriptor loading.
#[derive(Error, Debug)]
pub enum Error {
    /// Descriptor JSON could not be decoded.
    #[error("Malformed setting descriptors: {0}")]
    Json(#[from] serde_json::Error),

    /// A descriptor declared a type outside the closed type set.
    #[error("Unknown setting type \"{0}\" for {1}")]
    UnknownType(String, String),
}

/// Raised when the keyword recognizer matches a token that the keyword enum
/// does not know about. The validator reports it and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeywordError {
    #[error("Unrecognized keyword: {0}")]
    Unrecognized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_message() {
        let err: Error = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert!(err.to_string().starts_with("Malformed setting descriptors"));
    }

    #[test]
    fn test_keyword_error_message() {
        let err = KeywordError::Unrecognized("endwhile".to_string());
        assert_eq!(err.to_string(), "Unrecognized keyword: endwhile");
    }
}
