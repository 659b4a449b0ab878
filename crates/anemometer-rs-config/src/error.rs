//! Error types for data-source loading and validation.
//!
//! Messages name fields and paths only. Field values, and passwords in
//! particular, never appear in the rendered text.

use thiserror::Error;

/// Errors returned while loading or validating a data-source definition.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested data source is not part of the definition set.
    #[error("data source not found: {name}")]
    NotFound { name: String },
    /// Reading a definition file failed.
    #[error("failed to read definitions: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// The definition text is not valid JSON5.
    ///
    /// Parser messages can quote the offending line, so only the label is kept.
    #[error("failed to parse definitions in {label}: malformed JSON5")]
    ParseFailed { label: String },
    /// Decoding a schema-checked definition into typed values failed.
    #[error("failed to decode definition: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A specific field failed validation.
    #[error("invalid definition at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// Generic validation failure.
    #[error("invalid definition: {0}")]
    Invalid(String),
}

/// Coarse classification of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested name is absent.
    NotFound,
    /// The definition is malformed or incomplete.
    Validation,
    /// The definition source could not be read.
    Io,
}

impl ConfigError {
    /// Classify the error for callers that only care about the broad cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::NotFound { .. } => ErrorKind::NotFound,
            ConfigError::ReadFailed(_) => ErrorKind::Io,
            ConfigError::ParseFailed { .. }
            | ConfigError::DecodeFailed(_)
            | ConfigError::InvalidField { .. }
            | ConfigError::Invalid(_) => ErrorKind::Validation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_error_kinds() {
        let not_found = ConfigError::NotFound {
            name: "reader".to_string(),
        };
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert!(not_found.is_not_found());

        let invalid = ConfigError::InvalidField {
            path: "config:datasources.writer.port".to_string(),
            message: "port must be positive".to_string(),
        };
        assert!(invalid.is_validation());

        let io = ConfigError::ReadFailed(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        assert_eq!(io.kind(), ErrorKind::Io);
    }

    #[test]
    fn not_found_message_names_the_source() {
        let err = ConfigError::NotFound {
            name: "reader".to_string(),
        };
        assert_eq!(err.to_string(), "data source not found: reader");
    }
}
