use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RatebookError>;

/// Errors raised while reading, editing, or persisting a record listing.
#[derive(Debug, Error)]
pub enum RatebookError {
    #[error("I/O error (path: {path:?}): {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("listing marker `{marker} = [` not found")]
    MissingMarker { marker: String },
    #[error("listing marker `{marker} = [` appears more than once (line {line})")]
    DuplicateMarker { marker: String, line: usize },
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("record {record} is missing field `{field}`")]
    MissingField { record: String, field: String },
    #[error("expected {expected} at {record}.{field} but found {found}")]
    TypeMismatch {
        record: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid value at {record}.{field}: {message}")]
    ValueParse {
        record: String,
        field: String,
        message: String,
    },
    #[error("expected a `{expected}` record but found `{found}`")]
    ConstructorMismatch { expected: String, found: String },
    #[error("required fields are empty: {}", missing.join(", "))]
    Validation { missing: Vec<&'static str> },
    #[error("invalid {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl RatebookError {
    /// Creates a [`RatebookError::Io`] with the provided optional path context.
    pub(crate) fn io_error(path: Option<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path, source }
    }

    /// Convenience constructor for [`RatebookError::Syntax`].
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`RatebookError::MissingField`].
    pub fn missing_field(record: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            record: record.into(),
            field: field.into(),
        }
    }

    /// Convenience constructor for [`RatebookError::TypeMismatch`].
    pub fn type_mismatch(
        record: impl Into<String>,
        field: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            record: record.into(),
            field: field.into(),
            expected,
            found,
        }
    }

    /// Convenience constructor for [`RatebookError::ValueParse`].
    pub fn value_parse(
        record: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ValueParse {
            record: record.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`RatebookError::InvalidValue`].
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RatebookError {
    /// Converts a plain [`std::io::Error`] into [`RatebookError::Io`] without path context.
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}
