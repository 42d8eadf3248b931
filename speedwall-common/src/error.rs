//! Common error types for Speedwall

use std::fmt;

use thiserror::Error;

/// Common result type for Speedwall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Field-level validation errors, in the order the fields were checked.
///
/// Carried by [`Error::Validation`] so callers can surface which input
/// fields were rejected rather than a single opaque message.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FieldErrors(Vec<FieldError>);

/// One rejected field and the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejection for `field`
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Return `Ok(())` when no field was rejected, `Err(Validation)` otherwise
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Common error taxonomy across Speedwall components
///
/// The first three variants are the saga outcomes: `InvalidInput` before any
/// side effect, `StorageFailure` before any relational write (retry-safe),
/// and `Validation` after asset storage (compensation attempted).
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed required fields; no side effects occurred
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Binary asset store unavailable or errored; no relational state created
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Field or constraint validation rejected the write
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_display_joins_entries() {
        let mut errors = FieldErrors::new();
        errors.push("recorded_speed", "must be positive");
        errors.push("location", "must not be empty");
        assert_eq!(
            errors.to_string(),
            "recorded_speed: must be positive; location: must not be empty"
        );
    }

    #[test]
    fn empty_field_errors_convert_to_ok() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errors = FieldErrors::new();
        errors.push("authorized_speed", "must be positive");
        match errors.into_result() {
            Err(Error::Validation(e)) => assert!(!e.is_empty()),
            other => panic!("expected Validation error, got {:?}", other.map(|_| ())),
        }
    }
}
