//! Error types for the csvmatrix request pipeline.
//!
//! Each stage of the pipeline has its own error type:
//!
//! - [`ConversionError`] - a field is not an integer literal
//! - [`ValidationError`] - size limit, CSV decoding (field counts, quoting)
//!   and matrix shape
//! - [`OperationError`] - a conversion failure tied to its row
//! - [`RequestError`] - everything a single HTTP request can fail with
//! - [`ServerError`] - server startup failures
//!
//! Conversion is automatic via `From` implementations, allowing `?` to
//! work across stage boundaries.

use thiserror::Error;

// =============================================================================
// Integer Codec Errors
// =============================================================================

/// A field that does not match the signed integer grammar.
///
/// `field` holds the text after whitespace trimming.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing \"{field}\": invalid syntax")]
pub struct ConversionError {
    pub field: String,
}

impl ConversionError {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

// =============================================================================
// Matrix Validation Errors
// =============================================================================

/// Errors raised while turning an upload into a [`crate::Matrix`].
#[derive(Debug, Error)]
pub enum ValidationError {
    /// More than `limit` bytes were uploaded.
    #[error("file upload size limit ({limit} bytes) exceeded")]
    SizeExceeded { limit: u64 },

    /// The CSV decoder rejected a record.
    #[error("record on line {line}: {detail}")]
    MalformedCsv { line: u64, detail: String },

    /// A quote outside a quoted field, or a quoted field left open.
    #[error(
        "{}parse error on line {line}, column {column}: {detail}",
        record_prefix(.start_line, .line)
    )]
    BadQuote {
        start_line: u64,
        line: u64,
        column: u64,
        detail: &'static str,
    },

    /// Row count differs from the column count of the first row.
    #[error("matrix is not square")]
    NotSquare,

    /// Reading the upload failed for a reason other than its size.
    #[error("reading upload: {0}")]
    Io(#[from] std::io::Error),
}

fn record_prefix(start_line: &u64, line: &u64) -> String {
    if start_line == line {
        String::new()
    } else {
        format!("record on line {}; ", start_line)
    }
}

impl ValidationError {
    /// True for errors caused by the uploaded content itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ValidationError::Io(_))
    }
}

// =============================================================================
// Operation Errors
// =============================================================================

/// A conversion failure positioned at its 1-based matrix row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing CSV: record on line {row}: {source}")]
pub struct OperationError {
    pub row: usize,
    #[source]
    pub source: ConversionError,
}

impl OperationError {
    pub fn at_row(row: usize, source: ConversionError) -> Self {
        Self { row, source }
    }
}

// =============================================================================
// Request Errors (top-level)
// =============================================================================

/// Everything that can end a request early.
///
/// Client errors carry the text shown to the user; the remaining variants
/// are only ever logged.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Upload, CSV or shape problem.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A field failed integer conversion.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// The multipart form had no `file` field.
    #[error("missing form file \"file\"")]
    MissingFile,

    /// The multipart body could not be decoded.
    #[error("multipart error: {0}")]
    Multipart(String),

    /// The blocking worker panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl RequestError {
    /// The single-line message for the client, or `None` when the failure
    /// is unexpected and must not be echoed back.
    pub fn client_message(&self) -> Option<String> {
        match self {
            RequestError::Validation(
                ValidationError::MalformedCsv { .. } | ValidationError::BadQuote { .. },
            ) => Some(format!("Error parsing CSV: {}", self)),
            RequestError::Validation(e) if e.is_client_error() => Some(format!("Error: {}", e)),
            RequestError::Operation(e) => Some(format!("Error: {}", e)),
            RequestError::MissingFile => Some(format!("Error: {}", self)),
            RequestError::Validation(_) | RequestError::Multipart(_) | RequestError::Worker(_) => {
                None
            }
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured host/port pair is not a socket address.
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    /// Binding or serving failed.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for the integer codec.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Result type for matrix validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for matrix operations.
pub type OperationResult<T> = Result<T, OperationError>;

/// Result type for request handling.
pub type RequestResult<T> = Result<T, RequestError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_format() {
        let err = ConversionError::new("-3.234");
        assert_eq!(err.to_string(), "parsing \"-3.234\": invalid syntax");
    }

    #[test]
    fn test_operation_error_format() {
        let err = OperationError::at_row(1, ConversionError::new("1&fl-"));
        assert_eq!(
            err.to_string(),
            "parsing CSV: record on line 1: parsing \"1&fl-\": invalid syntax"
        );
    }

    #[test]
    fn test_client_messages() {
        let size: RequestError = ValidationError::SizeExceeded { limit: 10485760 }.into();
        assert_eq!(
            size.client_message().as_deref(),
            Some("Error: file upload size limit (10485760 bytes) exceeded")
        );

        let square: RequestError = ValidationError::NotSquare.into();
        assert_eq!(
            square.client_message().as_deref(),
            Some("Error: matrix is not square")
        );

        let csv: RequestError = ValidationError::MalformedCsv {
            line: 2,
            detail: "wrong number of fields".into(),
        }
        .into();
        assert_eq!(
            csv.client_message().as_deref(),
            Some("Error parsing CSV: record on line 2: wrong number of fields")
        );

        let quote: RequestError = ValidationError::BadQuote {
            start_line: 1,
            line: 1,
            column: 2,
            detail: "bare \" in non-quoted field",
        }
        .into();
        assert_eq!(
            quote.client_message().as_deref(),
            Some("Error parsing CSV: parse error on line 1, column 2: bare \" in non-quoted field")
        );

        let op: RequestError = OperationError::at_row(3, ConversionError::new("")).into();
        assert_eq!(
            op.client_message().as_deref(),
            Some("Error: parsing CSV: record on line 3: parsing \"\": invalid syntax")
        );
    }

    #[test]
    fn test_unexpected_errors_are_hidden() {
        let io: RequestError =
            ValidationError::Io(std::io::Error::other("disk on fire")).into();
        assert!(io.client_message().is_none());
        assert!(RequestError::Worker("panicked".into()).client_message().is_none());
        assert!(RequestError::Multipart("bad boundary".into()).client_message().is_none());
    }
}
