//! Validate-then-apply helpers shared by the HTTP API and the CLI.
//!
//! # Example
//!
//! ```
//! use csvmatrix::transform::{apply_bytes, Operation};
//! use csvmatrix::parser::DEFAULT_UPLOAD_LIMIT;
//!
//! let out = apply_bytes(Operation::Invert, b"1,2\n3,4", DEFAULT_UPLOAD_LIMIT).unwrap();
//! assert_eq!(out, "1,3\n2,4\n");
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::operations::Operation;
use crate::error::{RequestResult, ValidationError};
use crate::parser::{parse, parse_bytes};

/// Parse `reader` (bounded by `limit`) and apply `op`.
pub fn apply_reader<R: Read>(op: Operation, reader: R, limit: u64) -> RequestResult<String> {
    let matrix = parse(reader, limit)?;
    Ok(op.apply(&matrix)?)
}

/// Parse an in-memory upload and apply `op`.
pub fn apply_bytes(op: Operation, bytes: &[u8], limit: u64) -> RequestResult<String> {
    let matrix = parse_bytes(bytes, limit)?;
    tracing::debug!(operation = %op, rows = matrix.len(), "matrix parsed");
    Ok(op.apply(&matrix)?)
}

/// Stream a CSV file through the validator and apply `op`.
pub fn apply_file(op: Operation, path: &Path, limit: u64) -> RequestResult<String> {
    let file = File::open(path).map_err(ValidationError::Io)?;
    apply_reader(op, file, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use std::io::Write;

    #[test]
    fn test_apply_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1,2,3\n4,5,6\n7,8,9\n").unwrap();

        let out = apply_file(Operation::Flatten, file.path(), 1024).unwrap();
        assert_eq!(out, "1,2,3,4,5,6,7,8,9\n");
    }

    #[test]
    fn test_apply_file_over_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'7'; 100]).unwrap();

        let err = apply_file(Operation::Sum, file.path(), 50).unwrap_err();
        assert_eq!(
            err.client_message().as_deref(),
            Some("Error: file upload size limit (50 bytes) exceeded")
        );
    }

    #[test]
    fn test_missing_file_is_unexpected() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply_file(Operation::Echo, &dir.path().join("nope.csv"), 1024).unwrap_err();
        assert!(matches!(err, RequestError::Validation(ValidationError::Io(_))));
        assert!(err.client_message().is_none());
    }

    #[test]
    fn test_apply_bytes_conversion_error() {
        let err = apply_bytes(Operation::Invert, b"1,2\n3,four", 1024).unwrap_err();
        assert_eq!(
            err.client_message().as_deref(),
            Some("Error: parsing CSV: record on line 2: parsing \"four\": invalid syntax")
        );
    }
}
