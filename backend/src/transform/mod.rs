//! Transformation module.
//!
//! This module turns a validated matrix into a response body:
//! - Operations: echo, flatten, invert, sum and multiply
//! - Pipeline: validate-then-apply over bytes, readers and files
//! - Stream: incremental, unvalidated echo

pub mod operations;
pub mod pipeline;
pub mod stream;

pub use operations::{operations_description, Operation};
pub use pipeline::{apply_bytes, apply_file, apply_reader};
pub use stream::{stream_error_line, EchoStream};
