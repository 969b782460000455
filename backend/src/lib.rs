//! # csvmatrix - integer matrix operations over HTTP
//!
//! csvmatrix accepts a square CSV matrix of integers as a multipart upload
//! and answers with one of five transformations: echo, flatten, invert,
//! sum or multiply.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Upload    │────▶│   Parser    │────▶│  Operation  │────▶│ Plain text  │
//! │ (multipart) │     │ (bounded)   │     │  (BigInt)   │     │  response   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use csvmatrix::{apply_bytes, Operation, DEFAULT_UPLOAD_LIMIT};
//!
//! let sum = apply_bytes(Operation::Sum, b"1,2,3\n4,5,6\n7,8,9", DEFAULT_UPLOAD_LIMIT).unwrap();
//! assert_eq!(sum, "45\n");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types for every pipeline stage
//! - [`codec`] - Integer literal parsing and canonical rendering
//! - [`parser`] - Bounded CSV decoding into a square [`Matrix`]
//! - [`transform`] - Operations, file/bytes pipeline, streaming echo
//! - [`config`] - Server configuration
//! - [`logs`] - Logging setup
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod config;
pub mod logs;

// Parsing
pub mod codec;
pub mod parser;

// Transformation
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConversionError,
    ValidationError,
    OperationError,
    RequestError,
    ServerError,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use codec::{join_all, parse_all};
pub use parser::{parse, parse_bytes, BoundedReader, Matrix, DEFAULT_UPLOAD_LIMIT};

// =============================================================================
// Re-exports - Operations
// =============================================================================

pub use transform::{
    apply_bytes,
    apply_file,
    apply_reader,
    operations_description,
    EchoStream,
    Operation,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::ServerConfig;
pub use logs::init_logging;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
