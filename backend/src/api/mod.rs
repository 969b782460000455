//! HTTP API module.
//!
//! This module provides the HTTP server, the shared upload pipeline and
//! the response types.

pub mod gatekeeper;
pub mod server;
pub mod types;

pub use gatekeeper::{handle_upload, read_upload, run_operation, FILE_FIELD};
pub use server::{router, start_server, AppState};
pub use types::*;
