//! Request pipeline shared by the five operation endpoints.
//!
//! ```text
//! multipart ──▶ read "file" (bounded) ──▶ parse matrix ──▶ operation ──▶ 200 text
//!      │                 │                      │               │
//!      └─────────────────┴──────────────────────┴───────────────┴──▶ 400 / 500
//! ```
//!
//! The upload is read chunk by chunk and dropped as soon as it grows past
//! the limit. Parsing and the operation then run on a blocking worker; a
//! panic there only fails the request that caused it.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, info, Span};

use super::types::{panic_message, text_response};
use crate::error::{RequestError, RequestResult, ValidationError};
use crate::transform::{apply_bytes, Operation};

/// Name of the form field holding the matrix.
pub const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError, limit: u64) -> RequestError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::SizeExceeded { limit }.into()
    } else {
        RequestError::Multipart(err.body_text())
    }
}

/// Read the `file` field of a multipart upload, up to `limit` bytes.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    limit: u64,
) -> RequestResult<Vec<u8>> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(err = %rejection.body_text(), "not a multipart upload");
        RequestError::MissingFile
    })?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            if (data.len() + chunk.len()) as u64 > limit {
                return Err(ValidationError::SizeExceeded { limit }.into());
            }
            data.extend_from_slice(&chunk);
        }
        return Ok(data);
    }

    Err(RequestError::MissingFile)
}

/// Run `work` on a blocking worker inside the current request span.
///
/// A panic in `work` becomes [`RequestError::Worker`] for this request only.
pub async fn run_blocking<T, F>(work: F) -> RequestResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RequestResult<T> + Send + 'static,
{
    let span = Span::current();

    let worker = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        work()
    });

    match worker.await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            let payload = join_err.into_panic();
            Err(RequestError::Worker(format!(
                "panic: {}",
                panic_message(payload.as_ref())
            )))
        }
        Err(join_err) => Err(RequestError::Worker(join_err.to_string())),
    }
}

/// Validate the upload and apply `op` on a blocking worker.
pub async fn run_operation(op: Operation, upload: Vec<u8>, limit: u64) -> RequestResult<String> {
    run_blocking(move || apply_bytes(op, &upload, limit)).await
}

async fn process(
    op: Operation,
    multipart: Result<Multipart, MultipartRejection>,
    limit: u64,
) -> RequestResult<String> {
    let upload = read_upload(multipart, limit).await?;
    info!(operation = %op, bytes = upload.len(), "upload received");
    run_operation(op, upload, limit).await
}

/// Full pipeline for one upload: read, validate, apply, respond.
pub async fn handle_upload(
    op: Operation,
    multipart: Result<Multipart, MultipartRejection>,
    limit: u64,
) -> Response {
    match process(op, multipart, limit).await {
        Ok(body) => text_response(body),
        Err(err) => err.into_response(),
    }
}
