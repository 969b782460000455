//! HTTP Server for the csvmatrix API.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                                  |
//! |--------|----------------|----------------------------------------------|
//! | GET    | `/health`      | Health check                                 |
//! | POST   | `/echo`        | Matrix back, canonicalized                   |
//! | POST   | `/invert`      | Transposed matrix                            |
//! | POST   | `/flatten`     | All values on one line                       |
//! | POST   | `/sum`         | Sum of all values                            |
//! | POST   | `/multiply`    | Product of all values                        |
//! | POST   | `/stream/echo` | Unvalidated echo of a raw CSV body, streamed |
//!
//! Operation endpoints take a multipart form with a single `file` field.

use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Json, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use futures::StreamExt;
use std::convert::Infallible;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, info_span};
use uuid::Uuid;

use super::gatekeeper::handle_upload;
use super::types::{handle_panic, HealthResponse, TEXT_PLAIN};
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::transform::{stream_error_line, EchoStream, Operation};

/// Per-server settings shared by every request. Never mutated.
#[derive(Debug, Clone)]
pub struct AppState {
    pub upload_limit: u64,
}

/// Build the application router.
pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        upload_limit: config.max_upload_size,
    };
    let body_limit = usize::try_from(config.max_upload_size).unwrap_or(usize::MAX);

    let mut app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/stream/echo", post(stream_echo));

    for op in Operation::ALL {
        app = app.route(op.route(), upload_route(op));
    }

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %req.method(),
                    path = %req.uri().path()
                )
            }),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// POST handler running `op` through the upload pipeline.
fn upload_route(op: Operation) -> MethodRouter<AppState> {
    post(
        move |State(state): State<AppState>,
              multipart: Result<Multipart, MultipartRejection>| async move {
            handle_upload(op, multipart, state.upload_limit).await
        },
    )
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> ServerResult<()> {
    let addr = config.socket_addr()?;
    let app = router(&config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("🚀 csvmatrix server running on http://{}", addr);
    for op in Operation::ALL {
        println!("   POST {:<12} - {}", op.route(), op.name());
    }
    println!("   POST /stream/echo - streamed echo (raw body)");
    println!("   GET  /health      - Health check");
    println!("   Upload limit: {} bytes", config.max_upload_size);
    println!();

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Echo a raw CSV body record by record while it is still uploading.
///
/// The status line is sent before the body is read, so decoding errors can
/// only be reported inside the body.
async fn stream_echo(body: Body) -> Response {
    let state = Some((body.into_data_stream(), EchoStream::new()));

    let stream = futures::stream::unfold(state, |state| async move {
        let (mut chunks, mut echo) = state?;
        loop {
            let mut out = Vec::new();
            match chunks.next().await {
                Some(Ok(chunk)) => match echo.feed(&chunk, &mut out) {
                    Ok(()) if out.is_empty() => continue,
                    Ok(()) => {
                        return Some((Ok::<_, Infallible>(Bytes::from(out)), Some((chunks, echo))))
                    }
                    Err(err) => {
                        out.extend_from_slice(stream_error_line(&err).as_bytes());
                        return Some((Ok(Bytes::from(out)), None));
                    }
                },
                Some(Err(err)) => {
                    error!(err = %err, "reading stream body");
                    return Some((Ok(Bytes::from_static(b"Unexpected error\n")), None));
                }
                None => {
                    match echo.finish(&mut out) {
                        Ok(()) => debug!(records = echo.records(), "stream echo finished"),
                        Err(err) => out.extend_from_slice(stream_error_line(&err).as_bytes()),
                    }
                    if out.is_empty() {
                        return None;
                    }
                    return Some((Ok(Bytes::from(out)), None));
                }
            }
        }
    });

    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))],
        Body::from_stream(stream),
    )
        .into_response()
}
