// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP ingest boundary.
//!
//! Every request body is treated as a potential log upload: the handler
//! buffers the body, extracts launch sessions, writes them to the metrics
//! backend, and then hands the request — body intact — to an injected
//! upstream handler. Ingestion is a side effect, never a gate: parse and
//! upload outcomes are logged but do not change the response the upstream
//! produces.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{http, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::http_utils::{log_and_create_http_response, verify_request_content_length};
use crate::parser::parse_log;
use crate::uploader::SessionUploader;

const MAX_REQUEST_CONTENT_LENGTH: usize = 10 * 1024 * 1024; // 10MB in Bytes

/// Downstream processing the tracker wraps. The tracker only observes the
/// request; whatever the upstream returns is the response.
#[async_trait]
pub trait UpstreamHandler {
    async fn handle(&self, req: Request<Full<Bytes>>) -> http::Result<Response<Full<Bytes>>>;
}

/// Default upstream: acknowledge the upload the way the vendor's collection
/// endpoint does.
pub struct AcceptUpstream;

#[async_trait]
impl UpstreamHandler for AcceptUpstream {
    async fn handle(&self, _req: Request<Full<Bytes>>) -> http::Result<Response<Full<Bytes>>> {
        Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::new()))
    }
}

/// Ingest server: accepts connections and runs every request through
/// [`track_and_forward`]. Constructed explicitly and handed its collaborators
/// by the hosting process; no global registration.
pub struct IngestServer {
    uploader: Arc<SessionUploader>,
    upstream: Arc<dyn UpstreamHandler + Send + Sync>,
}

impl IngestServer {
    pub fn new(
        uploader: Arc<SessionUploader>,
        upstream: Arc<dyn UpstreamHandler + Send + Sync>,
    ) -> IngestServer {
        IngestServer { uploader, upstream }
    }

    /// Serves connections from the given listener until a fatal accept error.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let (conn, peer) = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, peer)) => (conn, peer),
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };

            let io = TokioIo::new(conn);
            let server = server.clone();
            let uploader = Arc::clone(&self.uploader);
            let upstream = Arc::clone(&self.upstream);
            joinset.spawn(async move {
                let service = service_fn(move |req| {
                    track_and_forward(req, Arc::clone(&uploader), Arc::clone(&upstream), peer)
                });
                if let Err(e) = server.serve_connection(io, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }
}

/// Handles one request: buffer the body, extract and forward sessions, then
/// pass the request through unchanged.
async fn track_and_forward(
    req: Request<Incoming>,
    uploader: Arc<SessionUploader>,
    upstream: Arc<dyn UpstreamHandler + Send + Sync>,
    peer: SocketAddr,
) -> http::Result<Response<Full<Bytes>>> {
    let (parts, body) = req.into_parts();
    if let Some(response) = verify_request_content_length(
        &parts.headers,
        MAX_REQUEST_CONTENT_LENGTH,
        "Error processing log upload",
    ) {
        return response;
    }

    let body_bytes = match collect_body_bounded(body, MAX_REQUEST_CONTENT_LENGTH).await {
        Ok(bytes) => bytes,
        Err(e) if e.is::<LengthLimitError>() => {
            return log_and_create_http_response(
                "Error processing log upload: Payload too large",
                StatusCode::PAYLOAD_TOO_LARGE,
            );
        }
        Err(e) => {
            // The only other case that alters the response: downstream could
            // not see the body either.
            return log_and_create_http_response(
                &format!("Error reading log upload body: {e}"),
                StatusCode::BAD_REQUEST,
            );
        }
    };

    let remote_addr = peer.to_string();
    let text = String::from_utf8_lossy(&body_bytes);
    let sessions = parse_log(&text, Some(&remote_addr));
    info!(
        "Incoming request summary: remote-address={} content-length={} session-count={}",
        remote_addr,
        body_bytes.len(),
        sessions.len()
    );
    if sessions.is_empty() {
        info!("No sessions to upload");
    } else {
        debug!("Uploading sessions: {sessions:?}");
        match uploader.upload(&sessions).await {
            Ok(()) => info!("Sent {} sessions successfully", sessions.len()),
            Err(e) => error!("Failed to send sessions: {e}"),
        }
    }

    let req = Request::from_parts(parts, Full::new(body_bytes));
    upstream.handle(req).await
}

/// Collects a request body while enforcing the size cap on the bytes actually
/// received. The Content-Length header check is an early reject only; chunked
/// uploads declare no length.
async fn collect_body_bounded<B>(
    body: B,
    limit: usize,
) -> Result<Bytes, Box<dyn std::error::Error + Send + Sync>>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Ok(Limited::new(body, limit).collect().await?.to_bytes())
}
