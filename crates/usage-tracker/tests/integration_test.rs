// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{http, Request, Response, StatusCode};
use mockito::Matcher;
use tokio::net::TcpListener;

use usage_tracker::config::TrackerConfig;
use usage_tracker::errors::UploadError;
use usage_tracker::server::{IngestServer, UpstreamHandler};
use usage_tracker::session::Session;
use usage_tracker::uploader::SessionUploader;

fn config_for(endpoint: &str) -> TrackerConfig {
    TrackerConfig {
        endpoint: endpoint.to_string(),
        database: "usage".to_string(),
        policy: "autogen".to_string(),
        token: "secret-token".to_string(),
        port: 0,
    }
}

fn sample_session() -> Session {
    Session {
        app_id: "InDesign1".to_string(),
        app_version: "19.2".to_string(),
        os_name: "MAC".to_string(),
        os_version: "14.3.1".to_string(),
        ngl_version: "1.35.0.19".to_string(),
        app_locale: "en_US".to_string(),
        user_id: "9f22a90139cbb9f1676b0113e1fb574976dc550a".to_string(),
        session_id: "1707732930118.7c4a1b2e-3f5d-4e6a-9b8c-0d1e2f3a4b5c".to_string(),
        launch_time: Utc.timestamp_millis_opt(1_707_732_930_118).unwrap(),
        launch_duration: Duration::from_millis(42_815),
        remote_addr: None,
    }
}

#[tokio::test]
async fn upload_writes_batch_to_influx() {
    let mut mock_server = mockito::Server::new_async().await;
    let mock = mock_server
        .mock("POST", "/write")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("db".to_string(), "usage".to_string()),
            Matcher::UrlEncoded("rp".to_string(), "autogen".to_string()),
        ]))
        .match_header("authorization", "Bearer secret-token")
        .match_header("content-type", "text/plain; charset=utf-8")
        .match_body(Matcher::Regex(
            "^session,appId=InDesign1,.* .*launchDuration=42.815 1707732930118000000$".to_string(),
        ))
        .with_status(204)
        .create_async()
        .await;

    let uploader =
        SessionUploader::new(&config_for(&mock_server.url())).expect("uploader creation failed");
    uploader
        .upload(&[sample_session()])
        .await
        .expect("upload should succeed");

    mock.assert_async().await;
}

#[tokio::test]
async fn upload_surfaces_backend_rejection() {
    let mut mock_server = mockito::Server::new_async().await;
    let mock = mock_server
        .mock("POST", "/write")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("{\"error\":\"retention policy not found: autogen\"}")
        .create_async()
        .await;

    let uploader =
        SessionUploader::new(&config_for(&mock_server.url())).expect("uploader creation failed");
    let result = uploader.upload(&[sample_session()]).await;

    mock.assert_async().await;
    match result {
        Err(UploadError::Rejected { status, detail }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(detail.contains("retention policy not found"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_surfaces_transport_error() {
    // Discard port on loopback, nothing listens there.
    let uploader = SessionUploader::new(&config_for("http://127.0.0.1:9"))
        .expect("uploader creation failed");
    let result = uploader.upload(&[sample_session()]).await;
    assert!(matches!(result, Err(UploadError::Transport(_))));
}

/// Upstream that reflects the request body back, so tests can observe exactly
/// what the tracker forwarded.
struct EchoUpstream;

#[async_trait]
impl UpstreamHandler for EchoUpstream {
    async fn handle(&self, req: Request<Full<Bytes>>) -> http::Result<Response<Full<Bytes>>> {
        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(_) => unreachable!("Full bodies are infallible"),
        };
        Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(body))
    }
}

async fn spawn_tracker(endpoint: &str) -> String {
    let uploader = SessionUploader::new(&config_for(endpoint)).expect("uploader creation failed");
    let server = IngestServer::new(Arc::new(uploader), Arc::new(EchoUpstream));
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn forwards_sessions_and_passes_request_through() {
    let mut mock_server = mockito::Server::new_async().await;
    let mock = mock_server
        .mock("POST", "/write")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer secret-token")
        .with_status(204)
        .create_async()
        .await;

    let tracker_url = spawn_tracker(&mock_server.url()).await;
    let raw = include_str!("testdata/indesign-single-session-1.txt");

    let response = reqwest::Client::new()
        .post(&tracker_url)
        .body(raw)
        .send()
        .await
        .expect("request to tracker failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body read failed"), raw);

    mock.assert_async().await;
}

#[tokio::test]
async fn delivery_failure_does_not_affect_response() {
    // Uploads go nowhere; the client must not notice.
    let tracker_url = spawn_tracker("http://127.0.0.1:9").await;
    let raw = include_str!("testdata/indesign-multi-session-1-2.txt");

    let response = reqwest::Client::new()
        .post(&tracker_url)
        .body(raw)
        .send()
        .await
        .expect("request to tracker failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body read failed"), raw);
}

#[tokio::test]
async fn oversized_chunked_uploads_are_rejected() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let tracker_url = spawn_tracker("http://127.0.0.1:9").await;
    let addr = tracker_url.trim_start_matches("http://").to_string();
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("connect failed");
    let (mut reader, mut writer) = stream.split();

    // A chunked body carries no Content-Length, so only the byte-count bound
    // can stop it. The server answers as soon as the bound trips; write
    // errors past that point are expected.
    let chunk = vec![b'a'; 1024 * 1024];
    let chunk_head = format!("{:x}\r\n", chunk.len());
    let write = async {
        let head = "POST / HTTP/1.1\r\nhost: localhost\r\ntransfer-encoding: chunked\r\n\r\n";
        let _ = writer.write_all(head.as_bytes()).await;
        for _ in 0..12 {
            if writer.write_all(chunk_head.as_bytes()).await.is_err()
                || writer.write_all(&chunk).await.is_err()
                || writer.write_all(b"\r\n").await.is_err()
            {
                break;
            }
        }
        let _ = writer.write_all(b"0\r\n\r\n").await;
    };
    let read = async {
        let mut response = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.windows(2).any(|w| w == b"\r\n") {
                        break;
                    }
                }
            }
        }
        response
    };
    let (_, response) = tokio::join!(write, read);

    let response = String::from_utf8_lossy(&response);
    assert!(
        response.starts_with("HTTP/1.1 413"),
        "unexpected response: {response}"
    );
}

#[tokio::test]
async fn non_log_bodies_pass_through_untouched() {
    let tracker_url = spawn_tracker("http://127.0.0.1:9").await;

    let response = reqwest::Client::new()
        .post(&tracker_url)
        .body("{\"not\":\"an ngl log\"}")
        .send()
        .await
        .expect("request to tracker failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await.expect("body read failed"),
        "{\"not\":\"an ngl log\"}"
    );
}
