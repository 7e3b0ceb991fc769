// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch writes of session points to the InfluxDB v1 write API.
//!
//! One write request per inbound upload, never one per session: the common
//! case of one or a few sessions stays a single round trip. Every call is
//! synchronous and independent; there is no retry, queue, or cache. Losing a
//! batch on transient failure is acceptable for best-effort telemetry,
//! blocking the request path indefinitely is not, so the single blocking call
//! is bounded by a client timeout.

use reqwest::header;
use std::time::Duration;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::errors::UploadError;
use crate::line_protocol::encode_batch;
use crate::session::Session;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the configured write endpoint. Cheap to clone, safe to share
/// across concurrent uploads; nothing here is mutated after construction.
#[derive(Debug, Clone)]
pub struct SessionUploader {
    client: reqwest::Client,
    write_url: String,
    database: String,
    policy: String,
    token: String,
}

impl SessionUploader {
    /// Builds an uploader for the given (already validated) configuration.
    pub fn new(config: &TrackerConfig) -> Result<SessionUploader, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;
        Ok(SessionUploader {
            client,
            write_url: format!("{}/write", config.endpoint.trim_end_matches('/')),
            database: config.database.clone(),
            policy: config.policy.clone(),
            token: config.token.clone(),
        })
    }

    /// Writes one batch of sessions. The outcome is binary: the v1 write
    /// endpoint applies a request entirely or not at all.
    pub async fn upload(&self, sessions: &[Session]) -> Result<(), UploadError> {
        let body = encode_batch(sessions);
        debug!(
            "Writing {} session points to {}",
            sessions.len(),
            self.write_url
        );
        let response = self
            .client
            .post(&self.write_url)
            .query(&[
                ("db", self.database.as_str()),
                ("rp", self.policy.as_str()),
            ])
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(UploadError::Rejected { status, detail })
    }
}
