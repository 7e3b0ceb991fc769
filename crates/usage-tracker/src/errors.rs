// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use thiserror::Error;

/// Provisioning-time configuration failures. Any of these is fatal: the
/// service refuses to start rather than ingest without a valid destination.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("an endpoint URL must be specified")]
    MissingEndpoint,
    #[error("{endpoint:?} is not a valid endpoint URL: {detail}")]
    InvalidEndpoint { endpoint: String, detail: String },
    #[error("endpoint protocol must be https, not {scheme:?}")]
    InsecureEndpoint { scheme: String },
    #[error("endpoint {endpoint:?} is missing a hostname")]
    MissingHostname { endpoint: String },
    #[error("endpoint {endpoint:?} cannot have a path, query, or fragment portion")]
    NonBareEndpoint { endpoint: String },
    #[error("a database must be specified")]
    MissingDatabase,
    #[error("a retention policy must be specified")]
    MissingPolicy,
    #[error("a token must be specified")]
    MissingToken,
}

/// A failed batch write. One outcome per upload attempt: the write endpoint
/// is all-or-nothing per request, so there is no partial-success variant.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to reach the metrics endpoint: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("metrics endpoint rejected the write ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },
}
