// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::Url;
use std::env;

use crate::errors::ConfigError;

const DEFAULT_PORT: u16 = 8080;

/// Static configuration for the tracker, read once at startup and shared
/// read-only afterwards.
///
/// The tracker writes through the InfluxDB v1 HTTP API because it is fully
/// supported by both v1 and v3 databases. When pointing at a v3 database, a
/// "dbrp" mapping from the database and policy names to the target bucket
/// must be configured on the backend.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Base URL of the InfluxDB v1 write API. Must be a bare https origin.
    pub endpoint: String,
    /// Name of the v1 database.
    pub database: String,
    /// Retention policy of the database.
    pub policy: String,
    /// API token authorized for writes to the database.
    pub token: String,
    /// Port the ingest server listens on.
    pub port: u16,
}

impl TrackerConfig {
    /// Reads and validates configuration from `USAGE_TRACKER_*` environment
    /// variables.
    pub fn from_env() -> Result<TrackerConfig, ConfigError> {
        let config = TrackerConfig {
            endpoint: env::var("USAGE_TRACKER_ENDPOINT").unwrap_or_default(),
            database: env::var("USAGE_TRACKER_DATABASE").unwrap_or_default(),
            policy: env::var("USAGE_TRACKER_POLICY").unwrap_or_default(),
            token: env::var("USAGE_TRACKER_TOKEN").unwrap_or_default(),
            port: env::var("USAGE_TRACKER_PORT")
                .ok()
                .and_then(|port| port.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the four mandatory fields. Idempotent, so a hot-reloading
    /// host may call it again at any time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            detail: e.to_string(),
        })?;
        if url.scheme() != "https" {
            return Err(ConfigError::InsecureEndpoint {
                scheme: url.scheme().to_string(),
            });
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingHostname {
                endpoint: self.endpoint.clone(),
            });
        }
        // Url normalizes a bare origin to path "/".
        if !matches!(url.path(), "" | "/") || url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::NonBareEndpoint {
                endpoint: self.endpoint.clone(),
            });
        }
        if self.database.is_empty() {
            return Err(ConfigError::MissingDatabase);
        }
        if self.policy.is_empty() {
            return Err(ConfigError::MissingPolicy);
        }
        if self.token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(())
    }
}
