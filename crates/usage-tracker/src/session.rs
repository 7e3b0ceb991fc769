// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use std::time::Duration;

/// One resolved application launch, extracted from an uploaded log.
///
/// A launch may be reported several times as the log accumulates; all reports
/// share the same `session_id` and carry a non-decreasing elapsed duration.
/// The parser collapses reports within one upload; correlation across uploads
/// is visible only through equal `session_id` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Product identifier, e.g. `InDesign1`.
    pub app_id: String,
    /// Dotted application version, e.g. `19.2`.
    pub app_version: String,
    /// Short OS family code, e.g. `MAC` or `WIN`.
    pub os_name: String,
    /// Dotted OS version, e.g. `14.3.1`.
    pub os_version: String,
    /// Version of the NGL library that wrote the log.
    pub ngl_version: String,
    /// Locale tag, e.g. `en_US`.
    pub app_locale: String,
    /// Opaque, pre-hashed user identifier.
    pub user_id: String,
    /// Identifier shared by all reports of the same launch.
    pub session_id: String,
    /// Instant the launch was first reported.
    pub launch_time: DateTime<Utc>,
    /// Elapsed running time of the session as of this report.
    pub launch_duration: Duration,
    /// Network origin of the upload, stamped by the ingest boundary.
    pub remote_addr: Option<String>,
}
