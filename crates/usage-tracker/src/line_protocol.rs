// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! InfluxDB line-protocol encoding for launch sessions.
//!
//! Each session becomes exactly one point. Low-cardinality dimensions go into
//! tags (indexed by the backend), high-cardinality values into fields. The
//! timestamp is the launch instant in nanoseconds, the v1 write API's default
//! precision. Encoding is pure: the same session always yields the same line.

use crate::session::Session;

/// Measurement name for every point.
pub const MEASUREMENT: &str = "session";

/// Encodes one session as a line-protocol point.
///
/// Tags: `appId`, `appVersion`, `osName`, `osVersion`, `appLocale` (empty
/// values are omitted, since the protocol rejects empty tag values). Fields:
/// `userId`, `sessionId`, `nglVersion` as strings and `launchDuration` as a
/// float in seconds.
pub fn encode_point(session: &Session) -> String {
    let mut line = String::from(MEASUREMENT);
    for (key, value) in [
        ("appId", session.app_id.as_str()),
        ("appVersion", session.app_version.as_str()),
        ("osName", session.os_name.as_str()),
        ("osVersion", session.os_version.as_str()),
        ("appLocale", session.app_locale.as_str()),
    ] {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(key);
        line.push('=');
        line.push_str(&escape_tag_value(value));
    }
    line.push_str(" userId=\"");
    line.push_str(&escape_field_string(&session.user_id));
    line.push_str("\",sessionId=\"");
    line.push_str(&escape_field_string(&session.session_id));
    line.push_str("\",nglVersion=\"");
    line.push_str(&escape_field_string(&session.ngl_version));
    line.push_str("\",launchDuration=");
    line.push_str(&session.launch_duration.as_secs_f64().to_string());
    line.push(' ');
    // Instants without a nanosecond representation encode as the epoch; the
    // parser never emits one.
    let nanos = session.launch_time.timestamp_nanos_opt().unwrap_or_default();
    line.push_str(&nanos.to_string());
    line
}

/// Encodes a batch as newline-separated points, one write body per upload.
pub fn encode_batch(sessions: &[Session]) -> String {
    sessions
        .iter()
        .map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Backslash-escapes the characters the protocol reserves in tag values
/// (comma, equals, space). An unescaped one corrupts the whole line.
fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Backslash-escapes backslashes and double quotes in string field values.
fn escape_field_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
