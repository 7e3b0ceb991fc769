// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parser for raw NGL client-log uploads.
//!
//! An upload is an opaque block of text, possibly the concatenation of several
//! independent log flushes. Launch reports are single pipe-delimited lines
//! whose `LogAnalyticsEvent` segment is followed by a JSON payload:
//!
//! ```text
//! 02/12/24 10:15:30:118 | [INFO] |  | NGLClient_InDesign119.2 | LogAnalyticsEvent | {"SessionID":"1707732930118.<guid>","EventName":"APP_LAUNCH",...}
//! ```
//!
//! The session id encodes the launch instant as an epoch-milliseconds prefix,
//! which is why the launch time is stable across every report of one launch.
//! Anything that does not parse as a complete report is skipped; partial
//! fragments are common and must never abort the upload.

use chrono::{DateTime, TimeZone, Utc};
use fnv::FnvHashMap;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::session::Session;

/// Pipe segment that marks a launch-report line.
const REPORT_MARKER: &str = "LogAnalyticsEvent";

/// JSON payload of a launch-report line. Unknown keys are ignored; every key
/// except the session id may be absent in partial flushes.
#[derive(Debug, Deserialize)]
struct ReportPayload {
    #[serde(rename = "SessionID")]
    session_id: String,
    #[serde(rename = "AppID", default)]
    app_id: String,
    #[serde(rename = "AppVersion", default)]
    app_version: String,
    #[serde(rename = "OSName", default)]
    os_name: String,
    #[serde(rename = "OSVersion", default)]
    os_version: String,
    #[serde(rename = "AppLocale", default)]
    app_locale: String,
    #[serde(rename = "UserID", default)]
    user_id: String,
    #[serde(rename = "NGLLibVersion", default)]
    ngl_version: String,
    /// Elapsed session time in milliseconds, as a decimal string.
    #[serde(rename = "Duration", default)]
    duration: String,
}

/// Parses an uploaded log into launch sessions, in the chronological order
/// they appear in the text.
///
/// Within one call, reports sharing a session id collapse to a single entry in
/// first-seen order carrying the greatest duration observed for that id. The
/// parser is pure and stateless across calls, and it never fails: text with no
/// recognizable reports yields an empty vector.
///
/// `remote_addr` is caller-supplied context (the upload's network origin) and
/// is stamped onto every session produced by this call.
pub fn parse_log(raw: &str, remote_addr: Option<&str>) -> Vec<Session> {
    let mut sessions: Vec<Session> = Vec::new();
    let mut index: FnvHashMap<String, usize> = FnvHashMap::default();

    for line in raw.lines() {
        let Some(report) = parse_report(line) else {
            continue;
        };
        match index.get(report.session_id.as_str()) {
            Some(&at) => {
                // A later flush of the same launch carries a longer duration.
                if report.launch_duration >= sessions[at].launch_duration {
                    sessions[at] = report;
                }
            }
            None => {
                index.insert(report.session_id.clone(), sessions.len());
                sessions.push(report);
            }
        }
    }

    if let Some(addr) = remote_addr {
        for session in &mut sessions {
            session.remote_addr = Some(addr.to_string());
        }
    }

    sessions
}

/// Parses one log line into a candidate session, or `None` if the line is not
/// a complete launch report.
fn parse_report(line: &str) -> Option<Session> {
    let (_, rest) = line.split_once(REPORT_MARKER)?;
    let brace = rest.find('{')?;
    let payload: ReportPayload = match serde_json::from_str(&rest[brace..]) {
        Ok(payload) => payload,
        Err(e) => {
            debug!("Skipping malformed launch report: {e}");
            return None;
        }
    };
    if payload.app_id.is_empty() {
        debug!("Skipping launch report without an app id");
        return None;
    }
    let Some(launch_time) = launch_time_of(&payload.session_id) else {
        debug!(
            "Skipping launch report with unusable session id {:?}",
            payload.session_id
        );
        return None;
    };
    let millis: u64 = payload.duration.parse().unwrap_or_else(|e| {
        if !payload.duration.is_empty() {
            debug!(
                "Defaulting malformed duration {:?} to zero: {e}",
                payload.duration
            );
        }
        0
    });

    Some(Session {
        app_id: payload.app_id,
        app_version: payload.app_version,
        os_name: payload.os_name,
        os_version: payload.os_version,
        ngl_version: payload.ngl_version,
        app_locale: payload.app_locale,
        user_id: payload.user_id,
        session_id: payload.session_id,
        launch_time,
        launch_duration: Duration::from_millis(millis),
        remote_addr: None,
    })
}

/// Extracts the launch instant from the session id's epoch-milliseconds
/// prefix (`<epoch-ms>.<guid>`).
fn launch_time_of(session_id: &str) -> Option<DateTime<Utc>> {
    let (millis, _) = session_id.split_once('.')?;
    let millis: i64 = millis.parse().ok()?;
    let launch_time = Utc.timestamp_millis_opt(millis).single()?;
    // Points carry nanosecond timestamps; an instant that cannot be
    // expressed in nanoseconds is not a plausible launch.
    launch_time.timestamp_nanos_opt()?;
    Some(launch_time)
}
