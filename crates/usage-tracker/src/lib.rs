// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Usage-log tracker for Adobe desktop applications.
//!
//! Desktop applications upload raw NGL (licensing/telemetry library) log text
//! over HTTP. This crate parses those uploads into launch sessions, encodes
//! each session as an InfluxDB line-protocol point, and forwards the batch to
//! a configured InfluxDB v1 write endpoint. Ingestion is best effort: the
//! original request is always passed through to the upstream handler
//! unchanged, whatever the parse or upload outcome.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod errors;
pub mod http_utils;
pub mod line_protocol;
pub mod parser;
pub mod server;
pub mod session;
pub mod uploader;
