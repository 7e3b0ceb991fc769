// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use usage_tracker::{
    config::TrackerConfig,
    server::{AcceptUpstream, IngestServer},
    uploader::SessionUploader,
};

const AGENT_HOST: &str = "0.0.0.0";

#[tokio::main]
pub async fn main() {
    let log_level = env::var("USAGE_TRACKER_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match TrackerConfig::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on usage tracker startup: {e}");
            return;
        }
    };

    let uploader = match SessionUploader::new(&config) {
        Ok(u) => Arc::new(u),
        Err(e) => {
            error!("Error creating uploader on usage tracker startup: {e}");
            return;
        }
    };

    let listener = match TcpListener::bind((AGENT_HOST, config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Unable to bind port {}: {e}", config.port);
            return;
        }
    };
    info!("Usage tracker started: listening on port {}", config.port);

    let server = IngestServer::new(uploader, Arc::new(AcceptUpstream));
    if let Err(e) = server.serve(listener).await {
        error!("Error running the usage tracker server: {e:?}");
    }
}
