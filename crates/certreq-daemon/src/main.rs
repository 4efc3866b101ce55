// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use certreq_daemon::config::ServiceConfig;
use certreq_daemon::http;
use certreq_daemon::telemetry::Telemetry;

#[derive(Debug, Parser)]
#[command(name = "certreq-daemon")]
#[command(about = "Certification request workflow daemon")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log))
        .init();

    let cfg = ServiceConfig::from_env()?;
    let listener = http::bind_listener(&args.listen).await?;
    let addr = listener.local_addr()?;
    let state = http::build_state(&cfg, Arc::new(Telemetry::new()));

    tracing::info!(%addr, config = ?cfg, "starting certification request server");

    http::serve(listener, state, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown signal received");
    })
    .await?;

    Ok(())
}
