// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Struk: thermal receipt printing over a host method channel.
//
// Entry point. Initialises logging on stderr, loads the config, builds the
// print pipeline, then serves JSON-lines method calls from stdin until EOF.

mod channel;
mod services;

use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use channel::Outbound;
use services::app_services::AppServices;
use services::data_dir;
use struk_core::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Struk starting");

    let config_path = data_dir::config_path();
    let config = AppConfig::load_or_default(&config_path);

    let (outbound, outbound_rx) = mpsc::unbounded_channel::<Outbound>();
    let services = match AppServices::init(config, outbound.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "print pipeline failed to start");
            return ExitCode::FAILURE;
        }
    };

    let writer = tokio::spawn(write_outbound(outbound_rx));
    let served = serve(&services, &outbound).await;

    let stopping = services.clone();
    if tokio::task::spawn_blocking(move || stopping.shutdown()).await.is_err() {
        warn!("shutdown task panicked");
    }
    drop(services);
    drop(outbound);
    if writer.await.is_err() {
        warn!("output task panicked");
    }

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "reading method calls failed");
            ExitCode::FAILURE
        }
    }
}

/// Read calls until EOF. Each call runs on its own task so a parked print
/// cannot block the `authorizationResult` that releases it.
async fn serve(services: &AppServices, outbound: &mpsc::UnboundedSender<Outbound>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut calls = JoinSet::new();

    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        if line.trim().is_empty() {
            continue;
        }
        match channel::parse_line(&line) {
            Ok(call) => {
                let services = services.clone();
                let outbound = outbound.clone();
                calls.spawn(async move {
                    let response = channel::dispatch(&services, call).await;
                    let _ = outbound.send(Outbound::Response(response));
                });
            }
            Err(response) => {
                let _ = outbound.send(Outbound::Response(response));
            }
        }
    };

    info!("input closed");
    services.close_host();
    while let Some(joined) = calls.join_next().await {
        if joined.is_err() {
            warn!("method call task panicked");
        }
    }
    result
}

async fn write_outbound(mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = outbound.recv().await {
        let mut line = match serde_json::to_vec(&message) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "could not serialize response");
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = write_line(&mut stdout, &line).await {
            error!(error = %e, "could not write response");
            break;
        }
    }
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &[u8]) -> std::io::Result<()> {
    stdout.write_all(line).await?;
    stdout.flush().await
}
