//! `tunelink`: console remote for a streaming player backend.
//!
//! Mirrors the backend's playback queue, follows `/events`, and starts the
//! next track just before the current one ends.

mod config;
mod console;
mod event_stream;
mod server_api;
mod status_line;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tunelink_core::engine::Engine;
use tunelink_core::health::wait_for_backend;
use tunelink_core::notify::ChannelSink;

use crate::server_api::HttpGateway;

#[derive(Parser, Debug)]
#[command(name = "tunelink", version)]
struct Args {
    /// Backend base URL, e.g. http://localhost:8282
    #[arg(long)]
    server: Option<String>,

    /// Optional client config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds before track end at which the next track starts
    #[arg(long)]
    lookahead_secs: Option<f64>,

    /// Reachability polls before giving up at startup
    #[arg(long)]
    health_attempts: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,tunelink_core=info,tunelink_cli=info")
        }))
        .init();

    let cfg = match args.config.as_ref() {
        Some(path) => config::ClientConfig::load(path)?,
        None => {
            let auto_path = std::env::current_exe()
                .ok()
                .and_then(|path| path.parent().map(|dir| dir.join("tunelink.toml")));
            match auto_path {
                Some(path) if path.exists() => config::ClientConfig::load(&path)?,
                _ => config::ClientConfig::default(),
            }
        }
    };
    let overrides = config::Overrides {
        server: args.server,
        lookahead_secs: args.lookahead_secs,
        health_attempts: args.health_attempts,
    };
    let settings = config::resolve(&cfg, &overrides)?;
    tracing::info!(
        server = %settings.server,
        lookahead = settings.policy.lookahead_seconds,
        "starting"
    );

    let gateway = Arc::new(HttpGateway::new(&settings.server, settings.request_timeout)?);
    if !wait_for_backend(gateway.as_ref(), settings.health).await {
        anyhow::bail!(
            "backend at {} did not respond after {} attempts",
            settings.server,
            settings.health.attempts
        );
    }

    let (sink, notifications) = ChannelSink::new();
    let (engine, handle) = Engine::new(gateway.clone(), Arc::new(sink), settings.policy);
    let engine_task = tokio::spawn(engine.run());
    let terminal = status_line::Terminal::default();
    let printer_task = tokio::spawn(status_line::print_notifications(
        notifications,
        terminal.clone(),
    ));
    let stream_task = tokio::spawn(event_stream::run_event_stream(
        gateway.events_client(),
        gateway.events_url(),
        handle.clone(),
        settings.reconnect,
    ));

    let result = console::run(handle, terminal).await;

    // The stream task holds the last engine handle.
    stream_task.abort();
    let _ = stream_task.await;
    match engine_task.await {
        Ok(queue) => tracing::debug!(tracks = queue.len(), "engine stopped"),
        Err(e) => tracing::warn!(error = %e, "engine task failed"),
    }
    let _ = printer_task.await;
    result
}
