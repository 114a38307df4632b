//! # streamfwd-demo
//!
//! Serves a synthetic pod watch feed through the stream forwarder:
//!
//! - `GET /v1/pods/watch` streams events (SSE with `Accept: text/event-stream`,
//!   newline-delimited JSON otherwise), deduplicated per pod
//! - `GET /v1/pods/{name}` returns one pod
//!
//! Both honor `?fields=`.

#![deny(unsafe_code)]

mod feed;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use streamfwd_core::logging::{init_json_subscriber, init_subscriber};
use streamfwd_server::{MessageKeyFn, StreamForwarder};
use streamfwd_settings::loader::{load_settings_from_path, settings_path};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::feed::PodEvent;
use crate::routes::{AppState, build_router};

/// Stream forwarder demo server.
#[derive(Parser, Debug)]
#[command(name = "streamfwd-demo", about = "Stream forwarder demo server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Settings file (defaults to `$STREAMFWD_SETTINGS` or `~/.streamfwd/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Milliseconds between synthetic feed events.
    #[arg(long, default_value = "1000")]
    feed_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let path = args.settings.clone().unwrap_or_else(settings_path);
    let settings = load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;

    if settings.logging.json {
        init_json_subscriber(&settings.logging.level);
    } else {
        init_subscriber(&settings.logging.level);
    }

    let key_of: MessageKeyFn<PodEvent> = Arc::new(feed::pod_key);
    let forwarder = StreamForwarder::from_settings(&settings).with_message_key(key_of);
    let shutdown = CancellationToken::new();
    let router = build_router(AppState {
        forwarder: Arc::new(forwarder),
        shutdown: shutdown.clone(),
        feed_period: Duration::from_millis(args.feed_interval_ms.max(1)),
    });

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port))
        .await
        .context("failed to bind server")?;
    let addr = listener.local_addr()?;
    info!(
        %addr,
        keepalive = settings.keepalive.enabled,
        keepalive_secs = settings.keepalive.interval_secs,
        "streamfwd demo listening"
    );

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down");
    shutdown.cancel();
    server
        .await
        .context("server task panicked")?
        .context("server error")?;
    info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["streamfwd-demo"]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 8080);
        assert!(cli.settings.is_none());
        assert_eq!(cli.feed_interval_ms, 1000);
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from([
            "streamfwd-demo",
            "--port",
            "0",
            "--settings",
            "/tmp/fwd.json",
            "--feed-interval-ms",
            "250",
        ]);
        assert_eq!(cli.port, 0);
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/fwd.json")));
        assert_eq!(cli.feed_interval_ms, 250);
    }
}
