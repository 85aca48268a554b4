//! news-proxy: serves `GET /search` over RSS feeds or the Google Custom
//! Search API so that search credentials stay on the server.

mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shared::{Config, NewsAdapter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "news-proxy")]
#[command(about = "HTTP proxy answering news searches from RSS feeds or Google Custom Search")]
struct Args {
    /// Address to listen on (overrides NEWS_PROXY_BIND)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let adapter = NewsAdapter::from_config(&config).context("Failed to build news adapter")?;

    if adapter.google_enabled() {
        info!("Google Custom Search enabled");
    } else {
        warn!("GOOGLE_CSE_ID/GOOGLE_API_KEY not set; method=google requests will fail");
    }
    info!(feeds = config.feeds.len(), per_feed = config.per_feed_limit, "RSS feeds configured");

    let bind = args.bind.unwrap_or_else(|| config.proxy_bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;

    let app = routes::build(Arc::new(adapter));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "news-proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("news-proxy stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
