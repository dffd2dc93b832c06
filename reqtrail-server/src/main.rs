// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  reqtrail: request logging for axum services
//
//  Capture:  axum middleware in front of every host route
//  Buffer:   rolling in-memory entries, queried over the admin routes
//  Sink:     structured events through tracing, optionally detached
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

mod demo;

use clap::Parser;
use reqtrail_core::TrailConfig;
use reqtrail_core::config::{SinkConfig, SinkKind};
use reqtrail_http::RequestLogsFeature;
use reqtrail_logging::{ChannelSink, EventSink, TracingSink};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "reqtrail", version, about = "Demo service with request logging")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "reqtrail.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "reqtrail starting");

    // ── Config ──
    let config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        TrailConfig::load(&cli.config)?
    } else {
        info!("No config file found, using defaults");
        TrailConfig::default()
    };

    // ── Sink + logger ──
    let sink = build_sink(&config.sink)?;
    let feature = RequestLogsFeature::from_config(&config, sink);
    if let Some(logger) = feature.logger() {
        info!(
            capacity = logger.store().capacity(),
            policy = ?logger.policy(),
            "Request logger registered"
        );
    }

    let app = feature.register(demo::routes());

    // ── Serve ──
    let listener = tokio::net::TcpListener::bind(config.server.addr.as_str()).await?;
    info!(
        addr = %config.server.addr,
        admin_path = %config.admin.at_rest_path,
        "reqtrail is ready, serving traffic"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("reqtrail stopped");
    Ok(())
}

/// Sink per config. A detached sink owns a worker thread; it is joined when
/// the last handle drops.
fn build_sink(cfg: &SinkConfig) -> anyhow::Result<Option<Arc<dyn EventSink>>> {
    let inline: Arc<dyn EventSink> = match cfg.kind {
        SinkKind::None => {
            info!("Event sink disabled, entries are only buffered");
            return Ok(None);
        }
        SinkKind::Tracing => Arc::new(TracingSink),
    };

    if !cfg.detached {
        return Ok(Some(inline));
    }
    let detached = ChannelSink::new(inline, cfg.channel_capacity)?;
    info!(capacity = cfg.channel_capacity, "Detached event sink started");
    Ok(Some(Arc::new(detached)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping...");
}
