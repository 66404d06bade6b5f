use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use apphash::cache::VersionCache;
use apphash::config::{
    DEFAULT_FALLBACK_ENGINE_VERSION, DEFAULT_REFRESH_INTERVAL_MIN, DEFAULT_REQUEST_TIMEOUT_SECS,
    Settings, parse_region_list,
};
use apphash::server::{self, AppState};
use apphash::updater::Updater;

#[derive(Parser)]
#[command(name = "apphash")]
#[command(version, about = "Storefront version tracker and build-metadata extractor")]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the tracker and its API server (the default)
    Serve,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address
    #[arg(long, env = "APPHASH_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "APPHASH_PORT", default_value_t = 8000)]
    port: u16,

    /// Minutes between scheduled refresh cycles
    #[arg(long, env = "APPHASH_REFRESH_INTERVAL_MINUTES", default_value_t = DEFAULT_REFRESH_INTERVAL_MIN)]
    refresh_interval_minutes: u64,

    /// Per-request network timeout in seconds
    #[arg(long, env = "APPHASH_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// API key for /admin/refresh; empty disables the endpoint
    #[arg(long, env = "APPHASH_ADMIN_API_KEY", default_value = "")]
    admin_api_key: String,

    /// Proxy for all storefront and download traffic
    #[arg(long, env = "APPHASH_HTTP_PROXY")]
    http_proxy: Option<String>,

    /// Comma-separated region list
    #[arg(long, env = "APPHASH_ENABLED_REGIONS", default_value = "JP,EN,TW,KR,CN")]
    enabled_regions: String,

    /// Engine version assumed for bundles with a stripped authoring version
    #[arg(long, env = "APPHASH_FALLBACK_ENGINE_VERSION", default_value = DEFAULT_FALLBACK_ENGINE_VERSION)]
    fallback_engine_version: String,
}

impl ServeArgs {
    fn into_settings(self) -> anyhow::Result<Settings> {
        let enabled_regions = parse_region_list(&self.enabled_regions)?;
        Ok(Settings {
            host: self.host,
            port: self.port,
            refresh_interval: Duration::from_secs(self.refresh_interval_minutes * 60),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            admin_api_key: self.admin_api_key,
            http_proxy: self.http_proxy,
            enabled_regions,
            fallback_engine_version: self.fallback_engine_version,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.serve.into_settings()?;

    match cli.command {
        None | Some(Command::Serve) => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run(settings)),
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cache = Arc::new(VersionCache::new());
    let updater = Arc::new(Updater::from_settings(&settings, cache)?);

    let cancel = CancellationToken::new();
    let scheduler = tokio::spawn({
        let updater = updater.clone();
        let cancel = cancel.clone();
        let interval = settings.refresh_interval;
        async move { updater.run_scheduler(interval, cancel).await }
    });
    info!("Scheduler started (every {:?})", settings.refresh_interval);

    let addr = format!("{}:{}", settings.host, settings.port);
    let state = Arc::new(AppState { updater, settings });
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    let _ = scheduler.await;
    Ok(())
}

/// Resolves on ctrl-c and cancels the scheduler alongside the server.
async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
    cancel.cancel();
}
