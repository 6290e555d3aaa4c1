//! Serves thread pages for a small seeded in-memory instance.
//!
//! ```text
//! RUST_LOG=debug demo-server --port 8080 --token-secret dev
//! curl localhost:8080/@alice/01H9XKQ3Z8V4N6T2B5C7D9E1FG
//! curl -H 'Accept: application/activity+json' localhost:8080/@alice/01H9XKQ3Z8V4N6T2B5C7D9E1FG
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fedithread_server::auth::{issue_token, unix_now, BearerTokenResolver};
use fedithread_server::memory::fixtures;
use fedithread_server::{NetworkConfig, NetworkModule, WebConfig, WebState};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "demo-server", version)]
struct Args {
    /// Bind address.
    #[arg(long, env = "FEDITHREAD_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Listen port. 0 picks a free one.
    #[arg(long, env = "FEDITHREAD_PORT", default_value_t = 8080)]
    port: u16,

    /// Directory served under `/assets`.
    #[arg(long, env = "FEDITHREAD_ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// Link each account's own stylesheet from its pages.
    #[arg(long)]
    custom_css: bool,

    /// HS256 secret for bearer tokens. Without it every request is anonymous
    /// and presented tokens are rejected.
    #[arg(long, env = "FEDITHREAD_TOKEN_SECRET")]
    token_secret: Option<String>,

    /// Address for the Prometheus scrape endpoint.
    #[arg(long, env = "FEDITHREAD_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, default_value_t = 30)]
    drain_timeout_secs: u64,

    /// Log as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json)?;

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!(%addr, "Prometheus exporter listening");
    }

    let store = Arc::new(fixtures::seeded_store());
    let secret = args.token_secret.as_deref().map(str::as_bytes);
    let identity = Arc::new(BearerTokenResolver::new(secret, store.clone()));

    if let Some(secret) = secret {
        let token = issue_token(secret, "alice", unix_now() + 24 * 3600)?;
        info!(%token, "bearer token for @alice, valid 24h");
    }

    let web_config = WebConfig {
        assets_dir: args.assets_dir,
        accounts_allow_custom_css: args.custom_css,
        ..WebConfig::default()
    };
    let web = WebState::from_store(store, identity, web_config);

    let network_config = NetworkConfig {
        host: args.host,
        port: args.port,
        drain_timeout: Duration::from_secs(args.drain_timeout_secs),
        ..NetworkConfig::default()
    };

    let mut module = NetworkModule::new(network_config, web);
    let port = module.start().await?;
    info!(port, root = fixtures::ROOT_ID, "demo instance ready");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, shutting down");
        })
        .await
}
