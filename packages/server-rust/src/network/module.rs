//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. Callers can read the bound
//! port between `start()` and `serve()`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    health_handler, liveness_handler, readiness_handler, thread_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::web::WebState;

/// Owns the listener and the router for one server process.
pub struct NetworkModule {
    config: NetworkConfig,
    web: WebState,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, web: WebState) -> Self {
        Self {
            config,
            web,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Shared shutdown controller, for health checks or triggering shutdown
    /// from outside the server.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready`
    /// - `GET /@{user}/{id}` and `GET /@{user}/statuses/{id}`
    /// - `/assets/*` from the configured assets directory, if any
    pub fn build_router(&self) -> Router {
        build_router(&self.config, &self.web, &self.shutdown)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains.
    ///
    /// When `shutdown` resolves the health state becomes Draining and new
    /// connections are refused. In-flight requests get `drain_timeout` to
    /// finish; after that their cancellation tokens fire.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// hits a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let shutdown_ctrl = self.shutdown;
        let config = self.config;

        let signal = {
            let ctrl = Arc::clone(&shutdown_ctrl);
            let drain_timeout = config.drain_timeout;
            async move {
                shutdown.await;
                ctrl.trigger_shutdown();
                tokio::spawn(drain(ctrl, drain_timeout));
            }
        };

        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = config.tls {
            serve_tls(listener, router, tls_config, signal).await?;
        } else {
            info!("Serving plain HTTP connections");
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await?;
        }

        // Every connection has closed; this only records the final state.
        shutdown_ctrl.wait_for_drain(config.drain_timeout).await;
        Ok(())
    }
}

fn build_router(
    config: &NetworkConfig,
    web: &WebState,
    shutdown: &Arc<ShutdownController>,
) -> Router {
    let state = AppState {
        web: web.clone(),
        shutdown: Arc::clone(shutdown),
        config: Arc::new(config.clone()),
        start_time: Instant::now(),
    };

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/{user}/{status_id}", get(thread_handler))
        .route("/{user}/statuses/{status_id}", get(thread_handler));

    if let Some(dir) = &web.config.assets_dir {
        router = router.nest_service(&web.config.assets_path_prefix, ServeDir::new(dir));
    }

    router.layer(build_http_layers(config)).with_state(state)
}

/// Serves TLS connections using `axum-server` with rustls.
///
/// Reuses the pre-bound TCP listener by converting it to a `std::net::TcpListener`.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

/// Cancels whatever is still in flight once `timeout` passes.
async fn drain(shutdown_ctrl: Arc<ShutdownController>, timeout: Duration) {
    let in_flight = shutdown_ctrl.in_flight_count();
    if in_flight > 0 {
        info!(in_flight, "Draining in-flight requests");
    }

    if shutdown_ctrl.wait_for_drain(timeout).await {
        info!("All requests drained");
    } else {
        warn!("Drain timeout expired; remaining requests were cancelled");
    }
}
