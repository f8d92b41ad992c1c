use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::proxy::config::ProxyConfig;
use crate::proxy::credential_cache::CredentialCache;
use crate::proxy::handlers;
use crate::proxy::store::{CredentialStore, RestCredentialStore};
use crate::proxy::upstream::UpstreamClient;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    /// `None` when no credential store is configured; tenant routes answer 503
    pub credentials: Option<Arc<CredentialCache>>,
    pub upstream: Arc<UpstreamClient>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(credentials: Option<Arc<CredentialCache>>, upstream: Arc<UpstreamClient>) -> Self {
        Self {
            credentials,
            upstream,
            started_at: Instant::now(),
        }
    }

    /// State with an injected store, used by tests and embedders.
    pub fn with_store(
        store: Arc<dyn CredentialStore>,
        upstream: UpstreamClient,
        config: &ProxyConfig,
    ) -> Self {
        let cache = CredentialCache::new(store, config.cache_ttl());
        Self::new(Some(Arc::new(cache)), Arc::new(upstream))
    }

    /// Production wiring: one pooled HTTP client shared by the store and the upstream.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, String> {
        let http_client = UpstreamClient::build_http_client(config.connect_timeout())
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        let upstream = UpstreamClient::with_client(http_client.clone(), config.upstream_base_url.clone());

        let credentials = config.credential_store().map(|store_config| {
            let store: Arc<dyn CredentialStore> =
                Arc::new(RestCredentialStore::new(http_client, store_config));
            Arc::new(CredentialCache::new(store, config.cache_ttl()))
        });

        Ok(Self::new(credentials, Arc::new(upstream)))
    }

    pub fn credential_store_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

pub fn build_router(state: AppState, config: &ProxyConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health::handle_health))
        .route(
            "/api/get-inspections",
            get(handlers::inspections::handle_get_inspections),
        )
        .route(
            "/api/upload-video/presigned",
            post(handlers::media::handle_presigned_upload),
        )
        .route(
            "/api/update-inspection-item",
            post(handlers::tasks::handle_update_task),
        )
        .route("/api/tm", any(handlers::passthrough::handle_passthrough))
        .route("/api/tm/*rest", any(handlers::passthrough::handle_passthrough))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handlers::panic_response))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(crate::proxy::middleware::cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: SocketAddr,
}

impl AxumServer {
    /// Start Axum server. Port `0` picks a free port; see [`AxumServer::local_addr`].
    pub async fn start(
        host: String,
        port: u16,
        state: AppState,
        config: &ProxyConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let app = build_router(state, config);

        // Bind address
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind address {}: {}", addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        tracing::info!("Reverse proxy server started at http://{}", local_addr);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
            local_addr,
        };

        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling ended or error: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Reverse proxy server stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections. In-flight requests finish on their own tasks.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
