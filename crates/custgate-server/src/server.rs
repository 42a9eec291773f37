use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use cookie::Key;
use custgate_cache::{QueryCache, SqliteQueryCache};
use custgate_remote::{RemoteConnector, erply::ErplyConnector};
use tower_http::trace::TraceLayer;

use crate::{
    config::AppConfig, gateway::Gateway, handlers, middleware as app_middleware,
    session::SessionCookie,
};

/// State shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub cookie: SessionCookie,
}

impl FromRef<AppState> for Arc<Gateway> {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl FromRef<AppState> for SessionCookie {
    fn from_ref(state: &AppState) -> Self {
        state.cookie.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie.key().clone()
    }
}

pub struct CustgateServer {
    addr: SocketAddr,
    app: Router,
    gateway: Arc<Gateway>,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        // Session creation; the only route that does not revalidate
        .route("/auth", post(handlers::authenticate))
        .route("/read", get(handlers::read_customers))
        .route("/write", post(handlers::write_customer))
        .with_state(state)
        // Middleware stack (order: request id -> trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// Assembles the gateway from configuration.
///
/// The remote connector and the cache default to the Erply client and the
/// SQLite store described by the configuration; either can be replaced.
pub struct ServerBuilder {
    config: AppConfig,
    connector: Option<Arc<dyn RemoteConnector>>,
    cache: Option<Arc<dyn QueryCache>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            connector: None,
            cache: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn build(self) -> anyhow::Result<CustgateServer> {
        let cfg = self.config;

        let connector = match self.connector {
            Some(connector) => connector,
            None => Arc::new(
                ErplyConnector::new(cfg.remote.settings())
                    .context("failed to build remote client")?,
            ),
        };

        let cache = match self.cache {
            Some(cache) => cache,
            None => {
                let cache = SqliteQueryCache::connect(&cfg.cache.settings())
                    .await
                    .with_context(|| format!("failed to open query cache at {}", cfg.cache.url))?;
                tracing::info!(url = %cfg.cache.url, "Query cache ready");
                Arc::new(cache)
            }
        };

        let cookie = SessionCookie::from_config(&cfg.session)
            .map_err(|e| anyhow::anyhow!("invalid session.cookie_secret: {e}"))?;

        let gateway = Arc::new(Gateway::new(
            connector,
            cache,
            cfg.session.validation_timeout(),
        ));
        let state = AppState {
            gateway: gateway.clone(),
            cookie,
        };

        Ok(CustgateServer {
            addr: cfg.addr(),
            app: build_app(state, &cfg),
            gateway,
        })
    }
}

impl CustgateServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Serve until a shutdown signal, then tear the gateway down.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        self.gateway.teardown().await;
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
