use crate::config::VideoProxyConfig;
use crate::handlers::{generate::MAX_REQUEST_BYTES, generate_video, health_check, metrics, ping};
use crate::services::GenerationProxy;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use proxy_core::error::AppError;
use proxy_core::middleware::{
    metrics::metrics_middleware, panic::catch_panic_layer, tracing::request_id_middleware,
    tracing::trace_layer,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

/// Routes, then static assets for everything else.
///
/// Layer order, innermost first: panic capture, metrics, trace span, request
/// id, CORS. The request id therefore exists before the span is created.
pub fn build_router(state: AppState) -> Router {
    let assets = &state.config.assets;

    let router = Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route(
            "/generate",
            post(generate_video).layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES)),
        );

    let router = if assets.spa_fallback {
        router.fallback_service(
            ServeDir::new(&assets.static_dir).fallback(ServeFile::new(assets.index_file())),
        )
    } else {
        router.fallback_service(ServeDir::new(&assets.static_dir))
    };

    router
        .layer(catch_panic_layer())
        .layer(from_fn(metrics_middleware))
        .layer(trace_layer())
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Bind the listener and assemble the router. Port 0 picks a free port,
    /// readable through [`Application::port`].
    pub async fn build(config: VideoProxyConfig) -> Result<Self, AppError> {
        let proxy = GenerationProxy::new(config.provider.clone())?;

        if proxy.is_configured() {
            tracing::info!(
                provider_url = config.provider.url.as_deref().unwrap_or("-"),
                auth_scheme = ?config.provider.auth_scheme,
                binary_policy = ?config.provider.binary_policy,
                timeout_secs = config.provider.timeout.as_secs(),
                "Video provider configured"
            );
        } else {
            tracing::warn!(
                "Provider key or URL not configured - /generate will report a misconfiguration"
            );
        }

        if !config.assets.index_file().is_file() {
            tracing::warn!(
                static_dir = %config.assets.static_dir.display(),
                "No index.html in static directory"
            );
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            e
        })?;
        let port = listener.local_addr()?.port();

        let router = build_router(AppState::new(config, proxy));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        tracing::info!("Listening on port {}", self.port);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
