use crate::config::Config;
use crate::streaming::InfoClient;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tubeforged_av::{resolve_tool_path, InfoExtractor, YtDlpExtractor};

pub mod error;
pub mod routes_download;
pub mod routes_info;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Metadata extractor behind the info route
    pub extractor: Arc<dyn InfoExtractor>,
    /// Client the download route uses to call the info route
    pub resolver: InfoClient,
    /// Transcoder binary
    pub ffmpeg: PathBuf,
}

impl AppContext {
    /// Build a context around an existing extractor.
    ///
    /// `self_url` is the base URL the download route uses to reach this
    /// server's info route.
    pub fn new(config: Config, extractor: Arc<dyn InfoExtractor>, self_url: &str) -> Self {
        let ffmpeg = resolve_tool_path("ffmpeg", config.tools.ffmpeg_path.as_deref());
        Self {
            resolver: InfoClient::new(reqwest::Client::new(), self_url),
            config: Arc::new(config),
            extractor,
            ffmpeg,
        }
    }

    /// Build a context with the yt-dlp extractor described by `config`.
    pub fn from_config(config: Config, self_url: &str) -> Self {
        let ytdlp = resolve_tool_path("yt-dlp", config.tools.ytdlp_path.as_deref());
        let extractor = YtDlpExtractor::new(ytdlp, config.extractor.ytdlp_options());
        Self::new(config, Arc::new(extractor), self_url)
    }

    /// The requested format selector, or the configured default when absent
    /// or blank.
    pub fn format_or_default(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(self.config.extractor.default_format.as_str())
            .to_string()
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .expose_headers([header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/health", get(health_check))
        .merge(media_routes())
        // Same routes under /api for deployments that proxy by prefix
        .nest("/api", media_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn media_routes() -> Router<AppContext> {
    Router::new()
        .route("/info", get(routes_info::get_info))
        .route("/download", get(routes_download::get_download))
        .route("/version", get(routes_info::get_version))
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Base URL for reaching a server bound to `addr` from the same host.
pub fn local_base_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr()?;

    let self_url = config
        .server
        .self_url
        .clone()
        .unwrap_or_else(|| local_base_url(local));

    let ctx = AppContext::from_config(config, &self_url);
    tracing::info!(
        extractor = ctx.extractor.name(),
        ffmpeg = %ctx.ffmpeg.display(),
        %self_url,
        "Starting server on {}",
        local
    );

    serve(listener, ctx).await
}

/// Serve `ctx` on an already bound listener until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, ctx: AppContext) -> Result<()> {
    let app = create_router(ctx);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
