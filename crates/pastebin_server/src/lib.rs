//! HTTP server wiring for the pastebin (API, handlers, and shared state).

/// HTTP error mapping for API handlers.
pub mod error;
/// HTTP handlers for paste endpoints.
pub mod handlers;

pub use pastebin_core::{
    config, models, open_store, AppError, Config, Pastebin, PasteStore, ViewCounter,
    DEFAULT_PORT,
};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use handlers::normalize::SESSION_TOKEN_HEADER;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Request bodies up to this size reach the core, which truncates oversized
/// content instead of rejecting it.
pub const MIN_REQUEST_BODY_LIMIT: usize = 16 * 1024 * 1024;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'; base-uri 'self'; form-action 'self'";

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub pastebin: Pastebin,
    pub views: Arc<ViewCounter>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Construct shared application state over an open store.
    pub fn new(config: Config, store: Arc<dyn PasteStore>) -> Self {
        let pastebin = Pastebin::from_config(store, &config);
        Self::with_pastebin(config, pastebin)
    }

    /// Construct shared application state around a pre-built service.
    ///
    /// Tests use this to inject a manual clock.
    pub fn with_pastebin(config: Config, pastebin: Pastebin) -> Self {
        Self {
            views: Arc::new(ViewCounter::new(pastebin.clone())),
            pastebin,
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
pub fn create_app(state: AppState, allow_public_access: bool) -> Router {
    let cors_port = state.config.port;
    create_app_with_cors_port(state, allow_public_access, cors_port)
}

/// Resolve the listener address from the `BIND` override and security policy.
pub fn resolve_bind_address(config: &Config, allow_public_access: bool) -> SocketAddr {
    resolve_bind_address_from(
        std::env::var("BIND").ok().as_deref(),
        config.port,
        allow_public_access,
    )
}

/// Loopback is enforced unless public access is allowed.
fn resolve_bind_address_from(
    requested: Option<&str>,
    port: u16,
    allow_public_access: bool,
) -> SocketAddr {
    let default_bind = SocketAddr::from(([127, 0, 0, 1], port));
    let requested = match requested {
        Some(value) => match value.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    "Invalid BIND='{}': {}. Falling back to {}",
                    value,
                    err,
                    default_bind
                );
                default_bind
            }
        },
        None => default_bind,
    };

    if allow_public_access || requested.ip().is_loopback() {
        return requested;
    }

    tracing::warn!(
        "Non-loopback bind {} requested without ALLOW_PUBLIC_ACCESS; forcing 127.0.0.1",
        requested
    );
    SocketAddr::from(([127, 0, 0, 1], requested.port()))
}

fn cors_layer(allow_public_access: bool, cors_port: u16) -> CorsLayer {
    let methods = [Method::GET, Method::POST];
    if allow_public_access {
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any);
    }

    let origins: Vec<HeaderValue> = [
        format!("http://localhost:{}", cors_port),
        format!("http://127.0.0.1:{}", cors_port),
    ]
    .iter()
    .filter_map(|origin| HeaderValue::from_str(origin).ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(SESSION_TOKEN_HEADER),
        ])
}

fn create_app_with_cors_port(state: AppState, allow_public_access: bool, cors_port: u16) -> Router {
    // JSON escaping can inflate the body well past the content bound.
    let body_limit = state
        .config
        .max_paste_size
        .saturating_mul(4)
        .max(MIN_REQUEST_BODY_LIMIT);

    Router::new()
        .route(
            "/api/pastes",
            post(handlers::paste::create_paste).get(handlers::paste::list_recent),
        )
        .route("/api/pastes/search", get(handlers::paste::search_pastes))
        .route("/api/pastes/:id", get(handlers::paste::get_paste))
        .route("/api/pastes/:id/raw", get(handlers::paste::get_raw))
        .route(
            "/api/pastes/:id/increment-view",
            post(handlers::paste::increment_view),
        )
        .with_state(state)
        .layer(
            tower::ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(allow_public_access, cors_port))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static(CONTENT_SECURITY_POLICY),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
}

fn listener_cors_port(listener: &tokio::net::TcpListener, fallback_port: u16) -> u16 {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(fallback_port)
}

/// Spawn the periodic expiry sweep.
///
/// The first sweep runs one full `interval` after startup. Failures are logged
/// and the loop keeps going.
pub fn spawn_sweep_task(pastebin: Pastebin, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let pastebin = pastebin.clone();
            match tokio::task::spawn_blocking(move || pastebin.sweep_expired()).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => tracing::warn!("Expiry sweep failed: {}", err),
                Err(err) => tracing::warn!("Expiry sweep task panicked: {}", err),
            }
        }
    })
}

/// Run the Axum server with graceful shutdown support.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    allow_public_access: bool,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let cors_port = listener_cors_port(&listener, state.config.port);
    let app = create_app_with_cors_port(state, allow_public_access, cors_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}
