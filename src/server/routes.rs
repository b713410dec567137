//! Router configuration for the media manager.
//!
//! This module defines the HTTP routes and applies middleware for request
//! tokens, CORS and body size limits.
//!
//! # Route Structure
//!
//! ```text
//! /health                 - Health check (public)
//! /media/upload           - Multipart upload (token required)
//! /media/delete           - Delete files/folders (token required)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use media_manager::server::routes::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new("my-secret-key", "/var/tmp/media-staging")
//!     .with_cors_origins(vec!["https://admin.example.com".to_string()]);
//!
//! let router = create_router(controller, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{CONTENT_TYPE, HeaderName};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{token_middleware, RequestTokens, ACTOR_HEADER, TOKEN_HEADER};
use super::handlers::{
    delete_handler, health_handler, upload_handler, AppState, DEFAULT_REDIRECT_BASE,
};
use crate::controller::MediaController;
use crate::media::MediaStore;

/// Body cap for delete requests, which only carry form fields.
pub const DELETE_BODY_LIMIT: usize = 64 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret key for request tokens
    pub token_secret: String,

    /// Directory where upload parts are staged
    pub staging_dir: PathBuf,

    /// Path redirects point at when no return URL is given
    pub redirect_base: String,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum request body in bytes (None = unlimited)
    pub body_limit: Option<usize>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default CORS allows any origin, the body size is unlimited, and
    /// tracing is enabled.
    pub fn new(token_secret: impl Into<String>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            token_secret: token_secret.into(),
            staging_dir: staging_dir.into(),
            redirect_base: DEFAULT_REDIRECT_BASE.to_string(),
            cors_origins: None,
            body_limit: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_redirect_base(mut self, base: impl Into<String>) -> Self {
        self.redirect_base = base.into();
        self
    }

    /// Cap the request body; `0` leaves it unlimited.
    pub fn with_body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = match bytes {
            0 => None,
            n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        };
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Media routes sit behind [`token_middleware`]; `/health` is public. The
/// configured body limit applies to uploads; deletes are capped at
/// [`DELETE_BODY_LIMIT`].
pub fn create_router<St>(controller: MediaController<St>, config: RouterConfig) -> Router
where
    St: MediaStore + 'static,
{
    let app_state = AppState::new(controller, config.staging_dir.clone())
        .with_redirect_base(&config.redirect_base);
    let tokens = RequestTokens::new(&config.token_secret);
    let cors = build_cors_layer(&config);

    let upload_limit = match config.body_limit {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    // Token middleware is layered on the media routes only
    let media_routes = Router::new()
        .route("/upload", post(upload_handler::<St>).layer(upload_limit))
        .route(
            "/delete",
            post(delete_handler::<St>).layer(DefaultBodyLimit::max(DELETE_BODY_LIMIT)),
        )
        .layer(middleware::from_fn_with_state(tokens, token_middleware))
        .with_state(app_state.clone());

    let public_routes = Router::new()
        .route("/health", get(health_handler::<St>))
        .with_state(app_state);

    let router = Router::new()
        .nest("/media", media_routes)
        .merge(public_routes)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(TOKEN_HEADER),
            HeaderName::from_static(ACTOR_HEADER),
        ])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
