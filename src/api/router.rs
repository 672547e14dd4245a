//! HTTP API router.
//!
//! Returns a composable `Router` with every route under `/api/`, plus an
//! optional static directory served at `/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS + security headers → 2. Body limit → 3. Rate limiter →
//! 4. Auth validator → 5. Audit logger

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::{Config, DEFAULT_ALLOWED_ORIGINS, MAX_BODY_BYTES};
use crate::core_state::CoreState;

/// Router settings that come from configuration rather than state.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            static_dir: None,
        }
    }
}

impl From<&Config> for HttpOptions {
    fn from(config: &Config) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            static_dir: config.static_dir.clone(),
        }
    }
}

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost API layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>, options: &HttpOptions) -> Router {
    build_router(ApiContext::new(core), options)
}

/// Build router from a pre-constructed `ApiContext`.
pub(crate) fn build_router(ctx: ApiContext, options: &HttpOptions) -> Router {
    // Protected routes: auth + audit, innermost first.
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/validate-token", get(endpoints::auth::validate_token))
        .route(
            "/patients",
            post(endpoints::patients::create).get(endpoints::patients::list),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::remove),
        )
        .route(
            "/appointments",
            post(endpoints::appointments::create).get(endpoints::appointments::list),
        )
        .route("/appointments/:id", put(endpoints::appointments::update))
        .route(
            "/reports",
            post(endpoints::reports::create).get(endpoints::reports::list),
        )
        .route(
            "/payments",
            post(endpoints::payments::create).get(endpoints::payments::list),
        )
        .route(
            "/accounts",
            post(endpoints::accounts::provision).get(endpoints::accounts::list),
        )
        .route(
            "/accounts/:identifier/deactivate",
            post(endpoints::accounts::deactivate),
        )
        .route("/audit", get(endpoints::audit::recent))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    // Unprotected routes (rate-limited only)
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/login", post(endpoints::auth::login))
        .with_state(ctx.clone());

    let api = Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx));

    let mut app = Router::new().nest("/api", api);
    if let Some(dir) = &options.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(cors_layer(&options.allowed_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            _ if origin == "*" => {
                tracing::warn!("Ignoring wildcard CORS origin");
                None
            }
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
