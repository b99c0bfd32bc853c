//! Route modules for Filedrop Server

pub mod files;
pub mod health;
pub mod metrics;
pub mod upload;

use axum::{
    http::{HeaderName, HeaderValue},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    request_context, ApiVersion, API_VERSION_HEADER, REQUEST_ID_HEADER, TRACEPARENT_HEADER,
};
use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let prefix = state.config().server.api_prefix.clone();
    let api_version = ApiVersion::new(&state.config().server.api_version);

    let api = Router::new()
        .route("/health", get(health::health_check))
        .nest("/upload", upload::router())
        .nest("/files", files::router())
        .nest("/metrics", metrics::router());

    let app = if prefix.is_empty() {
        api
    } else {
        Router::new()
            .route("/health", get(health::health_check))
            .nest(&prefix, api)
    };

    app.layer(middleware::from_fn_with_state(api_version, request_context))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config().server.frontend_origin))
        .with_state(state)
}

fn cors_layer(frontend_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(TRACEPARENT_HEADER),
            HeaderName::from_static(API_VERSION_HEADER),
        ]);

    if frontend_origin == "*" {
        return cors.allow_origin(Any);
    }

    match HeaderValue::from_str(frontend_origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %frontend_origin, "Invalid FRONTEND_ORIGIN, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}
