use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK};
use axum::http::{request, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    health_handler, index_handler, ping_handler, redirect_handler, shorten_handler,
    stats_handler,
};
use crate::state::AppState;

const CORS_MAX_AGE: Duration = Duration::from_secs(300);

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/ping", get(ping_handler))
            .route("/health", get(health_handler))
            .route("/shorten", post(shorten_handler))
            .route("/stats/{code}", get(stats_handler))
            .route("/{code}", get(redirect_handler))
            .layer(TraceLayer::new_for_http())
            .layer(Self::cors())
            .with_state(state)
    }

    /// Any `http://` or `https://` origin, with credentials.
    pub fn cors() -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                |origin: &HeaderValue, _: &request::Parts| {
                    let origin = origin.as_bytes();
                    origin.starts_with(b"http://") || origin.starts_with(b"https://")
                },
            ))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                ACCEPT,
                AUTHORIZATION,
                CONTENT_TYPE,
                HeaderName::from_static("x-csrf-token"),
            ])
            .expose_headers([LINK])
            .allow_credentials(true)
            .max_age(CORS_MAX_AGE)
    }
}
