use std::path::Path;

use axum::{Router, http::Method, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::catalog;
use crate::handler::{AppState, healthcheck};
use crate::resource;

/// Every catalog resource mounted at its path, plus `/health`.
pub fn api_routes() -> Router<AppState> {
    catalog::ALL.iter().copied().fold(
        Router::new().route("/health", get(healthcheck)),
        |router, descriptor| router.nest(&format!("/{}", descriptor.path), resource::routes(descriptor)),
    )
}

/// The full application: `/api` plus, when `static_dir` is given, the
/// frontend bundle with `index.html` as the SPA fallback.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let router = Router::new().nest("/api", api_routes());

    let router = match static_dir {
        Some(dir) => {
            tracing::info!(dir = ?dir, "serving frontend");
            let index = ServeFile::new(dir.join("index.html"));
            router.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => router,
    };

    router.layer(cors).with_state(state)
}
