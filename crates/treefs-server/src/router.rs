use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use treefs::FileSystem;

use crate::config::ServerConfig;
use crate::handler::{self, AppState};

/// Build the axum router serving every path of `fs`.
pub fn build_router(fs: Arc<dyn FileSystem>, config: ServerConfig) -> Router {
    Router::new()
        .route("/", get(handler::serve_root))
        .route("/*path", get(handler::serve_path))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(fs, config))
}
