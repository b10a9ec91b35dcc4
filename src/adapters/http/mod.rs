pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState) -> Router {
    let static_dir = state.site.static_dir.clone();
    let max_upload = state.site.max_upload_bytes;

    Router::new()
        .route("/", get(routes::index))
        .route("/detect", post(routes::detect))
        .route("/api/config", get(routes::get_config))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
