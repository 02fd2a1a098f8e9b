pub mod auth;
pub mod feed;
pub mod posts;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

// Room for the text fields next to a handful of full-size images.
const MAX_IMAGES_PER_POST: usize = 4;
const FORM_OVERHEAD_BYTES: usize = 1 << 20;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let max_upload_bytes =
        state.config.content.max_image_bytes * MAX_IMAGES_PER_POST + FORM_OVERHEAD_BYTES;

    Router::new()
        .merge(feed::router())
        .merge(auth::router())
        .merge(posts::router(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
