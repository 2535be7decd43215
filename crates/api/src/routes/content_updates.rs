//! Route definitions for `/content-updates`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::content_updates;
use crate::state::AppState;

/// ```text
/// GET, POST  /                   -> list (?status=&data_id=), propose
/// GET        /{id}               -> get with field diff
/// POST       /{id}/approve       -> approve (admin)
/// POST       /{id}/reject        -> reject (admin)
/// POST       /{id}/undo-delete   -> restore a deleted record (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(content_updates::list).post(content_updates::propose),
        )
        .route("/{id}", get(content_updates::get))
        .route("/{id}/approve", post(content_updates::approve))
        .route("/{id}/reject", post(content_updates::reject))
        .route("/{id}/undo-delete", post(content_updates::undo_delete))
}
