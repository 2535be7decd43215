//! Route definitions for `/training-requests`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::training_requests;
use crate::state::AppState;

/// ```text
/// GET, POST  /                        -> list (?status=), create
/// GET        /{id}                    -> get
/// POST       /{id}/publish            -> PENDING -> PUBLISHED
/// POST       /{id}/cancel             -> PENDING | PUBLISHED -> CANCELED
/// POST       /{id}/join               -> join a published request
/// POST       /{id}/create-training    -> PUBLISHED -> TRAINING_CREATED
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(training_requests::list_requests).post(training_requests::create_request),
        )
        .route("/{id}", get(training_requests::get_request))
        .route("/{id}/publish", post(training_requests::publish_request))
        .route("/{id}/cancel", post(training_requests::cancel_request))
        .route("/{id}/join", post(training_requests::join_request))
        .route(
            "/{id}/create-training",
            post(training_requests::create_training_from_request),
        )
}
