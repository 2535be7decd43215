//! Route definitions for `/data` and `/data-fields`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::data;
use crate::state::AppState;

/// Routes mounted at `/data`.
///
/// ```text
/// GET    /               -> list (?org_unit_id=&data_type=&include_inactive=)
/// POST   /bulk-status    -> direct status write (admin)
/// GET    /{id}           -> get
/// POST   /{id}/sign      -> admin sign-off
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(data::list_records))
        .route("/bulk-status", post(data::update_bulk_status))
        .route("/{id}", get(data::get_record))
        .route("/{id}/sign", post(data::sign_record))
}

/// Routes mounted at `/data-fields`.
pub fn fields_router() -> Router<AppState> {
    Router::new().route("/", get(data::list_fields).post(data::create_field))
}
