//! Route definitions for `/org-units`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::org_units;
use crate::state::AppState;

/// Static segments are registered alongside `/{id}`; the router prefers
/// them over the capture.
///
/// ```text
/// GET, POST          /            -> list, create (admin)
/// GET                /children    -> units plus descendants (?ids=)
/// GET                /graph       -> units plus ancestors and descendants (?ids=)
/// GET                /reachable   -> units reachable through active units
/// POST               /recount     -> rewrite all counters (admin)
/// GET, POST          /types       -> list, create unit types
/// GET, PUT, DELETE   /{id}        -> get, update, deactivate (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(org_units::list_org_units).post(org_units::create_org_unit),
        )
        .route("/children", get(org_units::get_with_children))
        .route("/graph", get(org_units::get_with_graph))
        .route("/reachable", get(org_units::list_reachable))
        .route("/recount", post(org_units::recount))
        .route(
            "/types",
            get(org_units::list_types).post(org_units::create_type),
        )
        .route(
            "/{id}",
            get(org_units::get_org_unit)
                .put(org_units::update_org_unit)
                .delete(org_units::deactivate_org_unit),
        )
}
