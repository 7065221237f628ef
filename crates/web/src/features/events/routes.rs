use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};

use super::handlers::{
    create_event, delete_event, get_comparison, get_event, get_event_by_slug, list_events,
    list_participants, update_event, update_image, update_status, upload_event_results,
    upload_results,
};
use crate::middleware::auth::{ApiKeys, identify_caller, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/create", post(create_event))
        .route("/upload", post(upload_results))
        .route("/:event", put(update_event))
        .route("/:event", delete(delete_event))
        .route("/:event/status", patch(update_status))
        .route("/:event/image", patch(update_image))
        .route("/:event/upload", post(upload_event_results))
        .route_layer(middleware::from_fn_with_state(api_keys.clone(), require_auth));

    Router::new()
        .route("/", get(list_events))
        .route("/slug/:slug", get(get_event_by_slug))
        .route("/:event", get(get_event))
        .route("/:event/participants", get(list_participants))
        .route("/:event/participants/comparison", get(get_comparison))
        .route_layer(middleware::from_fn_with_state(api_keys, identify_caller))
        .merge(protected)
}
