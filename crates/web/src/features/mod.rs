use axum::{Router, extract::DefaultBodyLimit};

use crate::middleware::auth::ApiKeys;
use crate::state::AppState;

pub mod events;
pub mod health;

/// Every API route, without docs or transport layers.
pub fn router(state: AppState, api_keys: ApiKeys) -> Router {
    let body_limit = DefaultBodyLimit::max(state.uploads.max_bytes);

    Router::new()
        .nest("/api/events", events::routes::routes(api_keys))
        .merge(health::routes())
        .layer(body_limit)
        .with_state(state)
}
