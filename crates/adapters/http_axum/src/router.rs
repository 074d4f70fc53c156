//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, Ports};

/// Build the top-level axum [`Router`].
///
/// Mounts the JSON API under `/api` next to a `/health` check. A
/// [`TraceLayer`] logs each request/response at the `DEBUG` level.
pub fn build<P: Ports>(state: AppState<P>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
