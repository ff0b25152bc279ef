//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use hostd_app::ports::ManagementSession;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Merges the lifecycle routes with `/health`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<S>(state: AppState<S>) -> Router
where
    S: ManagementSession + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .merge(crate::api::routes::<S>())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
