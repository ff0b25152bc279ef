//! Lifecycle control routes.

pub mod lifecycle;

use axum::Router;
use axum::routing::any;

use hostd_app::ports::ManagementSession;

use crate::state::AppState;

/// Build the lifecycle sub-router. Each route accepts any method.
pub fn routes<S>() -> Router<AppState<S>>
where
    S: ManagementSession + 'static,
{
    Router::new()
        .route("/shutdown/{uuid}", any(lifecycle::shutdown::<S>))
        .route("/reset/{uuid}", any(lifecycle::reset::<S>))
        .route("/reboot/{uuid}", any(lifecycle::reboot::<S>))
}
