//! Shared application state for axum handlers.

use std::sync::Arc;

use hostd_app::ports::ManagementSession;
use hostd_app::services::dispatch_service::DispatchService;

/// Application state shared across all axum handlers.
///
/// Generic over the session type to avoid dynamic dispatch. `Clone` is
/// implemented manually so the session itself does not need to be `Clone`;
/// only the `Arc` is cloned.
pub struct AppState<S> {
    /// Identifier resolution and lifecycle dispatch.
    pub dispatch_service: Arc<DispatchService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            dispatch_service: Arc::clone(&self.dispatch_service),
        }
    }
}

impl<S> AppState<S>
where
    S: ManagementSession + 'static,
{
    /// Create a new application state from a service instance.
    pub fn new(dispatch_service: DispatchService<S>) -> Self {
        Self::from_arc(Arc::new(dispatch_service))
    }

    /// Create a new application state from a pre-wrapped service.
    ///
    /// Use this when the composition root keeps its own handle, e.g. to
    /// close the session after the server stops.
    pub fn from_arc(dispatch_service: Arc<DispatchService<S>>) -> Self {
        Self { dispatch_service }
    }
}
