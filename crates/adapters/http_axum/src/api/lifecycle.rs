//! Handlers for `/shutdown/{uuid}`, `/reset/{uuid}`, and `/reboot/{uuid}`.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};

use hostd_app::ports::ManagementSession;
use hostd_domain::command::LifecycleCommand;
use hostd_domain::error::ResolutionError;

use crate::response::CommandResponse;
use crate::state::AppState;

async fn run<S>(
    state: &AppState<S>,
    command: LifecycleCommand,
    path: Result<Path<String>, PathRejection>,
) -> CommandResponse
where
    S: ManagementSession + 'static,
{
    // An identifier that does not even decode cannot name any domain.
    let uuid = match path {
        Ok(Path(uuid)) => uuid,
        Err(rejection) => {
            tracing::warn!(%command, error = %rejection, "could not resolve target");
            return CommandResponse::Failure(ResolutionError::NotFound.into());
        }
    };
    let uuid = uuid.as_str();
    let result = state.dispatch_service.dispatch(command, uuid).await;
    match &result {
        Ok(()) => tracing::info!(%command, uuid, "lifecycle command complete"),
        Err(err) if err.is_resolution() => {
            tracing::warn!(%command, uuid, error = %err, "could not resolve target");
        }
        Err(err) => tracing::warn!(%command, uuid, error = %err, "lifecycle command failed"),
    }
    result.map(|()| command).into()
}

/// `ANY /shutdown/{uuid}`
pub async fn shutdown<S>(
    State(state): State<AppState<S>>,
    path: Result<Path<String>, PathRejection>,
) -> CommandResponse
where
    S: ManagementSession + 'static,
{
    run(&state, LifecycleCommand::Shutdown, path).await
}

/// `ANY /reset/{uuid}`
pub async fn reset<S>(
    State(state): State<AppState<S>>,
    path: Result<Path<String>, PathRejection>,
) -> CommandResponse
where
    S: ManagementSession + 'static,
{
    run(&state, LifecycleCommand::Reset, path).await
}

/// `ANY /reboot/{uuid}`
pub async fn reboot<S>(
    State(state): State<AppState<S>>,
    path: Result<Path<String>, PathRejection>,
) -> CommandResponse
where
    S: ManagementSession + 'static,
{
    run(&state, LifecycleCommand::Reboot, path).await
}
