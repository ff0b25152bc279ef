//! Plain-text response mapping.
//!
//! Every lifecycle request answers `200 OK`; the outcome is carried only by
//! the body prefix.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use hostd_domain::command::LifecycleCommand;
use hostd_domain::error::HostdError;

/// Outcome of one lifecycle request.
#[derive(Debug)]
pub enum CommandResponse {
    Success(LifecycleCommand),
    Failure(HostdError),
}

impl CommandResponse {
    /// Text sent to the caller.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::Success(command) => format!("Success: {}", command.confirmation()),
            Self::Failure(err) => format!("Error: {err}"),
        }
    }
}

impl From<Result<LifecycleCommand, HostdError>> for CommandResponse {
    fn from(result: Result<LifecycleCommand, HostdError>) -> Self {
        match result {
            Ok(command) => Self::Success(command),
            Err(err) => Self::Failure(err),
        }
    }
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}
