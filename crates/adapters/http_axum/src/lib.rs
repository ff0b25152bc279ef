//! # hostd-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the lifecycle control surface:
//!   `/shutdown/{uuid}`, `/reset/{uuid}`, `/reboot/{uuid}` (any method)
//! - Map each request into one `DispatchService` call (driving adapter)
//! - Render the outcome as a plain-text body, `Success: ...` or `Error: ...`,
//!   always with `200 OK`
//! - Serve `/health` for liveness probes
//!
//! ## Dependency rule
//! Depends on `hostd-app` (for the port trait and the service) and
//! `hostd-domain` (for commands and errors). Never leaks axum types into the
//! domain.

pub mod api;
pub mod response;
pub mod router;
pub mod state;
