//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HostdError`]
//! via `From`. Display strings are shown to HTTP callers verbatim, so they
//! carry the underlying description rather than a generic label.

/// Boxed error raised by a management session adapter.
pub type SessionError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for every use-case.
#[derive(Debug, thiserror::Error)]
pub enum HostdError {
    /// The caller's identifier could not be resolved to an active domain.
    #[error("(query) {0}")]
    Resolution(#[from] ResolutionError),

    /// The management session failed or rejected the call.
    #[error(transparent)]
    Session(SessionError),
}

impl HostdError {
    /// Whether this failure happened while resolving the target.
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

/// Why an identifier did not resolve.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// No active domain carries the requested identifier.
    #[error("unable to find VM")]
    NotFound,

    /// The listing held more domains than the configured limit.
    #[error("active domain listing holds {count} domains, more than the limit of {limit}")]
    ListingOverflow { count: usize, limit: usize },

    /// The active-domain listing itself failed.
    #[error("failed to retrieve domains: {0}")]
    Listing(#[source] Box<HostdError>),
}
