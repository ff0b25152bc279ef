//! Domain record — a snapshot of one active domain taken during resolution.

use crate::id::DomainUuid;

/// How the management endpoint addresses a domain.
///
/// Opaque to everything but the session adapter that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainHandle {
    /// Hypervisor-assigned domain name.
    pub name: String,
    /// Canonical identifier.
    pub uuid: DomainUuid,
    /// Runtime id (`-1` when the hypervisor reports none).
    pub id: i32,
}

/// An active domain as returned by one listing call.
///
/// Valid only for the request that fetched it; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub uuid: DomainUuid,
    pub handle: DomainHandle,
}

impl DomainRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: DomainUuid, id: i32) -> Self {
        Self {
            uuid,
            handle: DomainHandle {
                name: name.into(),
                uuid,
                id,
            },
        }
    }
}
