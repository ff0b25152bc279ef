//! Management session port — the single connection to the hypervisor.

use std::future::Future;

use hostd_domain::command::LifecycleCommand;
use hostd_domain::error::HostdError;
use hostd_domain::record::{DomainHandle, DomainRecord};

/// A connected, handshaken session with the hypervisor management endpoint.
///
/// Implementations are shared by every in-flight request, so they must
/// serialize calls on their connection themselves. A value of this type only
/// exists once the handshake has completed.
pub trait ManagementSession: Send + Sync {
    /// List the currently active domains, in the order the hypervisor reports them.
    fn list_active_domains(
        &self,
    ) -> impl Future<Output = Result<Vec<DomainRecord>, HostdError>> + Send;

    /// Issue exactly one lifecycle call against `domain`.
    fn execute(
        &self,
        command: LifecycleCommand,
        domain: &DomainHandle,
    ) -> impl Future<Output = Result<(), HostdError>> + Send;
}
