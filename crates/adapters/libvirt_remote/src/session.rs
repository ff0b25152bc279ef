//! The management session: one handshaken connection shared by every request.
//!
//! The connection is owned by a dedicated task. Callers queue requests on a
//! channel and wait for their reply on a oneshot, so exchanges are strictly
//! sequential and a caller that goes away mid-call cannot leave a partial
//! frame on the wire.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use hostd_app::ports::ManagementSession;
use hostd_domain::command::LifecycleCommand;
use hostd_domain::error::HostdError;
use hostd_domain::record::{DomainHandle, DomainRecord};

use crate::config::LibvirtConfig;
use crate::connection::Connection;
use crate::error::LibvirtError;
use crate::protocol::{self, LIST_DOMAINS_ACTIVE, LibVersion, Procedure, RemoteDomain};

struct Request {
    procedure: Procedure,
    args: Bytes,
    reply: oneshot::Sender<Result<Bytes, LibvirtError>>,
}

/// A connected libvirt session implementing [`ManagementSession`].
pub struct RemoteSession {
    requests: mpsc::Sender<Request>,
    worker: Mutex<Option<JoinHandle<()>>>,
    remote_addr: SocketAddr,
    lib_version: LibVersion,
}

impl RemoteSession {
    /// Dial libvirtd, open the connection, and read its library version.
    ///
    /// # Errors
    ///
    /// Returns [`LibvirtError`] if the dial times out or fails, or if the
    /// daemon rejects the handshake.
    pub async fn connect(config: &LibvirtConfig) -> Result<Self, LibvirtError> {
        let mut connection = Connection::dial(&config.address, config.connect_timeout()).await?;
        let remote_addr = connection.peer_addr()?;

        connection
            .call(
                Procedure::ConnectOpen,
                protocol::encode_open(config.uri.as_deref(), 0),
            )
            .await?;
        let body = connection
            .call(Procedure::ConnectGetLibVersion, Bytes::new())
            .await?;
        let lib_version = protocol::decode_lib_version(body)?;
        tracing::debug!(%remote_addr, %lib_version, "libvirt handshake complete");

        let (requests, queue) = mpsc::channel(config.queue_depth.max(1));
        let worker = tokio::spawn(run(connection, queue));

        Ok(Self {
            requests,
            worker: Mutex::new(Some(worker)),
            remote_addr,
            lib_version,
        })
    }

    /// Address of the daemon this session is connected to.
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Library version reported during the handshake.
    #[must_use]
    pub fn lib_version(&self) -> LibVersion {
        self.lib_version
    }

    async fn call(&self, procedure: Procedure, args: Bytes) -> Result<Bytes, LibvirtError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request {
                procedure,
                args,
                reply,
            })
            .await
            .map_err(|_| LibvirtError::NotConnected)?;
        response.await.map_err(|_| LibvirtError::NotConnected)?
    }

    /// Close the remote connection. Only the first call does anything.
    ///
    /// # Errors
    ///
    /// Returns [`LibvirtError::AlreadyClosed`] on every call after the first,
    /// or the failure of the remote close itself.
    pub async fn close(&self) -> Result<(), LibvirtError> {
        let Some(worker) = self.worker.lock().await.take() else {
            return Err(LibvirtError::AlreadyClosed);
        };
        let result = self
            .call(Procedure::ConnectClose, Bytes::new())
            .await
            .map(|_| ());
        if let Err(err) = worker.await {
            tracing::warn!(error = %err, "libvirt connection task ended abnormally");
        }
        result
    }
}

async fn run(mut connection: Connection, mut queue: mpsc::Receiver<Request>) {
    while let Some(request) = queue.recv().await {
        let closing = request.procedure == Procedure::ConnectClose;
        let result = connection.call(request.procedure, request.args).await;
        if request.reply.send(result).is_err() {
            tracing::debug!(procedure = ?request.procedure, "caller left before the reply arrived");
        }
        if closing {
            break;
        }
    }
    drop(queue);
    if let Err(err) = connection.shutdown().await {
        tracing::debug!(error = %err, "socket shutdown failed");
    }
}

impl ManagementSession for RemoteSession {
    async fn list_active_domains(&self) -> Result<Vec<DomainRecord>, HostdError> {
        let body = self
            .call(
                Procedure::ConnectListAllDomains,
                protocol::encode_list_all_domains(1, LIST_DOMAINS_ACTIVE),
            )
            .await?;
        let domains = protocol::decode_list_all_domains(body).map_err(LibvirtError::from)?;
        Ok(domains.into_iter().map(RemoteDomain::into_record).collect())
    }

    async fn execute(
        &self,
        command: LifecycleCommand,
        domain: &DomainHandle,
    ) -> Result<(), HostdError> {
        let args = protocol::encode_lifecycle(command, &RemoteDomain::from(domain));
        self.call(Procedure::for_command(command), args).await?;
        tracing::info!(%command, domain = %domain.name, uuid = %domain.uuid, "lifecycle call accepted");
        Ok(())
    }
}
