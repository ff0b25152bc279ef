//! In-process stand-in for libvirtd, for tests.
//!
//! Speaks just enough of the remote program to exercise [`RemoteSession`]:
//! open, close, library version, domain listing, and the three lifecycle
//! procedures. Every call it receives is recorded.
//!
//! [`RemoteSession`]: crate::session::RemoteSession

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use hostd_domain::id::DomainUuid;

use crate::connection::{read_message, write_message};
use crate::protocol::{Header, Message, MessageType, Procedure, RemoteDomain, RemoteError, Status};
use crate::xdr::{XdrReader, XdrWriter};

/// Library version the fake daemon reports (9.10.0).
pub const FAKE_LIB_VERSION: u64 = 9_010_000;

/// `VIR_ERR_NO_DOMAIN`.
const ERR_NO_DOMAIN: i32 = 42;
/// `VIR_ERR_OPERATION_INVALID`.
const ERR_OPERATION_INVALID: i32 = 55;

/// One call received by the fake daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub procedure: Procedure,
    pub serial: u32,
    /// Target of a lifecycle call.
    pub domain: Option<DomainUuid>,
    /// Flags argument, when the procedure carries one.
    pub flags: Option<u32>,
}

#[derive(Default)]
struct State {
    domains: Mutex<Vec<RemoteDomain>>,
    failures: Mutex<HashMap<Procedure, String>>,
    calls: Mutex<Vec<RecordedCall>>,
    reply_delay: Mutex<Duration>,
    emit_events: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A fake libvirtd listening on a loopback port.
pub struct FakeLibvirtd {
    address: SocketAddr,
    state: Arc<State>,
    acceptor: JoinHandle<()>,
}

impl FakeLibvirtd {
    /// Bind to an ephemeral loopback port and start accepting connections.
    ///
    /// # Errors
    ///
    /// Returns the bind error, if any.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let state = Arc::new(State::default());
        let acceptor = tokio::spawn(accept(listener, Arc::clone(&state)));
        Ok(Self {
            address,
            state,
            acceptor,
        })
    }

    /// `host:port` to dial.
    #[must_use]
    pub fn address(&self) -> String {
        self.address.to_string()
    }

    /// Add an active domain to the listing.
    pub fn add_domain(&self, name: &str, uuid: DomainUuid) {
        let mut domains = lock(&self.state.domains);
        let id = i32::try_from(domains.len()).unwrap_or(i32::MAX) + 1;
        domains.push(RemoteDomain {
            name: name.to_string(),
            uuid: *uuid.as_bytes(),
            id,
        });
    }

    /// Make every call to `procedure` fail with `message`.
    pub fn fail(&self, procedure: Procedure, message: &str) {
        lock(&self.state.failures).insert(procedure, message.to_string());
    }

    /// Push an unsolicited event ahead of every reply.
    pub fn emit_events(&self, enabled: bool) {
        self.state.emit_events.store(enabled, Ordering::SeqCst);
    }

    /// Wait this long before answering each call.
    pub fn set_reply_delay(&self, delay: Duration) {
        *lock(&self.state.reply_delay) = delay;
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state.calls).clone()
    }

    /// Shutdown, reset, and reboot calls received so far.
    #[must_use]
    pub fn lifecycle_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call.procedure,
                    Procedure::DomainShutdown | Procedure::DomainReset | Procedure::DomainReboot
                )
            })
            .collect()
    }
}

impl Drop for FakeLibvirtd {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn accept(listener: TcpListener, state: Arc<State>) {
    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(serve(stream, Arc::clone(&state)));
    }
}

async fn serve(mut stream: TcpStream, state: Arc<State>) {
    while let Ok(call) = read_message(&mut stream).await {
        let Some(procedure) = Procedure::from_number(call.header.procedure) else {
            return;
        };
        let (status, body) = answer(&state, procedure, &call);

        let delay = *lock(&state.reply_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if state.emit_events.load(Ordering::SeqCst) {
            let event = Message {
                header: Header {
                    kind: MessageType::Message,
                    ..call.header
                },
                body: Bytes::new(),
            };
            if write_message(&mut stream, &event).await.is_err() {
                return;
            }
        }
        let reply = Message {
            header: Header::reply_to(&call.header, status),
            body,
        };
        if write_message(&mut stream, &reply).await.is_err() {
            return;
        }
        if procedure == Procedure::ConnectClose {
            let _ = stream.shutdown().await;
            return;
        }
    }
}

fn error_body(code: i32, message: String) -> Bytes {
    RemoteError {
        code,
        domain: 10,
        message: Some(message),
        level: 2,
    }
    .encode()
}

fn answer(state: &State, procedure: Procedure, call: &Message) -> (Status, Bytes) {
    let mut reader = XdrReader::new(call.body.clone());
    let mut recorded = RecordedCall {
        procedure,
        serial: call.header.serial,
        domain: None,
        flags: None,
    };
    let mut target = None;
    match procedure {
        Procedure::DomainShutdown | Procedure::DomainReset | Procedure::DomainReboot => {
            if let Ok(domain) = RemoteDomain::decode(&mut reader) {
                recorded.domain = Some(DomainUuid::from_bytes(domain.uuid));
                target = Some(domain.uuid);
            }
            recorded.flags = reader.get_u32().ok();
        }
        Procedure::ConnectListAllDomains => {
            let _need_results = reader.get_i32();
            recorded.flags = reader.get_u32().ok();
        }
        Procedure::ConnectOpen => {
            let _uri = reader.get_optional_string();
            recorded.flags = reader.get_u32().ok();
        }
        Procedure::ConnectClose | Procedure::ConnectGetLibVersion => {}
    }
    lock(&state.calls).push(recorded);

    if let Some(message) = lock(&state.failures).get(&procedure) {
        return (
            Status::Error,
            error_body(ERR_OPERATION_INVALID, message.clone()),
        );
    }

    let mut writer = XdrWriter::new();
    match procedure {
        Procedure::ConnectGetLibVersion => {
            writer.put_u64(FAKE_LIB_VERSION);
        }
        Procedure::ConnectListAllDomains => {
            let domains = lock(&state.domains);
            let count = u32::try_from(domains.len()).unwrap_or(u32::MAX);
            writer.put_u32(count);
            for domain in domains.iter() {
                domain.encode(&mut writer);
            }
            writer.put_u32(count);
        }
        Procedure::DomainShutdown | Procedure::DomainReset | Procedure::DomainReboot => {
            let known = target
                .is_some_and(|uuid| lock(&state.domains).iter().any(|d| d.uuid == uuid));
            if !known {
                return (
                    Status::Error,
                    error_body(
                        ERR_NO_DOMAIN,
                        "Domain not found: no domain with matching uuid".to_string(),
                    ),
                );
            }
        }
        Procedure::ConnectOpen | Procedure::ConnectClose => {}
    }
    (Status::Ok, writer.finish())
}
