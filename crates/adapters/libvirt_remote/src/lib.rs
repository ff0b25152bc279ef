//! # hostd-adapter-libvirt
//!
//! libvirt remote protocol adapter — talks to libvirtd over its TCP
//! listener, one connection for the lifetime of the process.
//!
//! ## Responsibilities
//! - Dial libvirtd with a bounded timeout
//! - Run the handshake (open the connection, read the library version)
//! - Implement the `ManagementSession` port: list active domains, issue
//!   shutdown / reset / reboot
//! - Serialize every call on the single connection
//! - Close the connection on teardown
//!
//! ## Dependency rule
//! Depends on `hostd-app` (for the port trait) and `hostd-domain`.
//! Nothing outside this crate sees a wire type.

pub mod config;
mod connection;
pub mod error;
pub mod protocol;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod xdr;

pub use config::LibvirtConfig;
pub use error::LibvirtError;
pub use session::RemoteSession;
