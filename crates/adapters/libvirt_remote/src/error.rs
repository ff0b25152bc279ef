//! libvirt adapter error types.

use std::time::Duration;

use hostd_domain::error::HostdError;

/// Errors specific to the libvirt remote adapter.
///
/// Display strings end up in HTTP response bodies, so they embed the
/// underlying description.
#[derive(Debug, thiserror::Error)]
pub enum LibvirtError {
    /// The TCP dial did not complete within the configured timeout.
    #[error("timed out after {timeout:?} connecting to {address}")]
    DialTimeout { address: String, timeout: Duration },

    /// The TCP dial failed outright.
    #[error("failed to connect to {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the established connection failed.
    #[error("management connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The daemon sent something this client could not decode.
    #[error("malformed message from libvirtd: {0}")]
    Protocol(#[from] ProtocolError),

    /// The daemon rejected the call.
    #[error("{message}")]
    Remote { code: i32, message: String },

    /// The session was closed, or its connection task is gone.
    #[error("management session is not connected")]
    NotConnected,

    /// [`close`](crate::session::RemoteSession::close) was called twice.
    #[error("management session already closed")]
    AlreadyClosed,
}

/// Details about why a message could not be encoded or decoded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("truncated {what}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid XDR boolean {0}")]
    InvalidBool(u32),

    #[error("string of {0} bytes exceeds the protocol limit")]
    StringTooLong(usize),

    #[error("invalid UTF-8 in string")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    #[error("list of {0} elements exceeds the protocol limit")]
    ListTooLong(usize),

    #[error("message of {0} bytes is shorter than a header")]
    FrameTooSmall(usize),

    #[error("message of {0} bytes exceeds the protocol limit")]
    FrameTooLarge(usize),

    #[error("unexpected program {program:#x} version {version}")]
    UnexpectedProgram { program: u32, version: u32 },

    #[error("unknown message type {0}")]
    UnknownMessageType(i32),

    #[error("unknown message status {0}")]
    UnknownStatus(i32),

    #[error("unexpected streaming reply")]
    UnexpectedContinue,
}

impl From<LibvirtError> for HostdError {
    fn from(err: LibvirtError) -> Self {
        Self::Session(Box::new(err))
    }
}
