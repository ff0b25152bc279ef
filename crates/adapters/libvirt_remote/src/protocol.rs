//! The libvirt remote program: message header, procedures, and payloads.
//!
//! Every message on the wire is a big-endian `u32` length (counting itself),
//! a 24-byte header, and an XDR body:
//!
//! | Offset | Field | Type |
//! |--------|-------|------|
//! | 0 | program | u32, always `0x20008086` |
//! | 4 | version | u32, always `1` |
//! | 8 | procedure | i32 |
//! | 12 | type | i32 (call, reply, message, stream) |
//! | 16 | serial | u32, echoed by the reply |
//! | 20 | status | i32 (ok, error, continue) |

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use hostd_domain::command::LifecycleCommand;
use hostd_domain::id::DomainUuid;
use hostd_domain::record::{DomainHandle, DomainRecord};

use crate::error::ProtocolError;
use crate::xdr::{XdrReader, XdrWriter};

/// `REMOTE_PROGRAM`.
pub const PROGRAM: u32 = 0x2000_8086;
/// `REMOTE_PROTOCOL_VERSION`.
pub const PROTOCOL_VERSION: u32 = 1;
/// Size of the length word preceding every message.
pub const LENGTH_WORD: usize = 4;
/// Size of the fixed header.
pub const HEADER_SIZE: usize = 24;
/// `VIR_NET_MESSAGE_MAX`: largest message either side may send.
pub const MAX_MESSAGE_SIZE: usize = 32 * 1024 * 1024;
/// `REMOTE_DOMAIN_LIST_MAX`.
pub const DOMAIN_LIST_MAX: usize = 16384;
/// `VIR_CONNECT_LIST_DOMAINS_ACTIVE`.
pub const LIST_DOMAINS_ACTIVE: u32 = 1;

/// Remote procedures this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Procedure {
    ConnectOpen = 1,
    ConnectClose = 2,
    DomainReboot = 27,
    DomainShutdown = 52,
    ConnectGetLibVersion = 157,
    DomainReset = 245,
    ConnectListAllDomains = 273,
}

impl Procedure {
    /// Procedure implementing a lifecycle command.
    #[must_use]
    pub fn for_command(command: LifecycleCommand) -> Self {
        match command {
            LifecycleCommand::Shutdown => Self::DomainShutdown,
            LifecycleCommand::Reset => Self::DomainReset,
            LifecycleCommand::Reboot => Self::DomainReboot,
        }
    }

    #[must_use]
    pub fn number(self) -> i32 {
        self as i32
    }

    /// Look up a procedure by its wire number.
    #[must_use]
    pub fn from_number(number: i32) -> Option<Self> {
        [
            Self::ConnectOpen,
            Self::ConnectClose,
            Self::DomainReboot,
            Self::DomainShutdown,
            Self::ConnectGetLibVersion,
            Self::DomainReset,
            Self::ConnectListAllDomains,
        ]
        .into_iter()
        .find(|procedure| procedure.number() == number)
    }
}

/// `virNetMessageType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call,
    Reply,
    /// Unsolicited event pushed by the daemon.
    Message,
    Stream,
}

impl MessageType {
    fn number(self) -> i32 {
        match self {
            Self::Call => 0,
            Self::Reply => 1,
            Self::Message => 2,
            Self::Stream => 3,
        }
    }
}

impl TryFrom<i32> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::Reply),
            2 => Ok(Self::Message),
            3 => Ok(Self::Stream),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

/// `virNetMessageStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    Continue,
}

impl Status {
    fn number(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::Continue => 2,
        }
    }
}

impl TryFrom<i32> for Status {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Error),
            2 => Ok(Self::Continue),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

/// Fixed message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub procedure: i32,
    pub kind: MessageType,
    pub serial: u32,
    pub status: Status,
}

impl Header {
    /// Header of an outgoing call.
    #[must_use]
    pub fn call(procedure: Procedure, serial: u32) -> Self {
        Self {
            procedure: procedure.number(),
            kind: MessageType::Call,
            serial,
            status: Status::Ok,
        }
    }

    /// Header answering `call` with `status`.
    #[must_use]
    pub fn reply_to(call: &Self, status: Status) -> Self {
        Self {
            kind: MessageType::Reply,
            status,
            ..*call
        }
    }

    fn encode(&self, writer: &mut XdrWriter) {
        writer
            .put_u32(PROGRAM)
            .put_u32(PROTOCOL_VERSION)
            .put_i32(self.procedure)
            .put_i32(self.kind.number())
            .put_u32(self.serial)
            .put_i32(self.status.number());
    }

    fn decode(reader: &mut XdrReader) -> Result<Self, ProtocolError> {
        let program = reader.get_u32()?;
        let version = reader.get_u32()?;
        if program != PROGRAM || version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnexpectedProgram { program, version });
        }
        Ok(Self {
            procedure: reader.get_i32()?,
            kind: MessageType::try_from(reader.get_i32()?)?,
            serial: reader.get_u32()?,
            status: Status::try_from(reader.get_i32()?)?,
        })
    }
}

/// A header and its (still encoded) body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub body: Bytes,
}

impl Message {
    /// Encode into a complete frame, length word included.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] when the frame would exceed
    /// [`MAX_MESSAGE_SIZE`].
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let total = LENGTH_WORD + HEADER_SIZE + self.body.len();
        if total > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::FrameTooLarge(total));
        }
        let mut header = XdrWriter::new();
        self.header.encode(&mut header);

        let mut frame = BytesMut::with_capacity(total);
        #[allow(clippy::cast_possible_truncation)]
        frame.put_u32(total as u32);
        frame.put_slice(&header.finish());
        frame.put_slice(&self.body);
        Ok(frame.freeze())
    }

    /// Decode a frame whose length word has already been consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the header is malformed.
    pub fn decode(frame: Bytes) -> Result<Self, ProtocolError> {
        if frame.len() < HEADER_SIZE {
            return Err(ProtocolError::FrameTooSmall(frame.len() + LENGTH_WORD));
        }
        let mut reader = XdrReader::new(frame.slice(..HEADER_SIZE));
        let header = Header::decode(&mut reader)?;
        Ok(Self {
            header,
            body: frame.slice(HEADER_SIZE..),
        })
    }
}

/// `remote_nonnull_domain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDomain {
    pub name: String,
    pub uuid: [u8; 16],
    pub id: i32,
}

impl RemoteDomain {
    pub fn encode(&self, writer: &mut XdrWriter) {
        writer
            .put_string(&self.name)
            .put_opaque_fixed(&self.uuid)
            .put_i32(self.id);
    }

    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the record is truncated or malformed.
    pub fn decode(reader: &mut XdrReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: reader.get_string()?,
            uuid: reader.get_opaque_fixed::<16>()?,
            id: reader.get_i32()?,
        })
    }

    #[must_use]
    pub fn into_record(self) -> DomainRecord {
        DomainRecord::new(self.name, DomainUuid::from_bytes(self.uuid), self.id)
    }
}

impl From<&DomainHandle> for RemoteDomain {
    fn from(handle: &DomainHandle) -> Self {
        Self {
            name: handle.name.clone(),
            uuid: *handle.uuid.as_bytes(),
            id: handle.id,
        }
    }
}

/// The leading fields of `remote_error`; the trailing ones carry nothing
/// this client reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: i32,
    pub domain: i32,
    pub message: Option<String>,
    pub level: i32,
}

impl RemoteError {
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the body is truncated or malformed.
    pub fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        let mut reader = XdrReader::new(body);
        Ok(Self {
            code: reader.get_i32()?,
            domain: reader.get_i32()?,
            message: reader.get_optional_string()?,
            level: reader.get_i32()?,
        })
    }

    /// Encode the complete structure, with every trailing field absent.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut writer = XdrWriter::new();
        writer
            .put_i32(self.code)
            .put_i32(self.domain)
            .put_optional_string(self.message.as_deref())
            .put_i32(self.level)
            // dom, str1, str2, str3
            .put_bool(false)
            .put_optional_string(None)
            .put_optional_string(None)
            .put_optional_string(None)
            // int1, int2, net
            .put_i32(-1)
            .put_i32(-1)
            .put_bool(false);
        writer.finish()
    }

    /// Human readable description.
    #[must_use]
    pub fn description(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("libvirt error code {}", self.code))
    }
}

/// Library version reported by the daemon, `major * 1_000_000 + minor * 1_000 + release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibVersion(pub u64);

impl LibVersion {
    #[must_use]
    pub fn major(self) -> u64 {
        self.0 / 1_000_000
    }

    #[must_use]
    pub fn minor(self) -> u64 {
        self.0 / 1_000 % 1_000
    }

    #[must_use]
    pub fn release(self) -> u64 {
        self.0 % 1_000
    }
}

impl fmt::Display for LibVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.release())
    }
}

/// `remote_connect_open_args`.
#[must_use]
pub fn encode_open(uri: Option<&str>, flags: u32) -> Bytes {
    let mut writer = XdrWriter::new();
    writer.put_optional_string(uri).put_u32(flags);
    writer.finish()
}

/// `remote_connect_get_lib_version_ret`.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] when the body is too short.
pub fn decode_lib_version(body: Bytes) -> Result<LibVersion, ProtocolError> {
    XdrReader::new(body).get_u64().map(LibVersion)
}

/// `remote_connect_list_all_domains_args`.
#[must_use]
pub fn encode_list_all_domains(need_results: i32, flags: u32) -> Bytes {
    let mut writer = XdrWriter::new();
    writer.put_i32(need_results).put_u32(flags);
    writer.finish()
}

/// `remote_connect_list_all_domains_ret`, keeping the domain array.
///
/// # Errors
///
/// Returns a [`ProtocolError`] when the body is malformed or the array
/// exceeds [`DOMAIN_LIST_MAX`].
pub fn decode_list_all_domains(body: Bytes) -> Result<Vec<RemoteDomain>, ProtocolError> {
    let mut reader = XdrReader::new(body);
    let count = reader.get_u32()? as usize;
    if count > DOMAIN_LIST_MAX {
        return Err(ProtocolError::ListTooLong(count));
    }
    let mut domains = Vec::with_capacity(count);
    for _ in 0..count {
        domains.push(RemoteDomain::decode(&mut reader)?);
    }
    // trailing `ret` count mirrors the array length
    reader.get_u32()?;
    Ok(domains)
}

/// Arguments of the per-domain lifecycle procedures.
///
/// Shutdown takes only the domain; reset and reboot also take flags.
#[must_use]
pub fn encode_lifecycle(command: LifecycleCommand, domain: &RemoteDomain) -> Bytes {
    let mut writer = XdrWriter::new();
    domain.encode(&mut writer);
    match command {
        LifecycleCommand::Shutdown => {}
        LifecycleCommand::Reset | LifecycleCommand::Reboot => {
            writer.put_u32(0);
        }
    }
    writer.finish()
}
