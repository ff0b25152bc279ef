//! One TCP connection to libvirtd and the request/response exchange on it.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{LibvirtError, ProtocolError};
use crate::protocol::{
    HEADER_SIZE, Header, LENGTH_WORD, MAX_MESSAGE_SIZE, Message, MessageType, Procedure,
    RemoteError, Status,
};

/// Read one complete message.
pub(crate) async fn read_message<R>(reader: &mut R) -> Result<Message, LibvirtError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len < LENGTH_WORD + HEADER_SIZE {
        return Err(ProtocolError::FrameTooSmall(len).into());
    }
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::FrameTooLarge(len).into());
    }
    let mut frame = BytesMut::zeroed(len - LENGTH_WORD);
    reader.read_exact(&mut frame).await?;
    Ok(Message::decode(frame.freeze())?)
}

/// Write one complete message and flush it.
pub(crate) async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), LibvirtError>
where
    W: AsyncWrite + Unpin,
{
    let frame = message.encode()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Whether `err` may have left a partial frame on the stream, after which
/// the next read would start in the middle of a message.
fn desynchronizes(err: &LibvirtError) -> bool {
    matches!(
        err,
        LibvirtError::Io(_)
            | LibvirtError::Protocol(ProtocolError::FrameTooSmall(_) | ProtocolError::FrameTooLarge(_))
    )
}

/// An established connection. Calls take `&mut self`, so at most one
/// exchange is ever in flight.
///
/// Once framing is lost the connection is marked broken and every later
/// call fails with [`LibvirtError::NotConnected`].
pub(crate) struct Connection {
    stream: TcpStream,
    serial: u32,
    broken: bool,
}

impl Connection {
    /// Dial `address`, giving up after `timeout`.
    pub(crate) async fn dial(address: &str, timeout: Duration) -> Result<Self, LibvirtError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| LibvirtError::DialTimeout {
                address: address.to_string(),
                timeout,
            })?
            .map_err(|source| LibvirtError::Dial {
                address: address.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            serial: 0,
            broken: false,
        })
    }

    pub(crate) fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Send one call and wait for its reply body.
    ///
    /// Events and replies to other serials are skipped.
    pub(crate) async fn call(
        &mut self,
        procedure: Procedure,
        args: Bytes,
    ) -> Result<Bytes, LibvirtError> {
        if self.broken {
            return Err(LibvirtError::NotConnected);
        }
        let result = self.exchange(procedure, args).await;
        if let Err(err) = &result
            && desynchronizes(err)
        {
            tracing::warn!(error = %err, "libvirt connection lost framing, marking it broken");
            self.broken = true;
        }
        result
    }

    async fn exchange(&mut self, procedure: Procedure, args: Bytes) -> Result<Bytes, LibvirtError> {
        self.serial = self.serial.wrapping_add(1);
        let call = Header::call(procedure, self.serial);
        write_message(
            &mut self.stream,
            &Message {
                header: call,
                body: args,
            },
        )
        .await?;

        loop {
            let message = read_message(&mut self.stream).await?;
            let header = message.header;
            if header.kind != MessageType::Reply
                || header.serial != call.serial
                || header.procedure != call.procedure
            {
                tracing::debug!(
                    kind = ?header.kind,
                    procedure = header.procedure,
                    serial = header.serial,
                    "skipping unrelated message"
                );
                continue;
            }
            return match header.status {
                Status::Ok => Ok(message.body),
                Status::Error => {
                    let remote = RemoteError::decode(message.body)?;
                    Err(LibvirtError::Remote {
                        code: remote.code,
                        message: remote.description(),
                    })
                }
                Status::Continue => Err(ProtocolError::UnexpectedContinue.into()),
            };
        }
    }

    pub(crate) async fn shutdown(mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}
