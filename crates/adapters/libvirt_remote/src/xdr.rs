//! Minimal XDR (RFC 4506) encoder and decoder.
//!
//! Only the primitives the libvirt remote program needs: 4-byte integers,
//! 8-byte hypers, booleans, strings, fixed opaque data, and optional values.
//! Everything is big-endian and padded to a multiple of four bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Upper bound on a single decoded string (`REMOTE_STRING_MAX`).
pub const STRING_MAX: usize = 4 * 1024 * 1024;

fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Appends XDR-encoded values to a growable buffer.
#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: BytesMut,
}

impl XdrWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32(value);
        self
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32(value);
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.put_u64(value);
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u32(u32::from(value))
    }

    /// Length-prefixed string, zero-padded to a four byte boundary.
    ///
    /// Oversized values are caught by the frame size check when the message
    /// is assembled.
    pub fn put_string(&mut self, value: &str) -> &mut Self {
        let len = u32::try_from(value.len()).unwrap_or(u32::MAX);
        self.buf.put_u32(len);
        self.buf.put_slice(value.as_bytes());
        self.buf.put_bytes(0, padding(value.len()));
        self
    }

    /// Fixed-length opaque data (no length prefix).
    pub fn put_opaque_fixed(&mut self, value: &[u8]) -> &mut Self {
        self.buf.put_slice(value);
        self.buf.put_bytes(0, padding(value.len()));
        self
    }

    /// `remote_string`: a presence flag followed by the string.
    pub fn put_optional_string(&mut self, value: Option<&str>) -> &mut Self {
        self.put_bool(value.is_some());
        if let Some(value) = value {
            self.put_string(value);
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads XDR-encoded values from a received message body.
#[derive(Debug)]
pub struct XdrReader {
    buf: Bytes,
}

impl XdrReader {
    #[must_use]
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    fn ensure(&self, needed: usize, what: &'static str) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::Truncated {
                what,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] when fewer than four bytes remain.
    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4, "u32")?;
        Ok(self.buf.get_u32())
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] when fewer than four bytes remain.
    pub fn get_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4, "i32")?;
        Ok(self.buf.get_i32())
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] when fewer than eight bytes remain.
    pub fn get_u64(&mut self) -> Result<u64, ProtocolError> {
        self.ensure(8, "u64")?;
        Ok(self.buf.get_u64())
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBool`] for anything but `0` or `1`.
    pub fn get_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.get_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidBool(other)),
        }
    }

    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the string is truncated, longer than
    /// [`STRING_MAX`], or not valid UTF-8.
    pub fn get_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.get_u32()? as usize;
        if len > STRING_MAX {
            return Err(ProtocolError::StringTooLong(len));
        }
        self.ensure(len + padding(len), "string")?;
        let raw = self.buf.split_to(len);
        self.buf.advance(padding(len));
        String::from_utf8(raw.to_vec()).map_err(ProtocolError::InvalidUtf8)
    }

    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] when fewer than `N` (padded) bytes remain.
    pub fn get_opaque_fixed<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        self.ensure(N + padding(N), "fixed opaque")?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        self.buf.advance(padding(N));
        Ok(out)
    }

    /// # Errors
    ///
    /// Propagates any error from the presence flag or the string itself.
    pub fn get_optional_string(&mut self) -> Result<Option<String>, ProtocolError> {
        if self.get_bool()? {
            self.get_string().map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_pad_strings_to_four_bytes() {
        let mut writer = XdrWriter::new();
        writer.put_string("abcde");
        let bytes = writer.finish();
        assert_eq!(
            bytes.as_ref(),
            &[0, 0, 0, 5, b'a', b'b', b'c', b'd', b'e', 0, 0, 0]
        );
    }

    #[test]
    fn should_not_pad_aligned_strings() {
        let mut writer = XdrWriter::new();
        writer.put_string("abcd");
        assert_eq!(writer.len(), 8);
    }

    #[test]
    fn should_encode_absent_optional_as_single_zero_word() {
        let mut writer = XdrWriter::new();
        writer.put_optional_string(None);
        assert_eq!(writer.finish().as_ref(), &[0, 0, 0, 0]);
    }

    #[test]
    fn should_read_back_mixed_values() {
        let mut writer = XdrWriter::new();
        writer
            .put_i32(-1)
            .put_u64(9_010_000)
            .put_optional_string(Some("qemu:///system"))
            .put_opaque_fixed(&[7u8; 16]);
        let mut reader = XdrReader::new(writer.finish());

        assert_eq!(reader.get_i32().unwrap(), -1);
        assert_eq!(reader.get_u64().unwrap(), 9_010_000);
        assert_eq!(
            reader.get_optional_string().unwrap().as_deref(),
            Some("qemu:///system")
        );
        assert_eq!(reader.get_opaque_fixed::<16>().unwrap(), [7u8; 16]);
        assert!(matches!(
            reader.get_u32(),
            Err(ProtocolError::Truncated { remaining: 0, .. })
        ));
    }

    #[test]
    fn should_report_truncation() {
        let mut reader = XdrReader::new(Bytes::from_static(&[0, 0]));
        assert!(matches!(
            reader.get_u32(),
            Err(ProtocolError::Truncated {
                needed: 4,
                remaining: 2,
                ..
            })
        ));
    }

    #[test]
    fn should_reject_string_longer_than_buffer() {
        let mut reader = XdrReader::new(Bytes::from_static(&[0, 0, 0, 9, b'a', b'b']));
        assert!(matches!(
            reader.get_string(),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn should_reject_invalid_bool() {
        let mut reader = XdrReader::new(Bytes::from_static(&[0, 0, 0, 2]));
        assert!(matches!(
            reader.get_bool(),
            Err(ProtocolError::InvalidBool(2))
        ));
    }
}
