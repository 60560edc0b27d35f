//! Packet framing codec.
//!
//! Frames on the wire look like:
//! - `[VarInt length][VarInt packet_id][body...]`
//!
//! The length covers the packet ID and body, but not itself. Inbound
//! frames are fully buffered before any typed read happens, so a short or
//! malformed body turns into a local decode error instead of a read that
//! blocks on the socket.

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::varint::{read_varint, read_varint_buf, varint_len, write_varint_buf};

/// Maximum total encoded frame length (packet ID + body).
pub const MAX_PACKET_LENGTH: usize = 2_097_151;

/// Maximum string field length in bytes.
pub const MAX_STRING_LENGTH: usize = 32_767;

/// A raw frame with its packet ID and body.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// The packet ID.
    pub id: i32,
    /// The frame body (without the packet ID).
    pub body: BytesMut,
}

impl RawPacket {
    /// Create a new raw packet with the given ID and body.
    #[must_use]
    pub const fn new(id: i32, body: BytesMut) -> Self {
        Self { id, body }
    }

    /// Create a new raw packet with the given ID and an empty body.
    #[must_use]
    pub fn empty(id: i32) -> Self {
        Self {
            id,
            body: BytesMut::new(),
        }
    }

    /// Serialize the frame to `varint(length) || varint(id) || body`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PacketTooLong`] if the encoded ID plus body
    /// exceed [`MAX_PACKET_LENGTH`].
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn build(&self) -> Result<Vec<u8>> {
        let total_len = varint_len(self.id) + self.body.len();
        if total_len > MAX_PACKET_LENGTH {
            return Err(ProtocolError::PacketTooLong {
                len: total_len,
                max: MAX_PACKET_LENGTH,
            });
        }

        let total_len_i32 = total_len as i32;
        let mut buf = Vec::with_capacity(varint_len(total_len_i32) + total_len);
        write_varint_buf(&mut buf, total_len_i32);
        write_varint_buf(&mut buf, self.id);
        buf.extend_from_slice(&self.body);

        Ok(buf)
    }
}

/// Read a raw frame from an async reader.
///
/// The length prefix is validated against [`MAX_PACKET_LENGTH`] before any
/// body byte is read or allocated, so a hostile peer cannot make us buffer
/// an arbitrarily large frame.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs
/// - The declared length exceeds [`MAX_PACKET_LENGTH`]
/// - The leading packet-ID varint is malformed
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<RawPacket> {
    let length = read_varint(reader).await?;

    let length = usize::try_from(length).map_err(|_| ProtocolError::PacketTooLong {
        len: 0,
        max: MAX_PACKET_LENGTH,
    })?;

    if length > MAX_PACKET_LENGTH {
        return Err(ProtocolError::PacketTooLong {
            len: length,
            max: MAX_PACKET_LENGTH,
        });
    }

    let mut data = vec![0u8; length];
    reader.read_exact(&mut data).await?;

    // The body is fully buffered now; everything below is local decoding.
    let mut buf = BytesMut::from(&data[..]);
    let id = read_varint_buf(&mut buf)?;

    Ok(RawPacket { id, body: buf })
}

/// Write a raw frame to an async writer.
///
/// # Errors
///
/// Returns an error if the frame exceeds [`MAX_PACKET_LENGTH`] or an I/O
/// error occurs. An oversized frame fails before any byte is written.
pub async fn write_packet<W: AsyncWrite + Unpin>(writer: &mut W, packet: &RawPacket) -> Result<()> {
    let buf = packet.build()?;
    writer.write_all(&buf).await?;
    Ok(())
}

/// Read a length-prefixed UTF-8 string from a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::StringTooLong`] if the declared length exceeds
/// [`MAX_STRING_LENGTH`]. The bound is checked before any byte is copied.
pub fn read_string(buf: &mut impl Buf) -> Result<String> {
    let len = read_varint_buf(buf)?;

    let len = usize::try_from(len).map_err(|_| ProtocolError::StringTooLong {
        len: 0,
        max: MAX_STRING_LENGTH,
    })?;

    if len > MAX_STRING_LENGTH {
        return Err(ProtocolError::StringTooLong {
            len,
            max: MAX_STRING_LENGTH,
        });
    }

    if buf.remaining() < len {
        return Err(ProtocolError::UnexpectedEof);
    }

    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);

    String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Write a length-prefixed UTF-8 string to a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::StringTooLong`] if the string exceeds
/// [`MAX_STRING_LENGTH`] bytes. Nothing is written in that case.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn write_string(buf: &mut impl BufMut, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_STRING_LENGTH {
        return Err(ProtocolError::StringTooLong {
            len: bytes.len(),
            max: MAX_STRING_LENGTH,
        });
    }

    write_varint_buf(buf, bytes.len() as i32);
    buf.put_slice(bytes);
    Ok(())
}

/// Read a single byte from a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedEof`] if the body is exhausted.
pub fn read_u8(buf: &mut impl Buf) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(buf.get_u8())
}

/// Read a big-endian unsigned 16-bit integer from a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedEof`] if fewer than 2 bytes remain.
pub fn read_u16(buf: &mut impl Buf) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(buf.get_u16())
}

/// Read a big-endian signed 16-bit integer from a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedEof`] if fewer than 2 bytes remain.
pub fn read_i16(buf: &mut impl Buf) -> Result<i16> {
    if buf.remaining() < 2 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(buf.get_i16())
}

/// Read a big-endian signed 32-bit integer from a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedEof`] if fewer than 4 bytes remain.
pub fn read_i32(buf: &mut impl Buf) -> Result<i32> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(buf.get_i32())
}

/// Read a big-endian signed 64-bit integer from a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedEof`] if fewer than 8 bytes remain.
pub fn read_i64(buf: &mut impl Buf) -> Result<i64> {
    if buf.remaining() < 8 {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(buf.get_i64())
}

/// Read a boolean (single byte, 1/0) from a frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedEof`] if the body is exhausted.
pub fn read_bool(buf: &mut impl Buf) -> Result<bool> {
    Ok(read_u8(buf)? != 0)
}

/// Write a boolean as a single byte (1/0).
pub fn write_bool(buf: &mut impl BufMut, value: bool) {
    buf.put_u8(u8::from(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::write_varint_buf;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_write_packet() {
        let original = RawPacket {
            id: 0x00,
            body: BytesMut::from(&b"hello"[..]),
        };

        let mut buf = Vec::new();
        write_packet(&mut buf, &original).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let read = read_packet(&mut cursor).await.unwrap();

        assert_eq!(read.id, original.id);
        assert_eq!(read.body, original.body);
    }

    #[tokio::test]
    async fn test_empty_packet() {
        let original = RawPacket::empty(0x01);

        let mut buf = Vec::new();
        write_packet(&mut buf, &original).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let read = read_packet(&mut cursor).await.unwrap();

        assert_eq!(read.id, 0x01);
        assert!(read.body.is_empty());
    }

    #[test]
    fn test_build_at_max_length() {
        // varint_len(0) == 1, so the body may be MAX_PACKET_LENGTH - 1 bytes
        let body = BytesMut::from(&vec![0u8; MAX_PACKET_LENGTH - 1][..]);
        let packet = RawPacket::new(0x00, body);
        assert!(packet.build().is_ok());
    }

    #[test]
    fn test_build_too_long() {
        let body = BytesMut::from(&vec![0u8; MAX_PACKET_LENGTH][..]);
        let packet = RawPacket::new(0x00, body);
        assert!(matches!(
            packet.build(),
            Err(ProtocolError::PacketTooLong { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_length() {
        // A frame that declares MAX_PACKET_LENGTH + 1 bytes but carries none.
        // The length check has to fire before the body read.
        let mut buf = Vec::new();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        write_varint_buf(&mut buf, (MAX_PACKET_LENGTH + 1) as i32);

        let mut cursor = Cursor::new(buf);
        let result = read_packet(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::PacketTooLong { .. })));
    }

    #[tokio::test]
    async fn test_read_accepts_max_declared_length() {
        let mut buf = Vec::new();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        write_varint_buf(&mut buf, MAX_PACKET_LENGTH as i32);
        buf.push(0x00); // packet id
        buf.extend_from_slice(&vec![0u8; MAX_PACKET_LENGTH - 1]);

        let mut cursor = Cursor::new(buf);
        let read = read_packet(&mut cursor).await.unwrap();
        assert_eq!(read.id, 0x00);
        assert_eq!(read.body.len(), MAX_PACKET_LENGTH - 1);
    }

    #[test]
    fn test_read_write_string() {
        let original = "Hello, world!";

        let mut buf = BytesMut::new();
        write_string(&mut buf, original).unwrap();

        let read = read_string(&mut buf.freeze()).unwrap();
        assert_eq!(read, original);
    }

    #[test]
    fn test_string_boundary() {
        let max = "a".repeat(MAX_STRING_LENGTH);
        let mut buf = BytesMut::new();
        write_string(&mut buf, &max).unwrap();
        assert_eq!(read_string(&mut buf.freeze()).unwrap(), max);

        let over = "a".repeat(MAX_STRING_LENGTH + 1);
        let mut buf = BytesMut::new();
        assert!(matches!(
            write_string(&mut buf, &over),
            Err(ProtocolError::StringTooLong { .. })
        ));
        // nothing must have been written
        assert!(buf.is_empty());
    }

    #[test]
    fn test_read_string_rejects_oversized_declared_length() {
        let mut buf = BytesMut::new();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        write_varint_buf(&mut buf, (MAX_STRING_LENGTH + 1) as i32);

        let result = read_string(&mut buf.freeze());
        assert!(matches!(result, Err(ProtocolError::StringTooLong { .. })));
    }

    #[test]
    fn test_read_string_truncated_body() {
        let mut buf = BytesMut::new();
        write_varint_buf(&mut buf, 10);
        buf.put_slice(b"short");

        let result = read_string(&mut buf.freeze());
        assert!(matches!(result, Err(ProtocolError::UnexpectedEof)));
    }

    #[test]
    fn test_fixed_width_reads() {
        let mut buf = BytesMut::new();
        buf.put_i16(-2);
        buf.put_i32(70_000);
        buf.put_i64(1_700_000_000);
        write_bool(&mut buf, true);

        let mut body = buf.freeze();
        assert_eq!(read_i16(&mut body).unwrap(), -2);
        assert_eq!(read_i32(&mut body).unwrap(), 70_000);
        assert_eq!(read_i64(&mut body).unwrap(), 1_700_000_000);
        assert!(read_bool(&mut body).unwrap());
        assert!(matches!(
            read_i64(&mut body),
            Err(ProtocolError::UnexpectedEof)
        ));
    }
}
