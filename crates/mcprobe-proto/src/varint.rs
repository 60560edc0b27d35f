//! `VarInt` and `VarLong` encoding/decoding.
//!
//! The protocol uses a variable-length integer encoding where each byte
//! carries 7 bits of payload and 1 continuation bit, least-significant
//! group first.

use bytes::{Buf, BufMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProtocolError, Result};

/// Segment bits mask (lower 7 bits).
const SEGMENT_BITS: u8 = 0x7F;

/// Continue bit (high bit).
const CONTINUE_BIT: u8 = 0x80;

/// Read a `VarInt` from an async reader.
///
/// This is only used for the frame length prefix, the one varint that has
/// to be decoded straight off the wire. Everything else is read from an
/// already-buffered frame body.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs
/// - The `VarInt` is longer than 5 bytes
pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32> {
    let mut value: i32 = 0;
    let mut position: u32 = 0;

    loop {
        let byte = reader.read_u8().await?;
        value |= i32::from(byte & SEGMENT_BITS) << position;

        if byte & CONTINUE_BIT == 0 {
            break;
        }

        position += 7;
        if position >= 32 {
            return Err(ProtocolError::VarIntTooLong);
        }
    }

    Ok(value)
}

/// Read a `VarInt` from a buffered frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::VarIntTooLong`] if no terminating byte appears
/// within 5 groups, or [`ProtocolError::UnexpectedEof`] if the body ends
/// mid-varint.
pub fn read_varint_buf(buf: &mut impl Buf) -> Result<i32> {
    let mut value: i32 = 0;
    let mut position: u32 = 0;

    loop {
        if !buf.has_remaining() {
            return Err(ProtocolError::UnexpectedEof);
        }
        let byte = buf.get_u8();
        value |= i32::from(byte & SEGMENT_BITS) << position;

        if byte & CONTINUE_BIT == 0 {
            break;
        }

        position += 7;
        if position >= 32 {
            return Err(ProtocolError::VarIntTooLong);
        }
    }

    Ok(value)
}

/// Write a `VarInt` to a buffer.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub fn write_varint_buf(buf: &mut impl BufMut, mut value: i32) {
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & i32::from(SEGMENT_BITS)) as u8;
        value = ((value as u32) >> 7) as i32;

        if value != 0 {
            byte |= CONTINUE_BIT;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Read a `VarLong` from a buffered frame body.
///
/// # Errors
///
/// Returns [`ProtocolError::VarLongTooLong`] if no terminating byte appears
/// within 10 groups, or [`ProtocolError::UnexpectedEof`] if the body ends
/// mid-varint.
pub fn read_varlong_buf(buf: &mut impl Buf) -> Result<i64> {
    let mut value: i64 = 0;
    let mut position: u32 = 0;

    loop {
        if !buf.has_remaining() {
            return Err(ProtocolError::UnexpectedEof);
        }
        let byte = buf.get_u8();
        value |= i64::from(byte & SEGMENT_BITS) << position;

        if byte & CONTINUE_BIT == 0 {
            break;
        }

        position += 7;
        if position >= 64 {
            return Err(ProtocolError::VarLongTooLong);
        }
    }

    Ok(value)
}

/// Write a `VarLong` to a buffer.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub fn write_varlong_buf(buf: &mut impl BufMut, mut value: i64) {
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & i64::from(SEGMENT_BITS)) as u8;
        value = ((value as u64) >> 7) as i64;

        if value != 0 {
            byte |= CONTINUE_BIT;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Calculate the number of bytes needed to encode a `VarInt`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn varint_len(value: i32) -> usize {
    let value = value as u32;

    if value == 0 {
        return 1;
    }

    let bits_needed = 32 - value.leading_zeros();
    (bits_needed as usize).div_ceil(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::io::Cursor;

    fn roundtrip(value: i32) {
        let mut buf = BytesMut::new();
        write_varint_buf(&mut buf, value);
        assert_eq!(buf.len(), varint_len(value));

        let read_value = read_varint_buf(&mut buf.freeze()).unwrap();
        assert_eq!(read_value, value);
    }

    #[test]
    fn test_varint_roundtrip() {
        roundtrip(0);
        roundtrip(1);
        roundtrip(127);
        roundtrip(128);
        roundtrip(255);
        roundtrip(25565);
        roundtrip(2_097_151);
        roundtrip(i32::MAX);
        roundtrip(-1);
        roundtrip(i32::MIN);
    }

    #[test]
    fn test_varint_len() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(16383), 2);
        assert_eq!(varint_len(16384), 3);
        assert_eq!(varint_len(2_097_151), 3);
        assert_eq!(varint_len(2_097_152), 4);
        assert_eq!(varint_len(i32::MAX), 5);
        // Negative numbers always use 5 bytes
        assert_eq!(varint_len(-1), 5);
        assert_eq!(varint_len(i32::MIN), 5);
    }

    #[test]
    fn test_known_values() {
        // Test vectors from wiki.vg
        let test_cases = [
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7f]),
            (128, vec![0x80, 0x01]),
            (255, vec![0xff, 0x01]),
            (25565, vec![0xdd, 0xc7, 0x01]),
            (2_097_151, vec![0xff, 0xff, 0x7f]),
            (2_147_483_647, vec![0xff, 0xff, 0xff, 0xff, 0x07]),
            (-1, vec![0xff, 0xff, 0xff, 0xff, 0x0f]),
            (-2_147_483_648, vec![0x80, 0x80, 0x80, 0x80, 0x08]),
        ];

        for (value, expected_bytes) in test_cases {
            let mut buf = BytesMut::new();
            write_varint_buf(&mut buf, value);
            assert_eq!(buf[..], expected_bytes[..], "write failed for {value}");

            let read_value = read_varint_buf(&mut buf.freeze()).unwrap();
            assert_eq!(read_value, value, "read failed for {value}");
        }
    }

    #[tokio::test]
    async fn test_async_varint_too_long() {
        // 6 bytes with continue bits set
        let bytes = vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let mut cursor = Cursor::new(bytes);
        let result = read_varint(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::VarIntTooLong)));
    }

    #[test]
    fn test_varint_buf_too_long() {
        let bytes = bytes::Bytes::from_static(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        let result = read_varint_buf(&mut bytes.clone());
        assert!(matches!(result, Err(ProtocolError::VarIntTooLong)));
    }

    #[test]
    fn test_varint_truncated() {
        let bytes = bytes::Bytes::from_static(&[0x80, 0x80]);
        let result = read_varint_buf(&mut bytes.clone());
        assert!(matches!(result, Err(ProtocolError::UnexpectedEof)));
    }

    #[test]
    fn test_varlong_roundtrip() {
        for value in [0i64, 1, 127, 128, 25565, i64::from(i32::MAX), i64::MAX] {
            let mut buf = BytesMut::new();
            write_varlong_buf(&mut buf, value);
            assert_eq!(read_varlong_buf(&mut buf.freeze()).unwrap(), value);
        }
    }

    #[test]
    fn test_varlong_too_long() {
        let bytes = bytes::Bytes::from_static(&[
            0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01,
        ]);
        let result = read_varlong_buf(&mut bytes.clone());
        assert!(matches!(result, Err(ProtocolError::VarLongTooLong)));
    }
}
