//! Primitive wire encodings shared by the sync channel and item codecs.
//!
//! The adapted protocol prefixes strings and frames with variable-length
//! integers (seven bits per byte, least significant group first) and stores
//! fixed-width integers in network byte order.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Maximum number of bytes a 32-bit `VarInt` may occupy.
pub const MAX_VARINT_LEN: usize = 5;

/// Default upper bound on decoded string length, in bytes.
pub const MAX_STRING_LEN: usize = 32_767;

/// Errors raised while reading primitive values from a buffer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the value was complete.
    #[error("unexpected end of buffer: need {need} more bytes")]
    UnexpectedEof {
        /// Bytes still required.
        need: usize,
    },

    /// A `VarInt` ran past five bytes.
    #[error("varint is longer than {MAX_VARINT_LEN} bytes")]
    VarIntTooLong,

    /// A length prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A string length prefix exceeded the permitted bound.
    #[error("string length {len} exceeds maximum {max}")]
    StringTooLong {
        /// Declared length.
        len: usize,
        /// Permitted maximum.
        max: usize,
    },

    /// String bytes were not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// An unknown tag type byte was encountered.
    #[error("unknown tag type {0}")]
    UnknownTagType(u8),

    /// Compound tags were nested deeper than permitted.
    #[error("compound tags nested deeper than {0} levels")]
    TagTooDeep(usize),
}

fn ensure(buf: &impl Buf, need: usize) -> Result<(), WireError> {
    if buf.remaining() < need {
        return Err(WireError::UnexpectedEof {
            need: need - buf.remaining(),
        });
    }
    Ok(())
}

/// Append `value` as a `VarInt`.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use shimframe::wire::write_varint;
///
/// let mut buf = BytesMut::new();
/// write_varint(300, &mut buf);
/// assert_eq!(&buf[..], &[0xac, 0x02]);
/// ```
#[expect(
    clippy::cast_sign_loss,
    reason = "VarInt encodes the two's complement bit pattern"
)]
pub fn write_varint(value: i32, dst: &mut impl BufMut) {
    let mut value = value as u32;
    loop {
        if value & !0x7f == 0 {
            #[expect(clippy::cast_possible_truncation, reason = "masked to seven bits")]
            dst.put_u8(value as u8);
            return;
        }
        #[expect(clippy::cast_possible_truncation, reason = "masked to seven bits")]
        dst.put_u8((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
}

/// Number of bytes `value` occupies as a `VarInt`.
#[must_use]
#[expect(
    clippy::cast_sign_loss,
    reason = "VarInt encodes the two's complement bit pattern"
)]
pub fn varint_len(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Read a `VarInt` from `src`.
///
/// # Errors
///
/// Returns [`WireError::UnexpectedEof`] when `src` ends mid-value and
/// [`WireError::VarIntTooLong`] when the encoding exceeds five bytes.
pub fn read_varint(src: &mut impl Buf) -> Result<i32, WireError> {
    let mut value: u32 = 0;
    for position in 0..MAX_VARINT_LEN {
        ensure(src, 1)?;
        let byte = src.get_u8();
        value |= u32::from(byte & 0x7f) << (7 * position);
        if byte & 0x80 == 0 {
            #[expect(
                clippy::cast_possible_wrap,
                reason = "VarInt encodes the two's complement bit pattern"
            )]
            return Ok(value as i32);
        }
    }
    Err(WireError::VarIntTooLong)
}

/// Peek at a complete `VarInt` at the start of `src` without consuming it.
///
/// Returns `Ok(None)` when more bytes are needed, otherwise the value and
/// the number of bytes it occupies.
///
/// # Errors
///
/// Returns [`WireError::VarIntTooLong`] for an over-long encoding.
pub fn peek_varint(src: &[u8]) -> Result<Option<(i32, usize)>, WireError> {
    let mut value: u32 = 0;
    for (position, byte) in src.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u32::from(byte & 0x7f) << (7 * position);
        if byte & 0x80 == 0 {
            #[expect(
                clippy::cast_possible_wrap,
                reason = "VarInt encodes the two's complement bit pattern"
            )]
            return Ok(Some((value as i32, position + 1)));
        }
    }
    if src.len() >= MAX_VARINT_LEN {
        return Err(WireError::VarIntTooLong);
    }
    Ok(None)
}

/// Append a `VarInt`-prefixed UTF-8 string.
pub fn write_string(value: &str, dst: &mut impl BufMut) {
    let len = i32::try_from(value.len()).unwrap_or(i32::MAX);
    write_varint(len, dst);
    dst.put_slice(value.as_bytes());
}

/// Read a `VarInt`-prefixed UTF-8 string of at most `max` bytes.
///
/// # Errors
///
/// Fails on a negative or over-long prefix, truncated data, or invalid UTF-8.
pub fn read_string(src: &mut impl Buf, max: usize) -> Result<String, WireError> {
    let len = read_varint(src)?;
    let len = usize::try_from(len).map_err(|_| WireError::NegativeLength(len))?;
    if len > max {
        return Err(WireError::StringTooLong { len, max });
    }
    ensure(src, len)?;
    let raw = src.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| WireError::InvalidUtf8)
}

/// Read a big-endian `i16`.
///
/// # Errors
///
/// Returns [`WireError::UnexpectedEof`] when fewer than two bytes remain.
pub fn read_i16(src: &mut impl Buf) -> Result<i16, WireError> {
    ensure(src, 2)?;
    Ok(src.get_i16())
}

/// Read a big-endian `i32`.
///
/// # Errors
///
/// Returns [`WireError::UnexpectedEof`] when fewer than four bytes remain.
pub fn read_i32(src: &mut impl Buf) -> Result<i32, WireError> {
    ensure(src, 4)?;
    Ok(src.get_i32())
}

/// Read a single signed byte.
///
/// # Errors
///
/// Returns [`WireError::UnexpectedEof`] on an empty buffer.
pub fn read_i8(src: &mut impl Buf) -> Result<i8, WireError> {
    ensure(src, 1)?;
    Ok(src.get_i8())
}

/// Read a single unsigned byte.
///
/// # Errors
///
/// Returns [`WireError::UnexpectedEof`] on an empty buffer.
pub fn read_u8(src: &mut impl Buf) -> Result<u8, WireError> {
    ensure(src, 1)?;
    Ok(src.get_u8())
}

/// Read a `u16`-prefixed modified-UTF-8 string as used inside compound tags.
///
/// # Errors
///
/// Fails on truncated data or invalid UTF-8.
pub fn read_short_string(src: &mut impl Buf) -> Result<String, WireError> {
    ensure(src, 2)?;
    let len = usize::from(src.get_u16());
    ensure(src, len)?;
    let raw = src.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| WireError::InvalidUtf8)
}

/// Append a `u16`-prefixed string as used inside compound tags.
///
/// # Errors
///
/// Returns [`WireError::StringTooLong`] for strings over 65535 bytes.
pub fn write_short_string(value: &str, dst: &mut BytesMut) -> Result<(), WireError> {
    let len = u16::try_from(value.len()).map_err(|_| WireError::StringTooLong {
        len: value.len(),
        max: usize::from(u16::MAX),
    })?;
    dst.put_u16(len);
    dst.put_slice(value.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(1, &[0x01])]
    #[case(127, &[0x7f])]
    #[case(128, &[0x80, 0x01])]
    #[case(25_565, &[0xdd, 0xc7, 0x01])]
    #[case(-1, &[0xff, 0xff, 0xff, 0xff, 0x0f])]
    fn varint_matches_reference_bytes(#[case] value: i32, #[case] expected: &[u8]) {
        let mut buf = BytesMut::new();
        write_varint(value, &mut buf);
        assert_eq!(&buf[..], expected);
        assert_eq!(varint_len(value), expected.len());
        assert_eq!(read_varint(&mut buf.freeze()), Ok(value));
    }

    #[test]
    fn overlong_varint_is_rejected() {
        let mut src = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x01]);
        assert_eq!(read_varint(&mut src), Err(WireError::VarIntTooLong));
    }

    #[test]
    fn peek_reports_incomplete_varint() {
        assert_eq!(peek_varint(&[0x80]), Ok(None));
        assert_eq!(peek_varint(&[0x80, 0x01, 0xaa]), Ok(Some((128, 2))));
    }

    #[test]
    fn string_length_is_bounded() {
        let mut buf = BytesMut::new();
        write_string("hello", &mut buf);
        let mut src = buf.freeze();
        assert_eq!(
            read_string(&mut src, 4),
            Err(WireError::StringTooLong { len: 5, max: 4 })
        );
    }

    #[test]
    fn truncated_string_reports_missing_bytes() {
        let mut src = Bytes::from_static(&[0x05, b'h', b'i']);
        assert_eq!(
            read_string(&mut src, MAX_STRING_LEN),
            Err(WireError::UnexpectedEof { need: 3 })
        );
    }
}
