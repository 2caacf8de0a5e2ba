//! Zigzag varints.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::DecodeErrorKind;

/// Longest varint holding a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Maps signed to unsigned so small magnitudes stay short: 0, -1, 1, -2 → 0, 1, 2, 3.
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn zigzag_decode(z: u64) -> i64 {
    ((z >> 1) as i64) ^ -((z & 1) as i64)
}

/// Writes `value` seven bits at a time, low group first.
pub fn put_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub fn put_long(buf: &mut BytesMut, n: i64) {
    put_varint(buf, zigzag_encode(n));
}

/// Reads a varint. Fails on truncation, or on an encoding longer than a
/// `u64` allows.
pub fn get_varint(buf: &mut impl Buf) -> Result<u64, DecodeErrorKind> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(DecodeErrorKind::TruncatedInput);
        }
        let byte = buf.get_u8();
        let group = u64::from(byte & 0x7F);
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(DecodeErrorKind::InvalidNumberLiteral);
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(DecodeErrorKind::InvalidNumberLiteral)
}

pub fn get_long(buf: &mut impl Buf) -> Result<i64, DecodeErrorKind> {
    get_varint(buf).map(zigzag_decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(n: i64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_long(&mut buf, n);
        buf.to_vec()
    }

    #[test]
    fn zigzag_order() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        for n in [0, 1, -1, 63, -64, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(n)), n);
        }
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encoded(21), [42]);
        assert_eq!(encoded(-1), [1]);
        assert_eq!(encoded(64), [0x80, 0x01]);
        assert_eq!(encoded(-65), [0x81, 0x01]);
        assert_eq!(encoded(i64::MIN).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn read_back() {
        for n in [0, 21, -65, 1 << 40, i64::MAX, i64::MIN] {
            let bytes = encoded(n);
            assert_eq!(get_long(&mut &bytes[..]), Ok(n));
        }
    }

    #[test]
    fn truncated() {
        assert_eq!(get_long(&mut &[0x80u8][..]), Err(DecodeErrorKind::TruncatedInput));
        assert_eq!(get_long(&mut &[0u8; 0][..]), Err(DecodeErrorKind::TruncatedInput));
    }

    #[test]
    fn overlong() {
        let eleven = [0xFFu8; 11];
        assert_eq!(get_varint(&mut &eleven[..]), Err(DecodeErrorKind::InvalidNumberLiteral));
        let mut too_big = [0xFFu8; 10];
        too_big[9] = 0x02;
        assert_eq!(get_varint(&mut &too_big[..]), Err(DecodeErrorKind::InvalidNumberLiteral));
    }
}
