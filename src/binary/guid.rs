//! GUID fast paths: textual GUIDs packed into 16 bytes, and raw GUID values.

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use super::compression::{LOWERCASE_HEX, UPPERCASE_HEX};
use super::marker;

/// Characters in `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
pub const GUID_LENGTH: usize = 36;
pub const QUOTED_GUID_LENGTH: usize = GUID_LENGTH + 2;
/// Packed size of the 32 hex digits.
pub const GUID_BYTES: usize = 16;

const HYPHEN_OFFSETS: [usize; 4] = [8, 13, 18, 23];

/// Letter case seen so far while scanning a GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuidCase {
    /// Only digits so far.
    Unknown,
    Lower,
    Upper,
    /// Both cases seen; no marker covers this.
    Mixed,
}

impl GuidCase {
    fn with_lower(self) -> Self {
        match self {
            Self::Unknown | Self::Lower => Self::Lower,
            Self::Upper | Self::Mixed => Self::Mixed,
        }
    }

    fn with_upper(self) -> Self {
        match self {
            Self::Unknown | Self::Upper => Self::Upper,
            Self::Lower | Self::Mixed => Self::Mixed,
        }
    }
}

/// Packs a textual GUID into 16 bytes and picks its marker.
///
/// Returns `None` for anything that is not a single-case GUID, or that is a
/// double-quoted uppercase GUID.
pub fn try_encode_guid_string(s: &[u8]) -> Option<(u8, [u8; GUID_BYTES])> {
    let (body, quoted) = match s.len() {
        GUID_LENGTH => (s, false),
        QUOTED_GUID_LENGTH if s[0] == b'"' && s[QUOTED_GUID_LENGTH - 1] == b'"' => {
            (&s[1..QUOTED_GUID_LENGTH - 1], true)
        }
        _ => return None,
    };

    let mut case = GuidCase::Unknown;
    let mut digits = [0u8; 32];
    let mut n = 0;
    for (i, &c) in body.iter().enumerate() {
        if HYPHEN_OFFSETS.contains(&i) {
            if c != b'-' {
                return None;
            }
            continue;
        }
        let code = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => {
                case = case.with_lower();
                c - b'a' + 10
            }
            b'A'..=b'F' => {
                case = case.with_upper();
                c - b'A' + 10
            }
            _ => return None,
        };
        digits[n] = code;
        n += 1;
    }

    let m = match (case, quoted) {
        (GuidCase::Mixed, _) => {
            tracing::trace!("mixed-case GUID string, using generic string encoding");
            return None;
        }
        (GuidCase::Upper, true) => return None,
        (GuidCase::Upper, false) => marker::UPPERCASE_GUID_STRING,
        (_, true) => marker::DOUBLE_QUOTED_LOWERCASE_GUID_STRING,
        (_, false) => marker::LOWERCASE_GUID_STRING,
    };

    let mut packed = [0u8; GUID_BYTES];
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        packed[i] = pair[0] | (pair[1] << 4);
    }
    Some((m, packed))
}

/// Rebuilds the GUID text for a GUID-string marker.
pub fn decode_guid_string(m: u8, packed: &[u8; GUID_BYTES]) -> Option<Vec<u8>> {
    let (table, quoted) = match m {
        marker::LOWERCASE_GUID_STRING => (&LOWERCASE_HEX, false),
        marker::UPPERCASE_GUID_STRING => (&UPPERCASE_HEX, false),
        marker::DOUBLE_QUOTED_LOWERCASE_GUID_STRING => (&LOWERCASE_HEX, true),
        _ => return None,
    };

    let mut out = Vec::with_capacity(QUOTED_GUID_LENGTH);
    if quoted {
        out.push(b'"');
    }
    let start = out.len();
    for &b in packed {
        if HYPHEN_OFFSETS.contains(&(out.len() - start)) {
            out.push(b'-');
        }
        out.extend_from_slice(&table.decode_pair(b));
    }
    if quoted {
        out.push(b'"');
    }
    Some(out)
}

/// Writes a raw GUID value. The wire holds the little-endian field layout.
pub fn put_guid(buf: &mut BytesMut, guid: &Uuid) {
    buf.put_u8(marker::GUID);
    buf.put_slice(&guid.to_bytes_le());
}

pub fn guid_from_wire(bytes: [u8; GUID_BYTES]) -> Uuid {
    Uuid::from_bytes_le(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWER: &str = "2ea9f1d6-5b4c-4f0a-9e3d-7c1b8a6f0e42";
    const UPPER: &str = "2EA9F1D6-5B4C-4F0A-9E3D-7C1B8A6F0E42";

    #[test]
    fn lowercase_and_uppercase_markers_differ() {
        let (lm, lower) = try_encode_guid_string(LOWER.as_bytes()).unwrap();
        let (um, upper) = try_encode_guid_string(UPPER.as_bytes()).unwrap();
        assert_eq!(lm, marker::LOWERCASE_GUID_STRING);
        assert_eq!(um, marker::UPPERCASE_GUID_STRING);
        assert_eq!(lower, upper);
    }

    #[test]
    fn round_trips_text() {
        for s in [LOWER, UPPER] {
            let (m, packed) = try_encode_guid_string(s.as_bytes()).unwrap();
            assert_eq!(decode_guid_string(m, &packed).unwrap(), s.as_bytes());
        }
        let quoted = format!("\"{LOWER}\"");
        let (m, packed) = try_encode_guid_string(quoted.as_bytes()).unwrap();
        assert_eq!(m, marker::DOUBLE_QUOTED_LOWERCASE_GUID_STRING);
        assert_eq!(decode_guid_string(m, &packed).unwrap(), quoted.as_bytes());
    }

    #[test]
    fn rejects_mixed_case() {
        assert!(try_encode_guid_string(b"2ea9f1d6-5b4c-4f0a-9e3d-7C1B8A6F0E42").is_none());
    }

    #[test]
    fn rejects_quoted_uppercase() {
        let quoted = format!("\"{UPPER}\"");
        assert!(try_encode_guid_string(quoted.as_bytes()).is_none());
    }

    #[test]
    fn rejects_malformed() {
        assert!(try_encode_guid_string(b"2ea9f1d6-5b4c-4f0a-9e3d-7c1b8a6f0e4").is_none());
        assert!(try_encode_guid_string(b"2ea9f1d6x5b4c-4f0a-9e3d-7c1b8a6f0e42").is_none());
        assert!(try_encode_guid_string(b"2ea9f1d6-5b4c-4f0a-9e3d-7c1b8a6f0e4g").is_none());
        assert!(try_encode_guid_string(b"2ea9f1d6-5b4c-4f0a-9e3d-7c1b8a6f0e42-").is_none());
    }

    #[test]
    fn digits_only_is_lowercase() {
        let (m, _) = try_encode_guid_string(b"12345678-1234-1234-1234-123456789012").unwrap();
        assert_eq!(m, marker::LOWERCASE_GUID_STRING);
    }

    #[test]
    fn raw_guid_layout() {
        let guid = Uuid::parse_str(LOWER).unwrap();
        let mut buf = BytesMut::new();
        put_guid(&mut buf, &guid);
        assert_eq!(buf[0], marker::GUID);
        let mut raw = [0u8; GUID_BYTES];
        raw.copy_from_slice(&buf[1..]);
        assert_eq!(guid_from_wire(raw), guid);
    }
}
