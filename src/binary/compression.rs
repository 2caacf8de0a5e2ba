//! Closed-charset string codecs: 4-bit hex and date-time alphabets, and
//! 4/5/6/7-bit packing of ASCII strings.
//!
//! All packing is LSB-first: the first character lands in the low bits of
//! the first byte.

use bytes::{BufMut, BytesMut};

use super::marker;

/// Marks a character outside a table's alphabet.
const NOT_IN_SET: u8 = 0xFF;

/// A 16-character alphabet with dense encode and decode tables.
pub struct CharsetTable {
    alphabet: [u8; 16],
    /// Bit `c` is set when ASCII character `c` is in the alphabet.
    bitmap: u128,
    /// ASCII character -> 4-bit code, `NOT_IN_SET` otherwise.
    encode: [u8; 128],
    /// Packed byte -> the two characters it holds, low nibble first.
    decode: [[u8; 2]; 256],
}

impl CharsetTable {
    const fn new(alphabet: &[u8; 16]) -> Self {
        let mut bitmap = 0u128;
        let mut encode = [NOT_IN_SET; 128];
        let mut i = 0;
        while i < 16 {
            let c = alphabet[i];
            bitmap |= 1u128 << c;
            encode[c as usize] = i as u8;
            i += 1;
        }

        let mut decode = [[0u8; 2]; 256];
        let mut b = 0;
        while b < 256 {
            decode[b] = [alphabet[b & 0x0F], alphabet[b >> 4]];
            b += 1;
        }

        Self {
            alphabet: *alphabet,
            bitmap,
            encode,
            decode,
        }
    }

    pub fn alphabet(&self) -> &[u8; 16] {
        &self.alphabet
    }

    pub fn contains(&self, c: u8) -> bool {
        c < 128 && (self.bitmap >> c) & 1 == 1
    }

    pub fn code(&self, c: u8) -> Option<u8> {
        match self.encode.get(usize::from(c)) {
            Some(&code) if code != NOT_IN_SET => Some(code),
            _ => None,
        }
    }

    pub fn can_encode(&self, s: &[u8]) -> bool {
        s.iter().all(|&c| self.contains(c))
    }

    /// The two characters packed into `byte`.
    pub fn decode_pair(&self, byte: u8) -> [u8; 2] {
        self.decode[usize::from(byte)]
    }

    /// Packs `s` two characters per byte. Every byte of `s` must be in the
    /// alphabet.
    pub fn encode_into(&self, s: &[u8], out: &mut BytesMut) {
        pack_bits(s.iter().map(|&c| self.encode[usize::from(c & 0x7F)]), 4, out);
    }

    /// Expands `packed` back into `len` characters.
    pub fn decode_from(&self, packed: &[u8], len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(packed.len() * 2);
        for &b in packed {
            out.extend_from_slice(&self.decode_pair(b));
        }
        out.truncate(len);
        out
    }
}

pub static LOWERCASE_HEX: CharsetTable = CharsetTable::new(b"0123456789abcdef");
pub static UPPERCASE_HEX: CharsetTable = CharsetTable::new(b"0123456789ABCDEF");
pub static DATE_TIME: CharsetTable = CharsetTable::new(b"0123456789 -.:TZ");

/// The table behind a hex or date-time marker.
pub fn charset_for_marker(m: u8) -> Option<&'static CharsetTable> {
    match m {
        marker::COMPRESSED_LOWERCASE_HEX_STRING => Some(&LOWERCASE_HEX),
        marker::COMPRESSED_UPPERCASE_HEX_STRING => Some(&UPPERCASE_HEX),
        marker::COMPRESSED_DATE_TIME_STRING => Some(&DATE_TIME),
        _ => None,
    }
}

/// Bits per character for a packed marker.
pub fn packed_bits_for_marker(m: u8) -> Option<u32> {
    match m {
        marker::PACKED_4BIT_STRING => Some(4),
        marker::PACKED_5BIT_STRING => Some(5),
        marker::PACKED_6BIT_STRING => Some(6),
        marker::PACKED_7BIT_STRING_LENGTH_1 | marker::PACKED_7BIT_STRING_LENGTH_2 => Some(7),
        _ => None,
    }
}

/// Bytes needed to hold `count` values of `bits` bits.
pub fn packed_len(count: usize, bits: u32) -> usize {
    (count * bits as usize).div_ceil(8)
}

pub fn pack_bits(values: impl Iterator<Item = u8>, bits: u32, out: &mut BytesMut) {
    let mut acc = 0u32;
    let mut filled = 0u32;
    for v in values {
        acc |= u32::from(v) << filled;
        filled += bits;
        while filled >= 8 {
            out.put_u8(acc as u8);
            acc >>= 8;
            filled -= 8;
        }
    }
    if filled > 0 {
        out.put_u8(acc as u8);
    }
}

/// Unpacks `count` values. `packed` must hold at least
/// `packed_len(count, bits)` bytes; missing bytes read as zero.
pub fn unpack_bits(packed: &[u8], bits: u32, count: usize) -> Vec<u8> {
    let mask = (1u32 << bits) - 1;
    let mut out = Vec::with_capacity(count);
    let mut bytes = packed.iter().copied();
    let mut acc = 0u32;
    let mut filled = 0u32;
    while out.len() < count {
        while filled < bits {
            acc |= u32::from(bytes.next().unwrap_or(0)) << filled;
            filled += 8;
        }
        out.push((acc & mask) as u8);
        acc >>= bits;
        filled -= bits;
    }
    out
}

/// How a string will be compressed, and what it costs on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPlan {
    pub marker: u8,
    /// Total encoded size, marker included.
    pub size: usize,
    /// Smallest byte, for the packed 4/5/6-bit forms.
    pub base: u8,
}

/// Picks the smallest compressed form of `s`, preferring earlier forms on
/// ties: lowercase hex, uppercase hex, date-time, 4-, 5-, 6-, then 7-bit.
pub fn plan_compression(s: &[u8]) -> Option<CompressionPlan> {
    let len = s.len();
    if len == 0 || len > usize::from(u16::MAX) {
        return None;
    }
    let short = len <= usize::from(u8::MAX);
    let mut best: Option<CompressionPlan> = None;

    if short {
        let nibble_size = 2 + packed_len(len, 4);
        if LOWERCASE_HEX.can_encode(s) {
            consider(&mut best, marker::COMPRESSED_LOWERCASE_HEX_STRING, nibble_size, 0);
        }
        if UPPERCASE_HEX.can_encode(s) {
            consider(&mut best, marker::COMPRESSED_UPPERCASE_HEX_STRING, nibble_size, 0);
        }
        if DATE_TIME.can_encode(s) {
            consider(&mut best, marker::COMPRESSED_DATE_TIME_STRING, nibble_size, 0);
        }
    }

    if !s.is_ascii() {
        return best;
    }

    if short {
        let (min, max) = s
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &c| (lo.min(c), hi.max(c)));
        let range = max - min;
        let packed = [
            (marker::PACKED_4BIT_STRING, 4),
            (marker::PACKED_5BIT_STRING, 5),
            (marker::PACKED_6BIT_STRING, 6),
        ]
        .into_iter()
        .find(|&(_, bits)| u32::from(range) < (1 << bits));
        if let Some((m, bits)) = packed {
            consider(&mut best, m, 3 + packed_len(len, bits), min);
        }
        consider(&mut best, marker::PACKED_7BIT_STRING_LENGTH_1, 2 + packed_len(len, 7), 0);
    } else {
        consider(&mut best, marker::PACKED_7BIT_STRING_LENGTH_2, 3 + packed_len(len, 7), 0);
    }

    best
}

fn consider(best: &mut Option<CompressionPlan>, marker: u8, size: usize, base: u8) {
    if best.is_none_or(|b| size < b.size) {
        *best = Some(CompressionPlan { marker, size, base });
    }
}

/// Writes `s` in the form chosen by `plan`.
pub fn write_compressed(out: &mut BytesMut, plan: &CompressionPlan, s: &[u8]) {
    out.put_u8(plan.marker);
    if let Some(table) = charset_for_marker(plan.marker) {
        out.put_u8(s.len() as u8);
        table.encode_into(s, out);
        return;
    }
    match plan.marker {
        marker::PACKED_7BIT_STRING_LENGTH_1 => {
            out.put_u8(s.len() as u8);
            pack_bits(s.iter().copied(), 7, out);
        }
        marker::PACKED_7BIT_STRING_LENGTH_2 => {
            out.put_u16_le(s.len() as u16);
            pack_bits(s.iter().copied(), 7, out);
        }
        m => {
            let bits = packed_bits_for_marker(m).unwrap_or(6);
            out.put_u8(s.len() as u8);
            out.put_u8(plan.base);
            pack_bits(s.iter().map(|&c| c - plan.base), bits, out);
        }
    }
}

/// Rebuilds the bytes of a packed 4/5/6-bit string. Returns `None` if a
/// character falls outside ASCII.
pub fn unpack_with_base(packed: &[u8], bits: u32, base: u8, len: usize) -> Option<Vec<u8>> {
    unpack_bits(packed, bits, len)
        .into_iter()
        .map(|code| base.checked_add(code).filter(u8::is_ascii))
        .collect()
}
