//! Type marker byte constants and range classification.
//!
//! Ranges are half-open: `*_MIN` is the first byte, `*_MAX` one past the last.

// Literal integers: the value is the marker itself (0..32)
pub const LITERAL_INT_MIN: u8 = 0x00;
pub const LITERAL_INT_MAX: u8 = 0x20;

// System string by 1-byte table index
pub const SYSTEM_STRING_MIN: u8 = 0x20;
pub const SYSTEM_STRING_MAX: u8 = 0x40;

// User string by 1-byte index (ids 0..32)
pub const USER_STRING_1_BYTE_MIN: u8 = 0x40;
pub const USER_STRING_1_BYTE_MAX: u8 = 0x60;

// User string by 2-byte index: the low 3 marker bits are the high id byte
pub const USER_STRING_2_BYTE_MIN: u8 = 0x60;
pub const USER_STRING_2_BYTE_MAX: u8 = 0x68;

// 0x68..0x75 reserved

// GUID strings, 16 packed bytes follow
pub const LOWERCASE_GUID_STRING: u8 = 0x75;
pub const UPPERCASE_GUID_STRING: u8 = 0x76;
pub const DOUBLE_QUOTED_LOWERCASE_GUID_STRING: u8 = 0x77;

// Compressed strings
pub const COMPRESSED_LOWERCASE_HEX_STRING: u8 = 0x78;
pub const COMPRESSED_UPPERCASE_HEX_STRING: u8 = 0x79;
pub const COMPRESSED_DATE_TIME_STRING: u8 = 0x7A;
pub const PACKED_4BIT_STRING: u8 = 0x7B;
pub const PACKED_5BIT_STRING: u8 = 0x7C;
pub const PACKED_6BIT_STRING: u8 = 0x7D;
pub const PACKED_7BIT_STRING_LENGTH_1: u8 = 0x7E;
pub const PACKED_7BIT_STRING_LENGTH_2: u8 = 0x7F;

// String with its byte length (0..64) in the marker
pub const ENCODED_STRING_LENGTH_MIN: u8 = 0x80;
pub const ENCODED_STRING_LENGTH_MAX: u8 = 0xC0;

// Variable-length strings
pub const STRING_1_BYTE_LENGTH: u8 = 0xC0;
pub const STRING_2_BYTE_LENGTH: u8 = 0xC1;
pub const STRING_4_BYTE_LENGTH: u8 = 0xC2;

// Reference strings: offset of an earlier string in the same buffer
pub const REFERENCE_STRING_1_BYTE_OFFSET: u8 = 0xC3;
pub const REFERENCE_STRING_2_BYTE_OFFSET: u8 = 0xC4;
pub const REFERENCE_STRING_3_BYTE_OFFSET: u8 = 0xC5;
pub const REFERENCE_STRING_4_BYTE_OFFSET: u8 = 0xC6;

// 0xC7 reserved

// Numbers
pub const NUMBER_UINT8: u8 = 0xC8;
pub const NUMBER_INT16: u8 = 0xC9;
pub const NUMBER_INT32: u8 = 0xCA;
pub const NUMBER_INT64: u8 = 0xCB;
pub const NUMBER_DOUBLE: u8 = 0xCC;
pub const FLOAT32: u8 = 0xCD;
pub const FLOAT64: u8 = 0xCE;

// 0xCF reserved

// Other primitives
pub const NULL: u8 = 0xD0;
pub const FALSE: u8 = 0xD1;
pub const TRUE: u8 = 0xD2;
pub const GUID: u8 = 0xD3;

// 0xD4..0xD8 reserved

// Typed integers
pub const INT8: u8 = 0xD8;
pub const INT16: u8 = 0xD9;
pub const INT32: u8 = 0xDA;
pub const INT64: u8 = 0xDB;
pub const UINT32: u8 = 0xDC;

// Binary blobs
pub const BINARY_1_BYTE_LENGTH: u8 = 0xDD;
pub const BINARY_2_BYTE_LENGTH: u8 = 0xDE;
pub const BINARY_4_BYTE_LENGTH: u8 = 0xDF;

// Arrays
pub const EMPTY_ARRAY: u8 = 0xE0;
pub const SINGLE_ITEM_ARRAY: u8 = 0xE1;
pub const ARRAY_1_BYTE_LENGTH: u8 = 0xE2;
pub const ARRAY_2_BYTE_LENGTH: u8 = 0xE3;
pub const ARRAY_4_BYTE_LENGTH: u8 = 0xE4;
pub const ARRAY_1_BYTE_LENGTH_AND_COUNT: u8 = 0xE5;
pub const ARRAY_2_BYTE_LENGTH_AND_COUNT: u8 = 0xE6;
pub const ARRAY_4_BYTE_LENGTH_AND_COUNT: u8 = 0xE7;

// Objects
pub const EMPTY_OBJECT: u8 = 0xE8;
pub const SINGLE_PROPERTY_OBJECT: u8 = 0xE9;
pub const OBJECT_1_BYTE_LENGTH: u8 = 0xEA;
pub const OBJECT_2_BYTE_LENGTH: u8 = 0xEB;
pub const OBJECT_4_BYTE_LENGTH: u8 = 0xEC;
pub const OBJECT_1_BYTE_LENGTH_AND_COUNT: u8 = 0xED;
pub const OBJECT_2_BYTE_LENGTH_AND_COUNT: u8 = 0xEE;
pub const OBJECT_4_BYTE_LENGTH_AND_COUNT: u8 = 0xEF;

// 0xF0..0xFF reserved

pub const INVALID: u8 = 0xFF;

/// Longest string whose length fits in the marker.
pub const MAX_ENCODED_STRING_LENGTH: usize =
    (ENCODED_STRING_LENGTH_MAX - ENCODED_STRING_LENGTH_MIN) as usize - 1;

/// Number of user strings addressable with a 1-byte marker.
pub const USER_STRING_1_BYTE_COUNT: usize =
    (USER_STRING_1_BYTE_MAX - USER_STRING_1_BYTE_MIN) as usize;

/// Total user-string ids addressable on the wire.
pub const MAX_USER_STRINGS: usize = USER_STRING_1_BYTE_COUNT
    + (USER_STRING_2_BYTE_MAX - USER_STRING_2_BYTE_MIN) as usize * 256;

// -- Range classification --

#[inline]
fn in_range(m: u8, min: u8, max: u8) -> bool {
    min <= m && m < max
}

pub fn is_literal_integer(m: u8) -> bool {
    in_range(m, LITERAL_INT_MIN, LITERAL_INT_MAX)
}

pub fn is_system_string(m: u8) -> bool {
    in_range(m, SYSTEM_STRING_MIN, SYSTEM_STRING_MAX)
}

pub fn is_one_byte_user_string(m: u8) -> bool {
    in_range(m, USER_STRING_1_BYTE_MIN, USER_STRING_1_BYTE_MAX)
}

pub fn is_two_byte_user_string(m: u8) -> bool {
    in_range(m, USER_STRING_2_BYTE_MIN, USER_STRING_2_BYTE_MAX)
}

pub fn is_user_string(m: u8) -> bool {
    is_one_byte_user_string(m) || is_two_byte_user_string(m)
}

/// System or user string: a dictionary reference.
pub fn is_encoded_string(m: u8) -> bool {
    is_system_string(m) || is_user_string(m)
}

pub fn is_guid_string(m: u8) -> bool {
    in_range(m, LOWERCASE_GUID_STRING, COMPRESSED_LOWERCASE_HEX_STRING)
}

pub fn is_compressed_string(m: u8) -> bool {
    in_range(m, COMPRESSED_LOWERCASE_HEX_STRING, ENCODED_STRING_LENGTH_MIN)
}

pub fn is_encoded_length_string(m: u8) -> bool {
    in_range(m, ENCODED_STRING_LENGTH_MIN, ENCODED_STRING_LENGTH_MAX)
}

pub fn is_variable_length_string(m: u8) -> bool {
    in_range(m, STRING_1_BYTE_LENGTH, REFERENCE_STRING_1_BYTE_OFFSET)
}

pub fn is_reference_string(m: u8) -> bool {
    in_range(m, REFERENCE_STRING_1_BYTE_OFFSET, REFERENCE_STRING_4_BYTE_OFFSET + 1)
}

pub fn is_string(m: u8) -> bool {
    is_encoded_string(m)
        || is_guid_string(m)
        || is_compressed_string(m)
        || is_encoded_length_string(m)
        || is_variable_length_string(m)
        || is_reference_string(m)
}

pub fn is_fixed_width_number(m: u8) -> bool {
    in_range(m, NUMBER_UINT8, FLOAT32)
}

/// A JSON number: literal or fixed-width.
pub fn is_number(m: u8) -> bool {
    is_literal_integer(m) || is_fixed_width_number(m)
}

pub fn is_float(m: u8) -> bool {
    m == FLOAT32 || m == FLOAT64
}

pub fn is_typed_integer(m: u8) -> bool {
    in_range(m, INT8, BINARY_1_BYTE_LENGTH)
}

pub fn is_binary(m: u8) -> bool {
    in_range(m, BINARY_1_BYTE_LENGTH, EMPTY_ARRAY)
}

pub fn is_array(m: u8) -> bool {
    in_range(m, EMPTY_ARRAY, EMPTY_OBJECT)
}

pub fn is_object(m: u8) -> bool {
    in_range(m, EMPTY_OBJECT, 0xF0)
}

pub fn is_container(m: u8) -> bool {
    is_array(m) || is_object(m)
}

/// Whether `m` may start a value.
pub fn is_valid(m: u8) -> bool {
    is_number(m)
        || is_string(m)
        || is_float(m)
        || in_range(m, NULL, 0xD4)
        || is_typed_integer(m)
        || is_binary(m)
        || is_container(m)
}

// -- Marker construction --

/// The literal marker for `value`, or `None` when it is outside 0..32.
pub fn encode_integer_literal(value: i64) -> Option<u8> {
    if (i64::from(LITERAL_INT_MIN)..i64::from(LITERAL_INT_MAX)).contains(&value) {
        Some(LITERAL_INT_MIN + value as u8)
    } else {
        None
    }
}

/// The encoded-length marker for a string of `length` bytes, or `None` when
/// it does not fit in the marker.
pub fn try_get_encoded_string_length_marker(length: usize) -> Option<u8> {
    if length <= MAX_ENCODED_STRING_LENGTH {
        Some(ENCODED_STRING_LENGTH_MIN + length as u8)
    } else {
        None
    }
}

/// The byte length carried by an encoded-length marker.
pub fn get_encoded_string_length(m: u8) -> Option<usize> {
    is_encoded_length_string(m).then(|| usize::from(m - ENCODED_STRING_LENGTH_MIN))
}

pub fn system_string_marker(id: u8) -> Option<u8> {
    let m = SYSTEM_STRING_MIN.checked_add(id)?;
    is_system_string(m).then_some(m)
}

pub fn system_string_id(m: u8) -> Option<u8> {
    is_system_string(m).then(|| m - SYSTEM_STRING_MIN)
}

/// Marker bytes for a user-string id: one byte for ids below 32, two after.
pub fn user_string_marker(id: usize) -> Option<([u8; 2], usize)> {
    if id < USER_STRING_1_BYTE_COUNT {
        Some(([USER_STRING_1_BYTE_MIN + id as u8, 0], 1))
    } else if id < MAX_USER_STRINGS {
        let rest = id - USER_STRING_1_BYTE_COUNT;
        Some(([USER_STRING_2_BYTE_MIN + (rest >> 8) as u8, rest as u8], 2))
    } else {
        None
    }
}

/// Width in bytes of the length (and count) fields that follow `m`.
pub fn length_field_width(m: u8) -> Option<usize> {
    match m {
        STRING_1_BYTE_LENGTH | BINARY_1_BYTE_LENGTH | ARRAY_1_BYTE_LENGTH | OBJECT_1_BYTE_LENGTH
        | ARRAY_1_BYTE_LENGTH_AND_COUNT | OBJECT_1_BYTE_LENGTH_AND_COUNT
        | REFERENCE_STRING_1_BYTE_OFFSET => Some(1),
        STRING_2_BYTE_LENGTH | BINARY_2_BYTE_LENGTH | ARRAY_2_BYTE_LENGTH | OBJECT_2_BYTE_LENGTH
        | ARRAY_2_BYTE_LENGTH_AND_COUNT | OBJECT_2_BYTE_LENGTH_AND_COUNT
        | REFERENCE_STRING_2_BYTE_OFFSET => Some(2),
        REFERENCE_STRING_3_BYTE_OFFSET => Some(3),
        STRING_4_BYTE_LENGTH | BINARY_4_BYTE_LENGTH | ARRAY_4_BYTE_LENGTH | OBJECT_4_BYTE_LENGTH
        | ARRAY_4_BYTE_LENGTH_AND_COUNT | OBJECT_4_BYTE_LENGTH_AND_COUNT
        | REFERENCE_STRING_4_BYTE_OFFSET => Some(4),
        _ => None,
    }
}
