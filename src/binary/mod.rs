//! The binary JSON wire format.
//!
//! Every value starts with a one-byte type marker. Small integers, common
//! property names and interned user strings fit entirely in the marker;
//! everything else is followed by a little-endian payload.

pub mod compression;
pub mod decode;
pub mod encode;
pub mod guid;
pub mod marker;
pub mod system_strings;
pub mod user_strings;

pub use decode::{decode_events, decode_value, decode_value_with, BinaryReader, DecoderOptions};
pub use encode::{
    encode_source, encode_source_with, encode_value, encode_value_with, BinaryWriter,
    EncoderOptions,
};
pub use user_strings::UserStringDictionary;
