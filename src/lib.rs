//! binjson: a compact, self-describing binary encoding for JSON documents.
//!
//! Every value begins with a one-byte type marker. Small integers, well-known
//! property names and repeated property names are encoded in the marker
//! alone; strings that look like GUIDs, hex or timestamps are packed into
//! fewer bits; repeated string values can become back-references.
//!
//! # Architecture
//!
//! - **`binary`**: the self-describing format (markers, string dictionaries,
//!   compression, `BinaryWriter` and `BinaryReader`)
//! - **`event`**: the JSON event stream connecting producers and consumers
//! - **`text`**: JSON text output and the `serde_json` bridge
//! - **`schema`**: a schema-directed encoding with no markers at all
//! - **`types`**: values, numbers and zero-copy UTF-8 strings
//!
//! ```ignore
//! let value = binjson::JsonValue::object([("id", "abc".into()), ("n", 42.into())]);
//! let bytes = binjson::encode(&value)?;
//! assert_eq!(binjson::decode(bytes)?, value);
//! ```

pub mod binary;
pub mod error;
pub mod event;
pub mod format;
pub mod schema;
pub mod text;
pub mod types;

use bytes::Bytes;

pub use binary::{BinaryReader, BinaryWriter, DecoderOptions, EncoderOptions, UserStringDictionary};
pub use error::{CodecError, DecodeErrorKind};
pub use event::{JsonEvent, JsonEventSink, JsonEventSource, ValueBuilder};
pub use format::SerializationFormat;
pub use schema::{Field, Schema, SchemaDecoder, SchemaEncoder};
pub use text::{encode_json_text, transcode_to_text, TextWriter};
pub use types::{DoubleEx, JsonObject, JsonValue, Number64, Utf8Bytes, UtfAllString};

/// Encodes a value as binary JSON with default options.
pub fn encode(value: &JsonValue) -> Result<Bytes, CodecError> {
    binary::encode_value(value)
}

pub fn encode_with(value: &JsonValue, options: EncoderOptions) -> Result<Bytes, CodecError> {
    binary::encode_value_with(value, options)
}

/// Decodes one binary JSON document.
pub fn decode(data: impl Into<Bytes>) -> Result<JsonValue, CodecError> {
    binary::decode_value(data)
}

pub fn decode_with(
    data: impl Into<Bytes>,
    options: DecoderOptions,
) -> Result<JsonValue, CodecError> {
    binary::decode_value_with(data, options)
}
