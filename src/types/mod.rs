//! Value types shared by the binary and schema-directed codecs.

mod number;
mod utf8;
mod value;

pub use number::{DoubleEx, Number64};
pub use utf8::{Utf8Bytes, UtfAllString};
pub(crate) use utf8::escape_json;
pub use value::{JsonObject, JsonValue};
