//! Serialization format tags.

use crate::error::{CodecError, DecodeErrorKind};

/// The first byte a document store uses to tell payload formats apart.
///
/// The codec itself never writes this tag; binary output starts directly
/// with a type marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SerializationFormat {
    Text = 0,
    Binary = 128,
    HybridRow = 129,
}

impl From<SerializationFormat> for u8 {
    fn from(format: SerializationFormat) -> Self {
        format as u8
    }
}

impl TryFrom<u8> for SerializationFormat {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Text),
            128 => Ok(Self::Binary),
            129 => Ok(Self::HybridRow),
            _ => Err(CodecError::decode(
                DecodeErrorKind::InvalidTypeMarker,
                0,
                format!("unknown serialization format {tag}"),
            )),
        }
    }
}
