//! Error types for binary JSON encoding and decoding.

use std::fmt;

/// Classifies why a decode failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    /// The buffer ended before the value did.
    TruncatedInput,
    /// A reserved or invalid leading byte.
    InvalidTypeMarker,
    /// String bytes that are not valid UTF-8.
    InvalidUtf8,
    /// A numeric index or literal outside its table (unknown user string,
    /// enum ordinal, union branch, overlong varint).
    InvalidNumberLiteral,
    /// A well-formed marker in a place where it is not allowed.
    InvalidToken,
    /// A container whose items do not end where its framing says they do.
    UnterminatedContainer,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TruncatedInput => "truncated input",
            Self::InvalidTypeMarker => "invalid type marker",
            Self::InvalidUtf8 => "invalid UTF-8",
            Self::InvalidNumberLiteral => "invalid number literal",
            Self::InvalidToken => "invalid token",
            Self::UnterminatedContainer => "unterminated container",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("decode error ({kind}) at offset {offset}: {detail}")]
    Decode {
        kind: DecodeErrorKind,
        offset: usize,
        detail: String,
    },

    #[error("value too large: {0}")]
    TooLarge(String),

    #[error("invalid event sequence: {0}")]
    EventSequence(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("JSON text error: {0}")]
    Text(#[from] serde_json::Error),
}

impl CodecError {
    /// Builds a decode error.
    pub fn decode(kind: DecodeErrorKind, offset: usize, detail: impl Into<String>) -> Self {
        Self::Decode {
            kind,
            offset,
            detail: detail.into(),
        }
    }

    /// Returns the decode error kind, if this is a decode error.
    pub fn decode_kind(&self) -> Option<DecodeErrorKind> {
        match self {
            Self::Decode { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
