//! Zero-copy UTF-8 views and the multi-view strings used by the lookup tables.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, Range};

use bytes::Bytes;

/// An immutable view over bytes known to hold valid UTF-8.
///
/// Cloning and slicing share the backing storage.
#[derive(Clone, Default)]
pub struct Utf8Bytes(Bytes);

impl Utf8Bytes {
    /// Validates `bytes` and wraps them. Returns the UTF-8 error on failure.
    pub fn try_from_bytes(bytes: Bytes) -> Result<Self, std::str::Utf8Error> {
        std::str::from_utf8(&bytes)?;
        Ok(Self(bytes))
    }

    /// Wraps bytes whose validity the caller has already established.
    ///
    /// # Safety
    ///
    /// `bytes` must be valid UTF-8: [`Utf8Bytes::as_str`] reads them without
    /// checking. The only caller wraps the output of the compressed string
    /// forms, whose alphabets and packed widths yield ASCII alone.
    pub(crate) fn from_bytes_unchecked(bytes: Bytes) -> Self {
        debug_assert!(std::str::from_utf8(&bytes).is_ok());
        Self(bytes)
    }

    pub fn from_static(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: `try_from_bytes` validates, the `str` conversions start from
        // valid UTF-8, and `from_bytes_unchecked` documents its requirement.
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Returns a sub-view sharing storage, or `None` if the range is out of
    /// bounds or splits a code point.
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        let s = self.as_str();
        if range.start > range.end
            || range.end > s.len()
            || !s.is_char_boundary(range.start)
            || !s.is_char_boundary(range.end)
        {
            return None;
        }
        Some(Self(self.0.slice(range)))
    }
}

impl Deref for Utf8Bytes {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Utf8Bytes {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for Utf8Bytes {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Utf8Bytes {}

impl PartialEq<str> for Utf8Bytes {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Utf8Bytes {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for Utf8Bytes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `str`'s hash for `Borrow<str>` lookups.
        self.as_str().hash(state);
    }
}

impl From<String> for Utf8Bytes {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&str> for Utf8Bytes {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl fmt::Debug for Utf8Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Utf8Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string held both raw and JSON-escaped, computed once.
///
/// Equality and hashing use the raw bytes only.
#[derive(Clone)]
pub struct UtfAllString {
    raw: Utf8Bytes,
    escaped: Utf8Bytes,
}

impl UtfAllString {
    pub fn new(raw: Utf8Bytes) -> Self {
        let escaped = escape_json(raw.as_str());
        Self {
            raw,
            escaped: Utf8Bytes::from(escaped),
        }
    }

    pub fn from_static(s: &'static str) -> Self {
        Self::new(Utf8Bytes::from_static(s))
    }

    pub fn utf8(&self) -> &Utf8Bytes {
        &self.raw
    }

    pub fn utf8_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// The escaped form, without surrounding quotes.
    pub fn escaped_bytes(&self) -> &[u8] {
        self.escaped.as_bytes()
    }

    pub fn escaped_str(&self) -> &str {
        self.escaped.as_str()
    }
}

impl PartialEq for UtfAllString {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for UtfAllString {}

impl Hash for UtfAllString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Debug for UtfAllString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// JSON-escapes `s` without the surrounding quotes.
pub(crate) fn escape_json(s: &str) -> String {
    // Serializing a str cannot fail.
    let quoted = serde_json::to_string(s).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|q| q.strip_suffix('"'))
        .map(str::to_owned)
        .unwrap_or_default()
}
