//! Binary decoding: bytes → JSON events.

use std::collections::HashMap;

use bytes::{Buf, Bytes};

use super::compression::{
    charset_for_marker, packed_bits_for_marker, packed_len, unpack_bits, unpack_with_base,
};
use super::guid::{decode_guid_string, guid_from_wire, GUID_BYTES};
use super::marker;
use super::system_strings::try_get_system_string_by_id;
use super::user_strings::UserStringDictionary;
use crate::error::{CodecError, DecodeErrorKind};
use crate::event::{JsonEvent, JsonEventSink, ValueBuilder};
use crate::types::{JsonValue, Number64, Utf8Bytes};

/// Nesting limit applied when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecoderOptions {
    /// Maximum container nesting accepted before decoding fails.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Reads one binary JSON document and replays it as events.
///
/// Raw string payloads are handed out as slices of the input buffer; only
/// compressed forms allocate.
pub struct BinaryReader {
    data: Bytes,
    pos: usize,
    options: DecoderOptions,
    user_strings: UserStringDictionary,
    /// Referenced strings by target offset, so a compressed target is
    /// unpacked once however often it is referenced.
    resolved: HashMap<usize, Utf8Bytes>,
}

impl BinaryReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_options(data, DecoderOptions::default())
    }

    pub fn with_options(data: impl Into<Bytes>, options: DecoderOptions) -> Self {
        Self::with_dictionary(data, options, UserStringDictionary::new())
    }

    /// Starts from the same pre-seeded dictionary the encoder was given.
    pub fn with_dictionary(
        data: impl Into<Bytes>,
        options: DecoderOptions,
        user_strings: UserStringDictionary,
    ) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            options,
            user_strings,
            resolved: HashMap::new(),
        }
    }

    pub fn user_strings(&self) -> &UserStringDictionary {
        &self.user_strings
    }

    /// Decodes the document into `sink`. The buffer must hold exactly one
    /// value.
    pub fn read_events<S: JsonEventSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), CodecError> {
        self.pos = 0;
        self.resolved.clear();
        let result = self.read_value(sink, 0).and_then(|()| {
            if self.pos == self.data.len() {
                Ok(())
            } else {
                Err(self.error(
                    DecodeErrorKind::InvalidToken,
                    self.pos,
                    format!("{} trailing byte(s)", self.data.len() - self.pos),
                ))
            }
        });
        match &result {
            Ok(()) => tracing::trace!(bytes = self.data.len(), "binary decode finished"),
            Err(e) => tracing::debug!(bytes = self.data.len(), error = %e, "binary decode failed"),
        }
        result
    }

    // -- Cursor --

    fn error(&self, kind: DecodeErrorKind, offset: usize, detail: impl Into<String>) -> CodecError {
        CodecError::decode(kind, offset, detail)
    }

    fn ensure_remaining(&self, n: usize) -> Result<(), CodecError> {
        let remaining = self.data.len() - self.pos;
        if remaining < n {
            return Err(self.error(
                DecodeErrorKind::TruncatedInput,
                self.pos,
                format!("need {n} byte(s), have {remaining}"),
            ));
        }
        Ok(())
    }

    /// Advances past `n` bytes and returns them.
    fn take(&mut self, n: usize) -> Result<Bytes, CodecError> {
        self.ensure_remaining(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.ensure_remaining(1)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Reads a little-endian unsigned field of 1 to 4 bytes.
    fn read_uint(&mut self, width: usize) -> Result<usize, CodecError> {
        let mut field = self.take(width)?;
        Ok(field.get_uint_le(width) as usize)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let field = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&field);
        Ok(out)
    }

    // -- Values --

    fn read_value<S: JsonEventSink + ?Sized>(
        &mut self,
        sink: &mut S,
        depth: usize,
    ) -> Result<(), CodecError> {
        let at = self.pos;
        let m = self.read_u8()?;

        let event = match m {
            m if marker::is_literal_integer(m) => {
                JsonEvent::Number(Number64::Integer(i64::from(m)))
            }
            m if marker::is_string(m) => JsonEvent::String(self.read_string(m, at)?),
            m if marker::is_fixed_width_number(m) => JsonEvent::Number(self.read_number(m)?),
            m if marker::is_container(m) => return self.read_container(m, sink, depth + 1),
            marker::NULL => JsonEvent::Null,
            marker::FALSE => JsonEvent::Bool(false),
            marker::TRUE => JsonEvent::Bool(true),
            marker::GUID => JsonEvent::Guid(guid_from_wire(self.read_array::<GUID_BYTES>()?)),
            marker::FLOAT32 => JsonEvent::Float32(self.take(4)?.get_f32_le()),
            marker::FLOAT64 => JsonEvent::Float64(self.take(8)?.get_f64_le()),
            marker::INT8 => JsonEvent::Int8(self.take(1)?.get_i8()),
            marker::INT16 => JsonEvent::Int16(self.take(2)?.get_i16_le()),
            marker::INT32 => JsonEvent::Int32(self.take(4)?.get_i32_le()),
            marker::INT64 => JsonEvent::Int64(self.take(8)?.get_i64_le()),
            marker::UINT32 => JsonEvent::UInt32(self.take(4)?.get_u32_le()),
            m if marker::is_binary(m) => {
                let width = self.field_width(m, at)?;
                let len = self.read_uint(width)?;
                JsonEvent::Binary(self.take(len)?)
            }
            m => {
                return Err(self.error(
                    DecodeErrorKind::InvalidTypeMarker,
                    at,
                    format!("unknown marker 0x{m:02X}"),
                ));
            }
        };
        sink.write_event(event)
    }

    fn read_number(&mut self, m: u8) -> Result<Number64, CodecError> {
        let n = match m {
            marker::NUMBER_UINT8 => Number64::Integer(i64::from(self.read_u8()?)),
            marker::NUMBER_INT16 => Number64::Integer(i64::from(self.take(2)?.get_i16_le())),
            marker::NUMBER_INT32 => Number64::Integer(i64::from(self.take(4)?.get_i32_le())),
            marker::NUMBER_INT64 => Number64::Integer(self.take(8)?.get_i64_le()),
            _ => Number64::Double(self.take(8)?.get_f64_le()),
        };
        Ok(n)
    }

    fn field_width(&self, m: u8, at: usize) -> Result<usize, CodecError> {
        marker::length_field_width(m).ok_or_else(|| {
            self.error(
                DecodeErrorKind::InvalidTypeMarker,
                at,
                format!("marker 0x{m:02X} has no length field"),
            )
        })
    }

    fn read_container<S: JsonEventSink + ?Sized>(
        &mut self,
        m: u8,
        sink: &mut S,
        depth: usize,
    ) -> Result<(), CodecError> {
        let at = self.pos - 1;
        if depth > self.options.max_depth {
            return Err(self.error(
                DecodeErrorKind::InvalidToken,
                at,
                format!("nesting deeper than {}", self.options.max_depth),
            ));
        }

        let is_object = marker::is_object(m);
        let (begin, end, first) = if is_object {
            (JsonEvent::BeginObject, JsonEvent::EndObject, marker::EMPTY_OBJECT)
        } else {
            (JsonEvent::BeginArray, JsonEvent::EndArray, marker::EMPTY_ARRAY)
        };
        sink.write_event(begin)?;

        // Offsets within a marker family: empty, single, three length
        // widths, then three length-and-count widths.
        match m - first {
            0 => {}
            1 => self.read_member(is_object, sink, depth)?,
            form => {
                let width = self.field_width(m, at)?;
                let len = self.read_uint(width)?;
                let count = if form >= 5 {
                    Some(self.read_uint(width)?)
                } else {
                    None
                };
                self.ensure_remaining(len)?;
                let limit = self.pos + len;
                let mut items = 0;
                while self.pos < limit {
                    self.read_member(is_object, sink, depth)?;
                    items += 1;
                }
                if self.pos > limit {
                    return Err(self.error(
                        DecodeErrorKind::UnterminatedContainer,
                        limit,
                        format!("last item overruns the container by {} byte(s)", self.pos - limit),
                    ));
                }
                if let Some(count) = count.filter(|&c| c != items) {
                    return Err(self.error(
                        DecodeErrorKind::InvalidToken,
                        at,
                        format!("container declares {count} item(s) but holds {items}"),
                    ));
                }
            }
        }

        sink.write_event(end)
    }

    fn read_member<S: JsonEventSink + ?Sized>(
        &mut self,
        is_object: bool,
        sink: &mut S,
        depth: usize,
    ) -> Result<(), CodecError> {
        if is_object {
            let name = self.read_property_name()?;
            sink.write_event(JsonEvent::FieldName(name))?;
        }
        self.read_value(sink, depth)
    }

    // -- Strings --

    /// Reads a property name. Names written in full join the user-string
    /// dictionary, mirroring the encoder.
    fn read_property_name(&mut self) -> Result<Utf8Bytes, CodecError> {
        let at = self.pos;
        let m = self.read_u8()?;
        if !marker::is_string(m) {
            return Err(self.error(
                DecodeErrorKind::InvalidToken,
                at,
                format!("marker 0x{m:02X} cannot start a property name"),
            ));
        }
        let name = self.read_string(m, at)?;
        if !marker::is_encoded_string(m)
            && !marker::is_reference_string(m)
            && self.user_strings.try_add(name.clone()).is_none()
        {
            tracing::trace!(name = %name, "user string dictionary full");
        }
        Ok(name)
    }

    fn read_string(&mut self, m: u8, at: usize) -> Result<Utf8Bytes, CodecError> {
        if let Some(id) = marker::system_string_id(m) {
            return try_get_system_string_by_id(id)
                .map(|s| s.utf8().clone())
                .ok_or_else(|| {
                    self.error(
                        DecodeErrorKind::InvalidNumberLiteral,
                        at,
                        format!("unknown system string {id}"),
                    )
                });
        }
        if marker::is_user_string(m) {
            let id = if marker::is_one_byte_user_string(m) {
                usize::from(m - marker::USER_STRING_1_BYTE_MIN)
            } else {
                let low = usize::from(self.read_u8()?);
                marker::USER_STRING_1_BYTE_COUNT
                    + (usize::from(m - marker::USER_STRING_2_BYTE_MIN) << 8)
                    + low
            };
            return self.user_strings.get(id).cloned().ok_or_else(|| {
                self.error(
                    DecodeErrorKind::InvalidNumberLiteral,
                    at,
                    format!("unknown user string {id}"),
                )
            });
        }
        if marker::is_reference_string(m) {
            let width = self.field_width(m, at)?;
            let offset = self.read_uint(width)?;
            return self.read_referenced_string(offset, at);
        }
        self.read_literal_string(m, at)
    }

    /// Decodes the string a back-reference points at. The target must be an
    /// earlier string written in full.
    fn read_referenced_string(
        &mut self,
        offset: usize,
        at: usize,
    ) -> Result<Utf8Bytes, CodecError> {
        let target = self.data.get(offset).copied().filter(|_| offset < at);
        let Some(m) = target.filter(|&m| {
            marker::is_string(m) && !marker::is_encoded_string(m) && !marker::is_reference_string(m)
        }) else {
            return Err(self.error(
                DecodeErrorKind::InvalidToken,
                at,
                format!("reference to offset {offset} does not point at an earlier string"),
            ));
        };
        if let Some(s) = self.resolved.get(&offset) {
            return Ok(s.clone());
        }
        let resume = self.pos;
        self.pos = offset + 1;
        let result = self.read_literal_string(m, offset);
        self.pos = resume;
        let s = result?;
        self.resolved.insert(offset, s.clone());
        Ok(s)
    }

    fn read_literal_string(&mut self, m: u8, at: usize) -> Result<Utf8Bytes, CodecError> {
        if let Some(len) = marker::get_encoded_string_length(m) {
            return self.read_raw_string(len, at);
        }
        if marker::is_variable_length_string(m) {
            let width = self.field_width(m, at)?;
            let len = self.read_uint(width)?;
            return self.read_raw_string(len, at);
        }
        if marker::is_guid_string(m) {
            let packed = self.read_array::<GUID_BYTES>()?;
            let text = decode_guid_string(m, &packed).ok_or_else(|| {
                self.error(DecodeErrorKind::InvalidTypeMarker, at, "unknown GUID string marker")
            })?;
            return Ok(Self::ascii_string(text));
        }
        if let Some(table) = charset_for_marker(m) {
            let len = usize::from(self.read_u8()?);
            let packed = self.take(packed_len(len, 4))?;
            return Ok(Self::ascii_string(table.decode_from(&packed, len)));
        }

        let bits = packed_bits_for_marker(m).ok_or_else(|| {
            self.error(
                DecodeErrorKind::InvalidTypeMarker,
                at,
                format!("marker 0x{m:02X} is not a string"),
            )
        })?;
        let text = match m {
            marker::PACKED_7BIT_STRING_LENGTH_1 => {
                let len = usize::from(self.read_u8()?);
                unpack_bits(&self.take(packed_len(len, 7))?, 7, len)
            }
            marker::PACKED_7BIT_STRING_LENGTH_2 => {
                let len = self.read_uint(2)?;
                unpack_bits(&self.take(packed_len(len, 7))?, 7, len)
            }
            _ => {
                let len = usize::from(self.read_u8()?);
                let base = self.read_u8()?;
                let packed = self.take(packed_len(len, bits))?;
                unpack_with_base(&packed, bits, base, len).ok_or_else(|| {
                    self.error(DecodeErrorKind::InvalidUtf8, at, "packed character outside ASCII")
                })?
            }
        };
        Ok(Self::ascii_string(text))
    }

    fn read_raw_string(&mut self, len: usize, at: usize) -> Result<Utf8Bytes, CodecError> {
        let bytes = self.take(len)?;
        Utf8Bytes::try_from_bytes(bytes)
            .map_err(|e| self.error(DecodeErrorKind::InvalidUtf8, at, e.to_string()))
    }

    /// Wraps the output of a compressed form. Every alphabet and packed
    /// width only yields ASCII.
    fn ascii_string(text: Vec<u8>) -> Utf8Bytes {
        Utf8Bytes::from_bytes_unchecked(Bytes::from(text))
    }
}

/// Decodes `data` into `sink` with default options.
pub fn decode_events<S: JsonEventSink + ?Sized>(
    data: impl Into<Bytes>,
    sink: &mut S,
) -> Result<(), CodecError> {
    BinaryReader::new(data).read_events(sink)
}

/// Decodes `data` into a value tree with default options.
pub fn decode_value(data: impl Into<Bytes>) -> Result<JsonValue, CodecError> {
    decode_value_with(data, DecoderOptions::default())
}

pub fn decode_value_with(
    data: impl Into<Bytes>,
    options: DecoderOptions,
) -> Result<JsonValue, CodecError> {
    let mut builder = ValueBuilder::new();
    BinaryReader::with_options(data, options).read_events(&mut builder)?;
    builder.finish()
}
