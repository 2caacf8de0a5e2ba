//! Binary encoding: JSON events → bytes.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::compression::{plan_compression, write_compressed, CompressionPlan};
use super::guid::{put_guid, try_encode_guid_string, GUID_BYTES};
use super::marker;
use super::system_strings::get_system_string_id;
use super::user_strings::UserStringDictionary;
use crate::error::CodecError;
use crate::event::{EventGrammar, JsonEvent, JsonEventSink, JsonEventSource, Position};
use crate::types::{JsonValue, Number64, Utf8Bytes};

/// Room reserved for a container header: marker + 4-byte length + 4-byte count.
const RESERVED_HEADER: usize = 9;

/// Encoder configuration.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    user_strings: bool,
    compress_strings: bool,
    reference_strings: bool,
    container_counts: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            user_strings: true,
            compress_strings: true,
            reference_strings: false,
            container_counts: false,
        }
    }
}

impl EncoderOptions {
    /// Intern property names into the user-string dictionary.
    pub fn user_strings(mut self, enabled: bool) -> Self {
        self.user_strings = enabled;
        self
    }

    /// Use the GUID, hex, date-time and packed-bit string forms.
    pub fn compress_strings(mut self, enabled: bool) -> Self {
        self.compress_strings = enabled;
        self
    }

    /// Replace repeated string values with back-references.
    pub fn reference_strings(mut self, enabled: bool) -> Self {
        self.reference_strings = enabled;
        self
    }

    /// Write item counts alongside container lengths.
    pub fn container_counts(mut self, enabled: bool) -> Self {
        self.container_counts = enabled;
        self
    }
}

/// How a string that is not a dictionary hit goes on the wire.
enum LiteralString {
    Guid(u8, [u8; GUID_BYTES]),
    Compressed(CompressionPlan),
    /// Uncompressed, with a header of this many bytes.
    Plain(usize),
}

impl LiteralString {
    fn plan(s: &[u8], compress: bool) -> Result<Self, CodecError> {
        let len = s.len();
        let header = if len <= marker::MAX_ENCODED_STRING_LENGTH {
            1
        } else if len <= usize::from(u8::MAX) {
            2
        } else if len <= usize::from(u16::MAX) {
            3
        } else if u32::try_from(len).is_ok() {
            5
        } else {
            return Err(CodecError::TooLarge(format!("string of {len} bytes")));
        };

        if compress {
            if let Some((m, packed)) = try_encode_guid_string(s) {
                return Ok(Self::Guid(m, packed));
            }
            if let Some(plan) = plan_compression(s) {
                if plan.size < header + len {
                    return Ok(Self::Compressed(plan));
                }
            }
        }
        Ok(Self::Plain(header))
    }

    fn size(&self, len: usize) -> usize {
        match self {
            Self::Guid(..) => 1 + GUID_BYTES,
            Self::Compressed(plan) => plan.size,
            Self::Plain(header) => header + len,
        }
    }
}

struct OpenContainer {
    is_object: bool,
    start: usize,
    count: usize,
}

struct ReferenceSite {
    at: usize,
    width: usize,
    target: usize,
}

/// String values written in full, and the references pointing at them.
///
/// Both lists stay in buffer order, so closing a container only has to
/// adjust a suffix of each.
#[derive(Default)]
struct ReferenceTable {
    targets: Vec<usize>,
    by_value: HashMap<Utf8Bytes, usize>,
    sites: Vec<ReferenceSite>,
}

impl ReferenceTable {
    fn record(&mut self, value: &Utf8Bytes, at: usize) {
        if !self.by_value.contains_key(value) {
            self.by_value.insert(value.clone(), self.targets.len());
            self.targets.push(at);
        }
    }

    fn shift_from(&mut self, from: usize, delta: usize) {
        let first = self.targets.partition_point(|&p| p < from);
        for p in &mut self.targets[first..] {
            *p -= delta;
        }
        let first = self.sites.partition_point(|site| site.at < from);
        for site in &mut self.sites[first..] {
            site.at -= delta;
        }
    }

    /// Rewrites every reference with its target's final offset. Offsets only
    /// shrink while encoding, so each still fits its width.
    fn patch(&self, buf: &mut BytesMut) {
        for site in &self.sites {
            let offset = (self.targets[site.target] as u32).to_le_bytes();
            buf[site.at..site.at + site.width].copy_from_slice(&offset[..site.width]);
        }
    }
}

fn offset_width(offset: usize) -> Option<usize> {
    match offset {
        0..=0xFF => Some(1),
        0x100..=0xFFFF => Some(2),
        0x1_0000..=0xFF_FFFF => Some(3),
        _ if u32::try_from(offset).is_ok() => Some(4),
        _ => None,
    }
}

/// Writes JSON events as binary JSON.
pub struct BinaryWriter {
    buf: BytesMut,
    options: EncoderOptions,
    user_strings: UserStringDictionary,
    grammar: EventGrammar,
    open: Vec<OpenContainer>,
    references: ReferenceTable,
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::with_options(EncoderOptions::default())
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        Self::with_dictionary(options, UserStringDictionary::new())
    }

    /// Starts from a pre-seeded user-string dictionary. The decoder must be
    /// given the same seed.
    pub fn with_dictionary(options: EncoderOptions, user_strings: UserStringDictionary) -> Self {
        Self {
            buf: BytesMut::new(),
            options,
            user_strings,
            grammar: EventGrammar::default(),
            open: Vec::new(),
            references: ReferenceTable::default(),
        }
    }

    pub fn user_strings(&self) -> &UserStringDictionary {
        &self.user_strings
    }

    /// Returns the encoded document. Fails if it is incomplete.
    pub fn finish(mut self) -> Result<Bytes, CodecError> {
        if !self.grammar.is_complete() {
            return Err(CodecError::EventSequence(format!(
                "document incomplete with {} open container(s)",
                self.grammar.depth()
            )));
        }
        self.references.patch(&mut self.buf);
        tracing::debug!(
            bytes = self.buf.len(),
            user_strings = self.user_strings.len(),
            references = self.references.sites.len(),
            "binary encode finished"
        );
        Ok(self.buf.freeze())
    }

    fn begin_container(&mut self, is_object: bool) {
        self.open.push(OpenContainer {
            is_object,
            start: self.buf.len(),
            count: 0,
        });
        self.buf.put_bytes(0, RESERVED_HEADER);
    }

    fn end_container(&mut self) -> Result<(), CodecError> {
        let container = self
            .open
            .pop()
            .ok_or_else(|| CodecError::EventSequence("no open container".into()))?;
        let payload_start = container.start + RESERVED_HEADER;
        let end = self.buf.len();

        let mut header = [0u8; RESERVED_HEADER];
        let header_len = container_header(
            container.is_object,
            end - payload_start,
            container.count,
            self.options.container_counts,
            &mut header,
        )?;

        self.buf[container.start..container.start + header_len]
            .copy_from_slice(&header[..header_len]);
        self.buf
            .copy_within(payload_start..end, container.start + header_len);
        let delta = RESERVED_HEADER - header_len;
        self.buf.truncate(end - delta);
        self.references.shift_from(payload_start, delta);
        Ok(())
    }

    fn write_property_name(&mut self, name: &Utf8Bytes) -> Result<(), CodecError> {
        if let Some(id) = get_system_string_id(name.as_bytes()) {
            self.buf.put_u8(marker::SYSTEM_STRING_MIN + id);
            return Ok(());
        }
        if self.options.user_strings && self.write_user_string(name) {
            return Ok(());
        }
        self.write_literal_string(name)?;
        if self.options.user_strings && self.user_strings.try_add(name.clone()).is_none() {
            tracing::trace!(name = %name, "user string dictionary full");
        }
        Ok(())
    }

    fn write_string_value(&mut self, s: &Utf8Bytes) -> Result<(), CodecError> {
        if let Some(id) = get_system_string_id(s.as_bytes()) {
            self.buf.put_u8(marker::SYSTEM_STRING_MIN + id);
            return Ok(());
        }
        if self.options.user_strings && self.write_user_string(s) {
            return Ok(());
        }

        let literal = LiteralString::plan(s.as_bytes(), self.options.compress_strings)?;
        if self.options.reference_strings {
            if let Some(&target) = self.references.by_value.get(s) {
                let offset = self.references.targets[target];
                if let Some(width) = offset_width(offset) {
                    if 1 + width < literal.size(s.len()) {
                        self.write_reference(target, offset, width);
                        return Ok(());
                    }
                }
            }
            self.references.record(s, self.buf.len());
        }
        self.put_literal(s.as_bytes(), &literal);
        Ok(())
    }

    fn write_user_string(&mut self, s: &str) -> bool {
        let Some((bytes, len)) = self
            .user_strings
            .get_id(s)
            .and_then(marker::user_string_marker)
        else {
            return false;
        };
        self.buf.put_slice(&bytes[..len]);
        true
    }

    fn write_reference(&mut self, target: usize, offset: usize, width: usize) {
        self.buf
            .put_u8(marker::REFERENCE_STRING_1_BYTE_OFFSET + (width - 1) as u8);
        let at = self.buf.len();
        self.buf.put_slice(&(offset as u32).to_le_bytes()[..width]);
        self.references.sites.push(ReferenceSite { at, width, target });
    }

    fn write_literal_string(&mut self, s: &Utf8Bytes) -> Result<(), CodecError> {
        let literal = LiteralString::plan(s.as_bytes(), self.options.compress_strings)?;
        self.put_literal(s.as_bytes(), &literal);
        Ok(())
    }

    fn put_literal(&mut self, s: &[u8], literal: &LiteralString) {
        match literal {
            LiteralString::Guid(m, packed) => {
                self.buf.put_u8(*m);
                self.buf.put_slice(packed);
            }
            LiteralString::Compressed(plan) => write_compressed(&mut self.buf, plan, s),
            LiteralString::Plain(header) => {
                let len = s.len();
                match header {
                    1 => self.buf.put_u8(marker::ENCODED_STRING_LENGTH_MIN + len as u8),
                    2 => {
                        self.buf.put_u8(marker::STRING_1_BYTE_LENGTH);
                        self.buf.put_u8(len as u8);
                    }
                    3 => {
                        self.buf.put_u8(marker::STRING_2_BYTE_LENGTH);
                        self.buf.put_u16_le(len as u16);
                    }
                    _ => {
                        self.buf.put_u8(marker::STRING_4_BYTE_LENGTH);
                        self.buf.put_u32_le(len as u32);
                    }
                }
                self.buf.put_slice(s);
            }
        }
    }

    fn write_number(&mut self, n: Number64) {
        match n.as_exact_integer() {
            Some(i) => self.write_integer(i),
            None => {
                self.buf.put_u8(marker::NUMBER_DOUBLE);
                self.buf.put_f64_le(n.to_double());
            }
        }
    }

    /// Writes an integer using the smallest representation that holds it.
    fn write_integer(&mut self, value: i64) {
        if let Some(m) = marker::encode_integer_literal(value) {
            self.buf.put_u8(m);
        } else if let Ok(v) = u8::try_from(value) {
            self.buf.put_u8(marker::NUMBER_UINT8);
            self.buf.put_u8(v);
        } else if let Ok(v) = i16::try_from(value) {
            self.buf.put_u8(marker::NUMBER_INT16);
            self.buf.put_i16_le(v);
        } else if let Ok(v) = i32::try_from(value) {
            self.buf.put_u8(marker::NUMBER_INT32);
            self.buf.put_i32_le(v);
        } else {
            self.buf.put_u8(marker::NUMBER_INT64);
            self.buf.put_i64_le(value);
        }
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<(), CodecError> {
        let len = value.len();
        if let Ok(l) = u8::try_from(len) {
            self.buf.put_u8(marker::BINARY_1_BYTE_LENGTH);
            self.buf.put_u8(l);
        } else if let Ok(l) = u16::try_from(len) {
            self.buf.put_u8(marker::BINARY_2_BYTE_LENGTH);
            self.buf.put_u16_le(l);
        } else if let Ok(l) = u32::try_from(len) {
            self.buf.put_u8(marker::BINARY_4_BYTE_LENGTH);
            self.buf.put_u32_le(l);
        } else {
            return Err(CodecError::TooLarge(format!("binary value of {len} bytes")));
        }
        self.buf.put_slice(value);
        Ok(())
    }
}

impl JsonEventSink for BinaryWriter {
    fn write_event(&mut self, event: JsonEvent) -> Result<(), CodecError> {
        let position = self.grammar.accept(&event)?;
        if matches!(position, Position::ArrayItem | Position::PropertyValue) {
            if let Some(parent) = self.open.last_mut() {
                parent.count += 1;
            }
        }

        match event {
            JsonEvent::BeginArray => self.begin_container(false),
            JsonEvent::BeginObject => self.begin_container(true),
            JsonEvent::EndArray | JsonEvent::EndObject => self.end_container()?,
            JsonEvent::FieldName(name) => self.write_property_name(&name)?,
            JsonEvent::String(s) => self.write_string_value(&s)?,
            JsonEvent::Number(n) => self.write_number(n),
            JsonEvent::Bool(b) => self.buf.put_u8(if b { marker::TRUE } else { marker::FALSE }),
            JsonEvent::Null => self.buf.put_u8(marker::NULL),
            JsonEvent::Int8(v) => {
                self.buf.put_u8(marker::INT8);
                self.buf.put_i8(v);
            }
            JsonEvent::Int16(v) => {
                self.buf.put_u8(marker::INT16);
                self.buf.put_i16_le(v);
            }
            JsonEvent::Int32(v) => {
                self.buf.put_u8(marker::INT32);
                self.buf.put_i32_le(v);
            }
            JsonEvent::Int64(v) => {
                self.buf.put_u8(marker::INT64);
                self.buf.put_i64_le(v);
            }
            JsonEvent::UInt32(v) => {
                self.buf.put_u8(marker::UINT32);
                self.buf.put_u32_le(v);
            }
            JsonEvent::Float32(v) => {
                self.buf.put_u8(marker::FLOAT32);
                self.buf.put_f32_le(v);
            }
            JsonEvent::Float64(v) => {
                self.buf.put_u8(marker::FLOAT64);
                self.buf.put_f64_le(v);
            }
            JsonEvent::Guid(g) => put_guid(&mut self.buf, &g),
            JsonEvent::Binary(b) => self.write_binary(&b)?,
        }
        Ok(())
    }
}

/// Fills `out` with the header for a finished container and returns its size.
fn container_header(
    is_object: bool,
    len: usize,
    count: usize,
    with_count: bool,
    out: &mut [u8; RESERVED_HEADER],
) -> Result<usize, CodecError> {
    let (empty, single, sized) = if is_object {
        (
            marker::EMPTY_OBJECT,
            marker::SINGLE_PROPERTY_OBJECT,
            marker::OBJECT_1_BYTE_LENGTH,
        )
    } else {
        (
            marker::EMPTY_ARRAY,
            marker::SINGLE_ITEM_ARRAY,
            marker::ARRAY_1_BYTE_LENGTH,
        )
    };

    match count {
        0 => {
            out[0] = empty;
            return Ok(1);
        }
        1 if !with_count => {
            out[0] = single;
            return Ok(1);
        }
        _ => {}
    }

    let widest = if with_count { len.max(count) } else { len };
    let (width, step) = if widest <= usize::from(u8::MAX) {
        (1, 0)
    } else if widest <= usize::from(u16::MAX) {
        (2, 1)
    } else if u32::try_from(widest).is_ok() {
        (4, 2)
    } else {
        return Err(CodecError::TooLarge(format!("container of {len} bytes")));
    };

    // The length-and-count forms follow the three length-only forms.
    out[0] = sized + step + if with_count { 3 } else { 0 };
    out[1..1 + width].copy_from_slice(&(len as u32).to_le_bytes()[..width]);
    if with_count {
        out[1 + width..1 + 2 * width].copy_from_slice(&(count as u32).to_le_bytes()[..width]);
        Ok(1 + 2 * width)
    } else {
        Ok(1 + width)
    }
}

/// Encodes any event source with default options.
pub fn encode_source<S: JsonEventSource + ?Sized>(source: &S) -> Result<Bytes, CodecError> {
    encode_source_with(source, EncoderOptions::default())
}

pub fn encode_source_with<S: JsonEventSource + ?Sized>(
    source: &S,
    options: EncoderOptions,
) -> Result<Bytes, CodecError> {
    let mut writer = BinaryWriter::with_options(options);
    source.emit(&mut writer)?;
    writer.finish()
}

/// Encodes a value with default options.
pub fn encode_value(value: &JsonValue) -> Result<Bytes, CodecError> {
    encode_source(value)
}

pub fn encode_value_with(value: &JsonValue, options: EncoderOptions) -> Result<Bytes, CodecError> {
    encode_source_with(value, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(value: &JsonValue) -> Vec<u8> {
        encode_value(value).unwrap().to_vec()
    }

    #[test]
    fn encode_primitives() {
        assert_eq!(enc(&JsonValue::Null), [0xD0]);
        assert_eq!(enc(&JsonValue::Bool(false)), [0xD1]);
        assert_eq!(enc(&JsonValue::Bool(true)), [0xD2]);
    }

    #[test]
    fn encode_literal_integers() {
        assert_eq!(enc(&0.into()), [0x00]);
        assert_eq!(enc(&31.into()), [0x1F]);
        assert_eq!(enc(&32.into()), [marker::NUMBER_UINT8, 32]);
        assert_eq!(enc(&(-1).into()), [marker::NUMBER_INT16, 0xFF, 0xFF]);
    }

    #[test]
    fn encode_integer_widths() {
        assert_eq!(enc(&255.into()), [marker::NUMBER_UINT8, 0xFF]);
        assert_eq!(enc(&256.into()), [marker::NUMBER_INT16, 0x00, 0x01]);
        assert_eq!(enc(&(-32768).into()), [marker::NUMBER_INT16, 0x00, 0x80]);
        assert_eq!(
            enc(&32768.into()),
            [marker::NUMBER_INT32, 0x00, 0x80, 0x00, 0x00]
        );
        let big = enc(&i64::MAX.into());
        assert_eq!(big[0], marker::NUMBER_INT64);
        assert_eq!(&big[1..], &i64::MAX.to_le_bytes());
    }

    #[test]
    fn integral_doubles_take_the_integer_path() {
        assert_eq!(enc(&3.0.into()), [0x03]);
        let neg_zero = enc(&(-0.0).into());
        assert_eq!(neg_zero[0], marker::NUMBER_DOUBLE);
        let half = enc(&0.5.into());
        assert_eq!(half[0], marker::NUMBER_DOUBLE);
        assert_eq!(&half[1..], &0.5f64.to_le_bytes());
    }

    #[test]
    fn encode_strings() {
        assert_eq!(enc(&"".into()), [0x80]);
        assert_eq!(enc(&"foo".into()), [0x83, b'f', b'o', b'o']);
        assert_eq!(enc(&"id".into()), [0x2C]);
        let long = "\u{e9}".repeat(40);
        let out = enc(&long.as_str().into());
        assert_eq!(&out[..2], &[marker::STRING_1_BYTE_LENGTH, 80]);
        let longer = "\u{e9}".repeat(200);
        let out = enc(&longer.as_str().into());
        assert_eq!(&out[..3], &[marker::STRING_2_BYTE_LENGTH, 0x90, 0x01]);
    }

    #[test]
    fn encode_compressed_hex() {
        let out = enc(&"0123456789abcdef".into());
        assert_eq!(out, [0x78, 16, 0x10, 0x32, 0x54, 0x76, 0x98, 0xBA, 0xDC, 0xFE]);
    }

    #[test]
    fn compression_can_be_disabled() {
        let options = EncoderOptions::default().compress_strings(false);
        let out = encode_value_with(&"0123456789abcdef".into(), options).unwrap();
        assert_eq!(out[0], 0x80 + 16);
    }

    #[test]
    fn encode_arrays() {
        assert_eq!(enc(&JsonValue::Array(vec![])), [0xE0]);
        assert_eq!(enc(&JsonValue::Array(vec![1.into()])), [0xE1, 0x01]);
        assert_eq!(
            enc(&JsonValue::Array(vec![1.into(), 2.into()])),
            [0xE2, 0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn encode_array_with_counts() {
        let options = EncoderOptions::default().container_counts(true);
        let out = encode_value_with(&JsonValue::Array(vec![1.into(), 2.into()]), options).unwrap();
        assert_eq!(&out[..], &[0xE5, 0x02, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn encode_large_array_uses_wider_length() {
        let items: Vec<JsonValue> = (0..100).map(|_| JsonValue::from(1000)).collect();
        let out = enc(&JsonValue::Array(items));
        assert_eq!(&out[..3], &[marker::ARRAY_2_BYTE_LENGTH, 0x2C, 0x01]);
        assert_eq!(out.len(), 3 + 300);
    }

    #[test]
    fn encode_objects() {
        assert_eq!(enc(&JsonValue::Object(vec![])), [0xE8]);
        assert_eq!(
            enc(&JsonValue::object([("a", 1.into())])),
            [0xE9, 0x81, b'a', 0x01]
        );
    }

    #[test]
    fn repeated_names_become_user_strings() {
        let value = JsonValue::Array(vec![
            JsonValue::object([("abc", 1.into())]),
            JsonValue::object([("abc", 2.into())]),
        ]);
        assert_eq!(
            enc(&value),
            [0xE2, 9, 0xE9, 0x83, b'a', b'b', b'c', 0x01, 0xE9, 0x40, 0x02]
        );
    }

    #[test]
    fn user_strings_can_be_disabled() {
        let value = JsonValue::Array(vec![
            JsonValue::object([("abc", 1.into())]),
            JsonValue::object([("abc", 2.into())]),
        ]);
        let options = EncoderOptions::default().user_strings(false);
        let out = encode_value_with(&value, options).unwrap();
        assert_eq!(out.len(), 2 + 6 + 6);
    }

    #[test]
    fn repeated_values_become_references() {
        let value = JsonValue::Array(vec!["hello world!".into(), "hello world!".into()]);
        let options = EncoderOptions::default().reference_strings(true);
        let out = encode_value_with(&value, options).unwrap();
        let mut expected = vec![0xE2, 15, 0x8C];
        expected.extend_from_slice(b"hello world!");
        expected.extend_from_slice(&[marker::REFERENCE_STRING_1_BYTE_OFFSET, 2]);
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn short_values_are_not_referenced() {
        let value = JsonValue::Array(vec!["a".into(), "a".into()]);
        let options = EncoderOptions::default().reference_strings(true);
        let out = encode_value_with(&value, options).unwrap();
        assert_eq!(&out[..], &[0xE2, 4, 0x81, b'a', 0x81, b'a']);
    }

    #[test]
    fn typed_values() {
        assert_eq!(enc(&JsonValue::Int8(-2)), [marker::INT8, 0xFE]);
        assert_eq!(enc(&JsonValue::UInt32(1)), [marker::UINT32, 1, 0, 0, 0]);
        assert_eq!(
            enc(&JsonValue::Float32(42.0)),
            [marker::FLOAT32, 0x00, 0x00, 0x28, 0x42]
        );
        assert_eq!(
            enc(&JsonValue::Binary(Bytes::from_static(&[0xDE, 0xAD]))),
            [marker::BINARY_1_BYTE_LENGTH, 2, 0xDE, 0xAD]
        );
    }

    #[test]
    fn rejects_bad_event_order() {
        let mut writer = BinaryWriter::new();
        writer.write_event(JsonEvent::BeginObject).unwrap();
        assert!(writer.write_event(JsonEvent::Null).is_err());

        let mut writer = BinaryWriter::new();
        writer.write_event(JsonEvent::BeginArray).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(CodecError::EventSequence(_))
        ));

        let mut writer = BinaryWriter::new();
        writer.write_event(JsonEvent::Null).unwrap();
        assert!(writer.write_event(JsonEvent::Null).is_err());
    }
}
