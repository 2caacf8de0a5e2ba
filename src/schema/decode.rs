use bytes::{Buf, Bytes};

use super::varint::get_long;
use super::{Names, Schema};
use crate::binary::decode::DEFAULT_MAX_DEPTH;
use crate::error::{CodecError, DecodeErrorKind};
use crate::types::{JsonObject, JsonValue, Number64, Utf8Bytes};

/// Most items one array may hold when its items take no bytes on the wire.
pub const MAX_EMPTY_ITEMS: u64 = 1 << 20;

/// Reads values written with the same schema.
#[derive(Debug, Clone)]
pub struct SchemaDecoder {
    schema: Schema,
    names: Names,
}

/// Remaining input plus its starting length, for error offsets.
struct Input {
    buf: Bytes,
    len: usize,
}

impl Input {
    fn offset(&self) -> usize {
        self.len - self.buf.remaining()
    }

    fn error(&self, kind: DecodeErrorKind, detail: impl Into<String>) -> CodecError {
        CodecError::decode(kind, self.offset(), detail)
    }

    fn long(&mut self) -> Result<i64, CodecError> {
        let at = self.offset();
        get_long(&mut self.buf).map_err(|kind| CodecError::decode(kind, at, "malformed varint"))
    }

    /// Reads a non-negative length or count.
    fn length(&mut self) -> Result<usize, CodecError> {
        let at = self.offset();
        let n = self.long()?;
        usize::try_from(n).map_err(|_| {
            let detail = format!("negative length {n}");
            CodecError::decode(DecodeErrorKind::InvalidNumberLiteral, at, detail)
        })
    }

    fn take(&mut self, n: usize) -> Result<Bytes, CodecError> {
        if self.buf.remaining() < n {
            return Err(self.error(
                DecodeErrorKind::TruncatedInput,
                format!("need {n} byte(s), have {}", self.buf.remaining()),
            ));
        }
        Ok(self.buf.split_to(n))
    }

    fn string(&mut self) -> Result<Utf8Bytes, CodecError> {
        let at = self.offset();
        let len = self.length()?;
        let bytes = self.take(len)?;
        Utf8Bytes::try_from_bytes(bytes)
            .map_err(|e| CodecError::decode(DecodeErrorKind::InvalidUtf8, at, e.to_string()))
    }
}

impl SchemaDecoder {
    pub fn new(schema: Schema) -> Result<Self, CodecError> {
        let names = Names::collect(&schema)?;
        Ok(Self { schema, names })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decodes one value. The input must hold nothing else.
    pub fn decode(&self, data: impl Into<Bytes>) -> Result<JsonValue, CodecError> {
        let buf = data.into();
        let mut input = Input {
            len: buf.len(),
            buf,
        };
        let result = self.read(&mut input, &self.schema, 0).and_then(|value| {
            if input.buf.has_remaining() {
                Err(input.error(
                    DecodeErrorKind::InvalidToken,
                    format!("{} trailing byte(s)", input.buf.remaining()),
                ))
            } else {
                Ok(value)
            }
        });
        if let Err(e) = &result {
            tracing::debug!(bytes = input.len, error = %e, "schema decode failed");
        }
        result
    }

    fn read(
        &self,
        input: &mut Input,
        schema: &Schema,
        depth: usize,
    ) -> Result<JsonValue, CodecError> {
        if depth > DEFAULT_MAX_DEPTH {
            return Err(input.error(
                DecodeErrorKind::InvalidToken,
                format!("nesting deeper than {DEFAULT_MAX_DEPTH}"),
            ));
        }
        let value = match schema {
            Schema::Null => JsonValue::Null,
            Schema::Boolean => {
                let at = input.offset();
                match input.take(1)?[0] {
                    0 => JsonValue::Bool(false),
                    1 => JsonValue::Bool(true),
                    b => {
                        return Err(CodecError::decode(
                            DecodeErrorKind::InvalidToken,
                            at,
                            format!("boolean byte {b}"),
                        ));
                    }
                }
            }
            Schema::Int => {
                let at = input.offset();
                let n = input.long()?;
                if i32::try_from(n).is_err() {
                    return Err(CodecError::decode(
                        DecodeErrorKind::InvalidNumberLiteral,
                        at,
                        format!("{n} overflows int"),
                    ));
                }
                JsonValue::Number(Number64::Integer(n))
            }
            Schema::Long => JsonValue::Number(Number64::Integer(input.long()?)),
            Schema::Float => {
                JsonValue::Number(Number64::Double(f64::from(input.take(4)?.get_f32_le())))
            }
            Schema::Double => JsonValue::Number(Number64::Double(input.take(8)?.get_f64_le())),
            Schema::Bytes => {
                let len = input.length()?;
                JsonValue::Binary(input.take(len)?)
            }
            Schema::String => JsonValue::String(input.string()?),
            Schema::Fixed { size, .. } => JsonValue::Binary(input.take(*size)?),
            Schema::Enum { symbols, .. } => {
                let at = input.offset();
                let ordinal = input.long()?;
                let symbol = usize::try_from(ordinal).ok().and_then(|i| symbols.get(i));
                match symbol {
                    Some(s) => JsonValue::String(s.as_str().into()),
                    None => {
                        return Err(CodecError::decode(
                            DecodeErrorKind::InvalidNumberLiteral,
                            at,
                            format!("enum ordinal {ordinal} of {}", symbols.len()),
                        ));
                    }
                }
            }
            Schema::Array(items) => {
                let mut all = Vec::new();
                let sized = self.names.consumes_input(items);
                self.read_blocks(input, sized, |input| {
                    all.push(self.read(input, items, depth + 1)?);
                    Ok(())
                })?;
                JsonValue::Array(all)
            }
            Schema::Map(values) => {
                let mut members = JsonObject::new();
                self.read_blocks(input, true, |input| {
                    let key = input.string()?;
                    members.push((key, self.read(input, values, depth + 1)?));
                    Ok(())
                })?;
                JsonValue::Object(members)
            }
            Schema::Record { fields, .. } => {
                let mut members = JsonObject::with_capacity(fields.len());
                for field in fields {
                    let value = self.read(input, &field.schema, depth + 1)?;
                    members.push((field.name.as_str().into(), value));
                }
                JsonValue::Object(members)
            }
            Schema::Union(branches) => {
                let at = input.offset();
                let index = input.long()?;
                let Some(branch) = usize::try_from(index).ok().and_then(|i| branches.get(i)) else {
                    return Err(CodecError::decode(
                        DecodeErrorKind::InvalidNumberLiteral,
                        at,
                        format!("union branch {index} of {}", branches.len()),
                    ));
                };
                self.read(input, branch, depth + 1)?
            }
            Schema::Named(name) => {
                let resolved = self.names.resolve(name)?;
                self.read(input, resolved, depth)?
            }
        };
        Ok(value)
    }

    /// Reads blocks of items until the zero-count terminator. A negative
    /// count is followed by the block's byte size, which must match.
    ///
    /// When `sized` holds, every item takes at least one byte, so a count
    /// beyond the remaining input is truncated. Otherwise the total is capped
    /// at [`MAX_EMPTY_ITEMS`].
    fn read_blocks(
        &self,
        input: &mut Input,
        sized: bool,
        mut read_item: impl FnMut(&mut Input) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        let mut total = 0u64;
        loop {
            if !input.buf.has_remaining() {
                return Err(input.error(
                    DecodeErrorKind::UnterminatedContainer,
                    "block list ended without a zero count",
                ));
            }
            let at = input.offset();
            let count = input.long()?;
            if count == 0 {
                return Ok(());
            }
            let size = if count < 0 { Some(input.length()?) } else { None };
            let items = count.unsigned_abs();
            let remaining = input.buf.remaining() as u64;
            if sized && items > remaining {
                return Err(CodecError::decode(
                    DecodeErrorKind::TruncatedInput,
                    at,
                    format!("block of {items} item(s) with {remaining} byte(s) left"),
                ));
            }
            total = total.saturating_add(items);
            if !sized && total > MAX_EMPTY_ITEMS {
                return Err(CodecError::decode(
                    DecodeErrorKind::InvalidNumberLiteral,
                    at,
                    format!("{total} empty item(s) exceed {MAX_EMPTY_ITEMS}"),
                ));
            }
            let start = input.offset();
            for _ in 0..items {
                read_item(input)?;
            }
            let held = input.offset() - start;
            if let Some(size) = size.filter(|&s| s != held) {
                return Err(CodecError::decode(
                    DecodeErrorKind::InvalidToken,
                    at,
                    format!("block declares {size} byte(s) but holds {held}"),
                ));
            }
        }
    }
}
