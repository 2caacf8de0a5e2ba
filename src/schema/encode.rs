use bytes::{BufMut, Bytes, BytesMut};

use super::varint::put_long;
use super::{double_of, integer_of, Names, Schema};
use crate::error::CodecError;
use crate::types::{JsonValue, Utf8Bytes};

/// Stands in for absent record fields.
static MISSING: JsonValue = JsonValue::Null;

/// Writes values that conform to a schema.
#[derive(Debug, Clone)]
pub struct SchemaEncoder {
    schema: Schema,
    names: Names,
    block_size: Option<usize>,
}

impl SchemaEncoder {
    /// Fails if the schema refers to an undefined type or defines one twice.
    pub fn new(schema: Schema) -> Result<Self, CodecError> {
        let names = Names::collect(&schema)?;
        Ok(Self {
            schema,
            names,
            block_size: None,
        })
    }

    /// Splits arrays and maps into blocks of at most `items` entries, each
    /// prefixed with its byte size so readers can skip it. Zero writes a
    /// single block.
    pub fn block_size(mut self, items: usize) -> Self {
        self.block_size = (items > 0).then_some(items);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encode(&self, value: &JsonValue) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::new();
        self.write(&mut buf, &self.schema, value)?;
        tracing::trace!(bytes = buf.len(), "schema encode finished");
        Ok(buf.freeze())
    }

    fn write(
        &self,
        buf: &mut BytesMut,
        schema: &Schema,
        value: &JsonValue,
    ) -> Result<(), CodecError> {
        match schema {
            Schema::Null => require(matches!(value, JsonValue::Null), schema, value),
            Schema::Boolean => match value {
                JsonValue::Bool(b) => {
                    buf.put_u8(u8::from(*b));
                    Ok(())
                }
                _ => mismatch(schema, value),
            },
            Schema::Int => match integer_of(value).filter(|i| i32::try_from(*i).is_ok()) {
                Some(i) => {
                    put_long(buf, i);
                    Ok(())
                }
                None => mismatch(schema, value),
            },
            Schema::Long => match integer_of(value) {
                Some(i) => {
                    put_long(buf, i);
                    Ok(())
                }
                None => mismatch(schema, value),
            },
            Schema::Float => match double_of(value) {
                Some(d) => {
                    buf.put_f32_le(d as f32);
                    Ok(())
                }
                None => mismatch(schema, value),
            },
            Schema::Double => match double_of(value) {
                Some(d) => {
                    buf.put_f64_le(d);
                    Ok(())
                }
                None => mismatch(schema, value),
            },
            Schema::Bytes => match value {
                JsonValue::Binary(b) => {
                    put_bytes(buf, b);
                    Ok(())
                }
                _ => mismatch(schema, value),
            },
            Schema::String => match value {
                JsonValue::String(s) => {
                    put_bytes(buf, s.as_bytes());
                    Ok(())
                }
                _ => mismatch(schema, value),
            },
            Schema::Fixed { size, .. } => match value {
                JsonValue::Binary(b) if b.len() == *size => {
                    buf.put_slice(b);
                    Ok(())
                }
                _ => mismatch(schema, value),
            },
            Schema::Enum { symbols, .. } => {
                let ordinal = value
                    .as_str()
                    .and_then(|s| symbols.iter().position(|sym| sym == s));
                match ordinal {
                    Some(i) => {
                        put_long(buf, i as i64);
                        Ok(())
                    }
                    None => mismatch(schema, value),
                }
            }
            Schema::Array(items) => match value {
                JsonValue::Array(all) => {
                    self.write_blocks(buf, all, |buf, v| self.write(buf, items, v))
                }
                _ => mismatch(schema, value),
            },
            Schema::Map(values) => match value {
                JsonValue::Object(members) => {
                    let mut sorted: Vec<&(Utf8Bytes, JsonValue)> = members.iter().collect();
                    sorted.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
                    self.write_blocks(buf, &sorted, |buf, (k, v)| {
                        put_bytes(buf, k.as_bytes());
                        self.write(buf, values, v)
                    })
                }
                _ => mismatch(schema, value),
            },
            Schema::Record { fields, .. } => {
                if value.as_object().is_none() {
                    return mismatch(schema, value);
                }
                for field in fields {
                    let v = value.get(&field.name).unwrap_or(&MISSING);
                    self.write(buf, &field.schema, v).map_err(|e| match e {
                        CodecError::SchemaMismatch(detail) => {
                            CodecError::SchemaMismatch(format!("field {}: {detail}", field.name))
                        }
                        other => other,
                    })?;
                }
                Ok(())
            }
            Schema::Union(branches) => {
                let Some(index) = branches.iter().position(|b| self.names.conforms(b, value))
                else {
                    return mismatch(schema, value);
                };
                put_long(buf, index as i64);
                self.write(buf, &branches[index], value)
            }
            Schema::Named(name) => {
                let resolved = self.names.resolve(name)?;
                self.write(buf, resolved, value)
            }
        }
    }

    fn write_blocks<T>(
        &self,
        buf: &mut BytesMut,
        items: &[T],
        mut write_item: impl FnMut(&mut BytesMut, &T) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        match self.block_size {
            None => {
                if !items.is_empty() {
                    put_long(buf, items.len() as i64);
                    for item in items {
                        write_item(buf, item)?;
                    }
                }
            }
            Some(n) => {
                for chunk in items.chunks(n) {
                    let mut block = BytesMut::new();
                    for item in chunk {
                        write_item(&mut block, item)?;
                    }
                    put_long(buf, -(chunk.len() as i64));
                    put_long(buf, block.len() as i64);
                    buf.put_slice(&block);
                }
            }
        }
        put_long(buf, 0);
        Ok(())
    }
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    put_long(buf, bytes.len() as i64);
    buf.put_slice(bytes);
}

fn require(ok: bool, schema: &Schema, value: &JsonValue) -> Result<(), CodecError> {
    if ok { Ok(()) } else { mismatch(schema, value) }
}

fn mismatch(schema: &Schema, value: &JsonValue) -> Result<(), CodecError> {
    Err(CodecError::SchemaMismatch(format!(
        "{} does not fit {}",
        value_kind(value),
        schema_kind(schema)
    )))
}

fn value_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
        JsonValue::Int8(_)
        | JsonValue::Int16(_)
        | JsonValue::Int32(_)
        | JsonValue::Int64(_)
        | JsonValue::UInt32(_) => "typed integer",
        JsonValue::Float32(_) | JsonValue::Float64(_) => "typed float",
        JsonValue::Guid(_) => "guid",
        JsonValue::Binary(_) => "binary",
    }
}

fn schema_kind(schema: &Schema) -> String {
    match schema {
        Schema::Null => "null".into(),
        Schema::Boolean => "boolean".into(),
        Schema::Int => "int".into(),
        Schema::Long => "long".into(),
        Schema::Float => "float".into(),
        Schema::Double => "double".into(),
        Schema::Bytes => "bytes".into(),
        Schema::String => "string".into(),
        Schema::Array(_) => "array".into(),
        Schema::Map(_) => "map".into(),
        Schema::Enum { name, .. } => format!("enum {name}"),
        Schema::Fixed { name, size } => format!("fixed {name}[{size}]"),
        Schema::Record { name, .. } => format!("record {name}"),
        Schema::Union(branches) => format!("union of {}", branches.len()),
        Schema::Named(name) => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn enc(schema: Schema, value: &JsonValue) -> Vec<u8> {
        SchemaEncoder::new(schema).unwrap().encode(value).unwrap().to_vec()
    }

    #[test]
    fn primitives() {
        assert_eq!(enc(Schema::Int, &21.into()), [42]);
        assert_eq!(enc(Schema::Long, &(-1).into()), [1]);
        assert_eq!(enc(Schema::Float, &42.0.into()), [0x00, 0x00, 0x28, 0x42]);
        assert_eq!(enc(Schema::Double, &1.0.into()), 1.0f64.to_le_bytes());
        assert_eq!(enc(Schema::Boolean, &JsonValue::Bool(true)), [1]);
        assert!(enc(Schema::Null, &JsonValue::Null).is_empty());
        assert_eq!(enc(Schema::String, &"foo".into()), [6, b'f', b'o', b'o']);
    }

    #[test]
    fn int_out_of_range() {
        let encoder = SchemaEncoder::new(Schema::Int).unwrap();
        assert!(matches!(
            encoder.encode(&JsonValue::from(1i64 << 40)),
            Err(CodecError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn map_in_key_order() {
        let value = JsonValue::object([("foo", 1.into()), ("bar", 2.into())]);
        assert_eq!(
            enc(Schema::map(Schema::Int), &value),
            [4, 6, b'b', b'a', b'r', 4, 6, b'f', b'o', b'o', 2, 0]
        );
    }

    #[test]
    fn enum_ordinals() {
        let schema = Schema::enumeration("Suit", ["SPADES", "HEARTS", "DIAMONDS", "CLUBS"]);
        for (i, symbol) in ["SPADES", "HEARTS", "DIAMONDS", "CLUBS"].iter().enumerate() {
            assert_eq!(enc(schema.clone(), &(*symbol).into()), [(i * 2) as u8]);
        }
        let encoder = SchemaEncoder::new(schema).unwrap();
        assert!(encoder.encode(&"JOKER".into()).is_err());
    }

    #[test]
    fn arrays_and_blocks() {
        let value = JsonValue::Array(vec![1.into(), 2.into(), 3.into()]);
        assert_eq!(enc(Schema::array(Schema::Int), &value), [6, 2, 4, 6, 0]);
        assert_eq!(enc(Schema::array(Schema::Int), &JsonValue::Array(vec![])), [0]);

        let blocked = SchemaEncoder::new(Schema::array(Schema::Int))
            .unwrap()
            .block_size(2)
            .encode(&value)
            .unwrap();
        assert_eq!(&blocked[..], &[3, 4, 2, 4, 1, 2, 6, 0]);
    }

    #[test]
    fn union_picks_first_conforming_branch() {
        let schema = Schema::Union(vec![Schema::Null, Schema::Int, Schema::String]);
        assert_eq!(enc(schema.clone(), &JsonValue::Null), [0]);
        assert_eq!(enc(schema.clone(), &5.into()), [2, 10]);
        assert_eq!(enc(schema.clone(), &"a".into()), [4, 2, b'a']);
        let encoder = SchemaEncoder::new(schema).unwrap();
        assert!(encoder.encode(&JsonValue::Bool(true)).is_err());
    }

    #[test]
    fn record_fields_in_order() {
        let schema = Schema::record(
            "Point",
            [Field::new("x", Schema::Int), Field::new("y", Schema::Int)],
        );
        let value = JsonValue::object([("y", 2.into()), ("x", 1.into())]);
        assert_eq!(enc(schema.clone(), &value), [2, 4]);

        let err = SchemaEncoder::new(schema)
            .unwrap()
            .encode(&JsonValue::object([("x", 1.into())]))
            .unwrap_err();
        assert!(err.to_string().contains("field y"));
    }

    #[test]
    fn fixed_size_is_checked() {
        let schema = Schema::Fixed {
            name: "Md5".into(),
            size: 2,
        };
        let ok = JsonValue::Binary(Bytes::from_static(&[1, 2]));
        assert_eq!(enc(schema.clone(), &ok), [1, 2]);
        let short = JsonValue::Binary(Bytes::from_static(&[1]));
        assert!(SchemaEncoder::new(schema).unwrap().encode(&short).is_err());
    }
}
