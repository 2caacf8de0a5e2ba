//! Schema-directed binary encoding.
//!
//! Unlike the self-describing binary format, nothing here carries type
//! markers: the writer and reader share a [`Schema`] and the bytes hold only
//! the data. Integers are zigzag varints, arrays and maps are written in
//! blocks ended by a zero count, enums as their ordinal and unions as a
//! branch index followed by the branch value.

mod decode;
mod encode;
pub mod varint;

use std::collections::HashMap;

use crate::error::CodecError;
use crate::types::JsonValue;

pub use decode::SchemaDecoder;
pub use encode::SchemaEncoder;

/// The shape values must have to be written with a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Box<Schema>),
    Map(Box<Schema>),
    Enum { name: String, symbols: Vec<String> },
    Fixed { name: String, size: usize },
    Record { name: String, fields: Vec<Field> },
    Union(Vec<Schema>),
    /// A reference to a record, enum or fixed type defined elsewhere in the
    /// same schema. Lets records refer to themselves.
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl Schema {
    pub fn array(items: Schema) -> Self {
        Self::Array(Box::new(items))
    }

    pub fn map(values: Schema) -> Self {
        Self::Map(Box::new(values))
    }

    pub fn record(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self::Record {
            name: name.into(),
            fields: fields.into_iter().collect(),
        }
    }

    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::Enum {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The defined name of a record, enum or fixed type.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Enum { name, .. } | Self::Fixed { name, .. } | Self::Record { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

/// Named types defined in a schema, by name.
#[derive(Debug, Clone, Default)]
pub(crate) struct Names(HashMap<String, Schema>);

impl Names {
    /// Collects every named definition in `schema` and checks that each
    /// `Named` reference resolves.
    pub(crate) fn collect(schema: &Schema) -> Result<Self, CodecError> {
        let mut names = Self::default();
        names.define(schema)?;
        names.check_references(schema)?;
        Ok(names)
    }

    fn define(&mut self, schema: &Schema) -> Result<(), CodecError> {
        if let Some(name) = schema.name() {
            if self.0.insert(name.to_owned(), schema.clone()).is_some() {
                return Err(CodecError::SchemaMismatch(format!(
                    "type {name} is defined twice"
                )));
            }
        }
        match schema {
            Schema::Array(items) | Schema::Map(items) => self.define(items),
            Schema::Record { fields, .. } => fields.iter().try_for_each(|f| self.define(&f.schema)),
            Schema::Union(branches) => branches.iter().try_for_each(|b| self.define(b)),
            _ => Ok(()),
        }
    }

    fn check_references(&self, schema: &Schema) -> Result<(), CodecError> {
        match schema {
            Schema::Named(name) => self.resolve(name).map(|_| ()),
            Schema::Array(items) | Schema::Map(items) => self.check_references(items),
            Schema::Record { fields, .. } => fields
                .iter()
                .try_for_each(|f| self.check_references(&f.schema)),
            Schema::Union(branches) => branches.iter().try_for_each(|b| self.check_references(b)),
            _ => Ok(()),
        }
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<&Schema, CodecError> {
        self.0
            .get(name)
            .ok_or_else(|| CodecError::SchemaMismatch(format!("undefined type {name}")))
    }

    /// Whether every value of `schema` takes at least one byte on the wire.
    /// A named type reached again through itself counts as empty.
    pub(crate) fn consumes_input(&self, schema: &Schema) -> bool {
        self.consumes_input_within(schema, &mut Vec::new())
    }

    fn consumes_input_within<'a>(&'a self, schema: &'a Schema, seen: &mut Vec<&'a str>) -> bool {
        match schema {
            Schema::Null => false,
            Schema::Fixed { size, .. } => *size > 0,
            Schema::Record { fields, .. } => fields
                .iter()
                .any(|f| self.consumes_input_within(&f.schema, seen)),
            Schema::Named(name) => {
                if seen.contains(&name.as_str()) {
                    return false;
                }
                seen.push(name);
                let consumes = self
                    .resolve(name)
                    .is_ok_and(|resolved| self.consumes_input_within(resolved, seen));
                seen.pop();
                consumes
            }
            _ => true,
        }
    }

    /// Whether `value` can be written with `schema`. Used to pick union
    /// branches.
    pub(crate) fn conforms(&self, schema: &Schema, value: &JsonValue) -> bool {
        match schema {
            Schema::Null => matches!(value, JsonValue::Null),
            Schema::Boolean => matches!(value, JsonValue::Bool(_)),
            Schema::Int => integer_of(value).is_some_and(|i| i32::try_from(i).is_ok()),
            Schema::Long => integer_of(value).is_some(),
            Schema::Float | Schema::Double => double_of(value).is_some(),
            Schema::Bytes => matches!(value, JsonValue::Binary(_)),
            Schema::String => matches!(value, JsonValue::String(_)),
            Schema::Fixed { size, .. } => {
                matches!(value, JsonValue::Binary(b) if b.len() == *size)
            }
            Schema::Enum { symbols, .. } => value
                .as_str()
                .is_some_and(|s| symbols.iter().any(|sym| sym == s)),
            Schema::Array(items) => value
                .as_array()
                .is_some_and(|all| all.iter().all(|v| self.conforms(items, v))),
            Schema::Map(values) => value
                .as_object()
                .is_some_and(|members| members.iter().all(|(_, v)| self.conforms(values, v))),
            Schema::Record { fields, .. } => value.as_object().is_some_and(|_| {
                fields.iter().all(|f| match value.get(&f.name) {
                    Some(v) => self.conforms(&f.schema, v),
                    None => self.conforms(&f.schema, &JsonValue::Null),
                })
            }),
            Schema::Union(branches) => branches.iter().any(|b| self.conforms(b, value)),
            Schema::Named(name) => self
                .resolve(name)
                .is_ok_and(|resolved| self.conforms(resolved, value)),
        }
    }
}

/// The integer a value holds, if any.
pub(crate) fn integer_of(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_exact_integer(),
        JsonValue::Int8(v) => Some(i64::from(*v)),
        JsonValue::Int16(v) => Some(i64::from(*v)),
        JsonValue::Int32(v) => Some(i64::from(*v)),
        JsonValue::Int64(v) => Some(*v),
        JsonValue::UInt32(v) => Some(i64::from(*v)),
        _ => None,
    }
}

/// Any numeric value as a double.
pub(crate) fn double_of(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => Some(n.to_double()),
        JsonValue::Float32(v) => Some(f64::from(*v)),
        JsonValue::Float64(v) => Some(*v),
        other => integer_of(other).map(|i| i as f64),
    }
}
