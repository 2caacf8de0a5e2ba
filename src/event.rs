//! The JSON event model connecting value producers, the codecs and consumers.
//!
//! Writers (`BinaryWriter`, `TextWriter`, `ValueBuilder`) are event sinks.
//! Values and the binary reader are event sources.

use bytes::Bytes;
use uuid::Uuid;

use crate::error::CodecError;
use crate::types::{JsonObject, JsonValue, Number64, Utf8Bytes};

/// One step of a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    BeginArray,
    EndArray,
    BeginObject,
    EndObject,
    FieldName(Utf8Bytes),
    String(Utf8Bytes),
    Number(Number64),
    Bool(bool),
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    Float32(f32),
    Float64(f64),
    Guid(Uuid),
    Binary(Bytes),
}

/// Consumes JSON events.
pub trait JsonEventSink {
    fn write_event(&mut self, event: JsonEvent) -> Result<(), CodecError>;
}

impl<S: JsonEventSink + ?Sized> JsonEventSink for &mut S {
    fn write_event(&mut self, event: JsonEvent) -> Result<(), CodecError> {
        (**self).write_event(event)
    }
}

/// Produces JSON events into a sink.
pub trait JsonEventSource {
    fn emit<S: JsonEventSink + ?Sized>(&self, sink: &mut S) -> Result<(), CodecError>;
}

impl JsonEventSource for JsonValue {
    fn emit<S: JsonEventSink + ?Sized>(&self, sink: &mut S) -> Result<(), CodecError> {
        let event = match self {
            Self::Null => JsonEvent::Null,
            Self::Bool(b) => JsonEvent::Bool(*b),
            Self::Number(n) => JsonEvent::Number(*n),
            Self::String(s) => JsonEvent::String(s.clone()),
            Self::Array(items) => {
                sink.write_event(JsonEvent::BeginArray)?;
                for item in items {
                    item.emit(sink)?;
                }
                JsonEvent::EndArray
            }
            Self::Object(members) => {
                sink.write_event(JsonEvent::BeginObject)?;
                for (name, value) in members {
                    sink.write_event(JsonEvent::FieldName(name.clone()))?;
                    value.emit(sink)?;
                }
                JsonEvent::EndObject
            }
            Self::Int8(v) => JsonEvent::Int8(*v),
            Self::Int16(v) => JsonEvent::Int16(*v),
            Self::Int32(v) => JsonEvent::Int32(*v),
            Self::Int64(v) => JsonEvent::Int64(*v),
            Self::UInt32(v) => JsonEvent::UInt32(*v),
            Self::Float32(v) => JsonEvent::Float32(*v),
            Self::Float64(v) => JsonEvent::Float64(*v),
            Self::Guid(g) => JsonEvent::Guid(*g),
            Self::Binary(b) => JsonEvent::Binary(b.clone()),
        };
        sink.write_event(event)
    }
}

enum Partial {
    Array(Vec<JsonValue>),
    Object {
        members: JsonObject,
        pending_name: Option<Utf8Bytes>,
    },
}

/// Builds a `JsonValue` tree from events.
#[derive(Default)]
pub struct ValueBuilder {
    stack: Vec<Partial>,
    root: Option<JsonValue>,
}

impl ValueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the completed root value.
    pub fn finish(self) -> Result<JsonValue, CodecError> {
        if !self.stack.is_empty() {
            return Err(CodecError::EventSequence(format!(
                "{} container(s) still open",
                self.stack.len()
            )));
        }
        self.root
            .ok_or_else(|| CodecError::EventSequence("no value was written".into()))
    }

    fn push_value(&mut self, value: JsonValue) -> Result<(), CodecError> {
        match self.stack.last_mut() {
            Some(Partial::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Partial::Object {
                members,
                pending_name,
            }) => match pending_name.take() {
                Some(name) => {
                    members.push((name, value));
                    Ok(())
                }
                None => Err(CodecError::EventSequence(
                    "object value without a field name".into(),
                )),
            },
            None if self.root.is_none() => {
                self.root = Some(value);
                Ok(())
            }
            None => Err(CodecError::EventSequence("more than one root value".into())),
        }
    }

    fn expects_name(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Partial::Object {
                pending_name: None,
                ..
            })
        )
    }
}

impl JsonEventSink for ValueBuilder {
    fn write_event(&mut self, event: JsonEvent) -> Result<(), CodecError> {
        if self.expects_name() && !matches!(event, JsonEvent::FieldName(_) | JsonEvent::EndObject) {
            return Err(CodecError::EventSequence(
                "object value without a field name".into(),
            ));
        }
        let value = match event {
            JsonEvent::FieldName(name) => {
                return match self.stack.last_mut() {
                    Some(Partial::Object { pending_name, .. }) if pending_name.is_none() => {
                        *pending_name = Some(name);
                        Ok(())
                    }
                    _ => Err(CodecError::EventSequence(format!(
                        "unexpected field name {name:?}"
                    ))),
                };
            }
            JsonEvent::BeginArray => {
                self.stack.push(Partial::Array(Vec::new()));
                return Ok(());
            }
            JsonEvent::BeginObject => {
                self.stack.push(Partial::Object {
                    members: Vec::new(),
                    pending_name: None,
                });
                return Ok(());
            }
            JsonEvent::EndArray => match self.stack.pop() {
                Some(Partial::Array(items)) => JsonValue::Array(items),
                _ => return Err(CodecError::EventSequence("unbalanced EndArray".into())),
            },
            JsonEvent::EndObject => match self.stack.pop() {
                Some(Partial::Object {
                    members,
                    pending_name: None,
                }) => JsonValue::Object(members),
                _ => return Err(CodecError::EventSequence("unbalanced EndObject".into())),
            },
            JsonEvent::String(s) => JsonValue::String(s),
            JsonEvent::Number(n) => JsonValue::Number(n),
            JsonEvent::Bool(b) => JsonValue::Bool(b),
            JsonEvent::Null => JsonValue::Null,
            JsonEvent::Int8(v) => JsonValue::Int8(v),
            JsonEvent::Int16(v) => JsonValue::Int16(v),
            JsonEvent::Int32(v) => JsonValue::Int32(v),
            JsonEvent::Int64(v) => JsonValue::Int64(v),
            JsonEvent::UInt32(v) => JsonValue::UInt32(v),
            JsonEvent::Float32(v) => JsonValue::Float32(v),
            JsonEvent::Float64(v) => JsonValue::Float64(v),
            JsonEvent::Guid(g) => JsonValue::Guid(g),
            JsonEvent::Binary(b) => JsonValue::Binary(b),
        };
        self.push_value(value)
    }
}

/// Tracks where a writer is in the document, for writers that need to
/// validate event order themselves.
#[derive(Debug, Default)]
pub(crate) struct EventGrammar {
    /// One entry per open container: `true` for objects.
    open: Vec<bool>,
    /// For the innermost object: whether a field name is pending.
    have_name: bool,
    root_done: bool,
}

/// What an accepted event means for the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Root,
    ArrayItem,
    PropertyValue,
    PropertyName,
    Close,
}

impl EventGrammar {
    pub(crate) fn depth(&self) -> usize {
        self.open.len()
    }

    /// Validates `event` against the current position and advances.
    pub(crate) fn accept(&mut self, event: &JsonEvent) -> Result<Position, CodecError> {
        let in_object = self.open.last().copied();
        match event {
            JsonEvent::FieldName(_) => {
                if in_object == Some(true) && !self.have_name {
                    self.have_name = true;
                    Ok(Position::PropertyName)
                } else {
                    Err(CodecError::EventSequence("unexpected field name".into()))
                }
            }
            JsonEvent::EndArray | JsonEvent::EndObject => {
                let is_object = matches!(event, JsonEvent::EndObject);
                if in_object != Some(is_object) || self.have_name {
                    return Err(CodecError::EventSequence(format!("unbalanced {event:?}")));
                }
                self.open.pop();
                self.after_value();
                Ok(Position::Close)
            }
            _ => {
                let position = match in_object {
                    None if self.root_done => {
                        return Err(CodecError::EventSequence("more than one root value".into()));
                    }
                    None => Position::Root,
                    Some(false) => Position::ArrayItem,
                    Some(true) if self.have_name => Position::PropertyValue,
                    Some(true) => {
                        return Err(CodecError::EventSequence(
                            "object value without a field name".into(),
                        ));
                    }
                };
                match event {
                    JsonEvent::BeginArray => {
                        self.have_name = false;
                        self.open.push(false);
                    }
                    JsonEvent::BeginObject => {
                        self.have_name = false;
                        self.open.push(true);
                    }
                    _ => self.after_value(),
                }
                Ok(position)
            }
        }
    }

    fn after_value(&mut self) {
        self.have_name = false;
        if self.open.is_empty() {
            self.root_done = true;
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.root_done && self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(value: &JsonValue) -> JsonValue {
        let mut builder = ValueBuilder::new();
        value.emit(&mut builder).unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn builder_rebuilds_nested_values() {
        let value = JsonValue::object([
            ("a", JsonValue::Array(vec![1.into(), JsonValue::Null, "x".into()])),
            ("b", JsonValue::object([("c", JsonValue::Bool(true))])),
            ("d", JsonValue::Array(vec![])),
        ]);
        assert_eq!(rebuild(&value), value);
    }

    #[test]
    fn builder_rejects_value_without_name() {
        let mut builder = ValueBuilder::new();
        builder.write_event(JsonEvent::BeginObject).unwrap();
        assert!(builder.write_event(JsonEvent::Null).is_err());
    }

    #[test]
    fn builder_rejects_open_containers() {
        let mut builder = ValueBuilder::new();
        builder.write_event(JsonEvent::BeginArray).unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn grammar_tracks_positions() {
        let mut g = EventGrammar::default();
        assert_eq!(g.accept(&JsonEvent::BeginObject).unwrap(), Position::Root);
        assert_eq!(
            g.accept(&JsonEvent::FieldName("a".into())).unwrap(),
            Position::PropertyName
        );
        assert_eq!(g.accept(&JsonEvent::BeginArray).unwrap(), Position::PropertyValue);
        assert_eq!(g.accept(&JsonEvent::Null).unwrap(), Position::ArrayItem);
        assert!(g.accept(&JsonEvent::EndObject).is_err());
        assert_eq!(g.accept(&JsonEvent::EndArray).unwrap(), Position::Close);
        assert!(g.accept(&JsonEvent::Null).is_err());
        assert_eq!(g.accept(&JsonEvent::EndObject).unwrap(), Position::Close);
        assert!(g.is_complete());
        assert!(g.accept(&JsonEvent::Null).is_err());
    }
}
