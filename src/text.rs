//! JSON text output and the `serde_json` bridge.

use base64::Engine;
use bytes::Bytes;

use crate::binary::decode::BinaryReader;
use crate::binary::encode::{encode_source_with, EncoderOptions};
use crate::binary::system_strings::{get_system_string_id, try_get_system_string_by_id};
use crate::error::CodecError;
use crate::event::{EventGrammar, JsonEvent, JsonEventSink, JsonEventSource, Position};
use crate::types::{escape_json, JsonValue, Number64};

/// Writes JSON events as compact JSON text.
///
/// Binary values become base64 strings, GUIDs their hyphenated form, and
/// non-finite floats `null`.
#[derive(Default)]
pub struct TextWriter {
    out: String,
    grammar: EventGrammar,
    /// Per open container: whether an element was already written.
    non_empty: Vec<bool>,
}

impl TextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Result<String, CodecError> {
        if !self.grammar.is_complete() {
            return Err(CodecError::EventSequence(format!(
                "document incomplete with {} open container(s)",
                self.grammar.depth()
            )));
        }
        Ok(self.out)
    }

    fn write_string(&mut self, s: &str) {
        self.out.push('"');
        match get_system_string_id(s.as_bytes()).and_then(try_get_system_string_by_id) {
            Some(known) => self.out.push_str(known.escaped_str()),
            None => self.out.push_str(&escape_json(s)),
        }
        self.out.push('"');
    }

    fn write_double(&mut self, value: f64) -> Result<(), CodecError> {
        self.out.push_str(&serde_json::to_string(&value)?);
        Ok(())
    }
}

impl JsonEventSink for TextWriter {
    fn write_event(&mut self, event: JsonEvent) -> Result<(), CodecError> {
        let position = self.grammar.accept(&event)?;
        if matches!(position, Position::ArrayItem | Position::PropertyName) {
            if let Some(written) = self.non_empty.last_mut() {
                if *written {
                    self.out.push(',');
                }
                *written = true;
            }
        }

        match event {
            JsonEvent::BeginArray => {
                self.out.push('[');
                self.non_empty.push(false);
            }
            JsonEvent::BeginObject => {
                self.out.push('{');
                self.non_empty.push(false);
            }
            JsonEvent::EndArray => {
                self.non_empty.pop();
                self.out.push(']');
            }
            JsonEvent::EndObject => {
                self.non_empty.pop();
                self.out.push('}');
            }
            JsonEvent::FieldName(name) => {
                self.write_string(&name);
                self.out.push(':');
            }
            JsonEvent::String(s) => self.write_string(&s),
            JsonEvent::Number(Number64::Integer(i)) => self.out.push_str(&i.to_string()),
            JsonEvent::Number(Number64::Double(d)) => self.write_double(d)?,
            JsonEvent::Bool(b) => self.out.push_str(if b { "true" } else { "false" }),
            JsonEvent::Null => self.out.push_str("null"),
            JsonEvent::Int8(v) => self.out.push_str(&v.to_string()),
            JsonEvent::Int16(v) => self.out.push_str(&v.to_string()),
            JsonEvent::Int32(v) => self.out.push_str(&v.to_string()),
            JsonEvent::Int64(v) => self.out.push_str(&v.to_string()),
            JsonEvent::UInt32(v) => self.out.push_str(&v.to_string()),
            JsonEvent::Float32(v) => self.out.push_str(&serde_json::to_string(&v)?),
            JsonEvent::Float64(v) => self.write_double(v)?,
            JsonEvent::Guid(g) => {
                self.out.push('"');
                self.out.push_str(&g.hyphenated().to_string());
                self.out.push('"');
            }
            JsonEvent::Binary(b) => {
                self.out.push('"');
                self.out
                    .push_str(&base64::engine::general_purpose::STANDARD.encode(&b));
                self.out.push('"');
            }
        }
        Ok(())
    }
}

// -- serde_json bridge --

impl JsonEventSource for serde_json::Value {
    fn emit<S: JsonEventSink + ?Sized>(&self, sink: &mut S) -> Result<(), CodecError> {
        let event = match self {
            Self::Null => JsonEvent::Null,
            Self::Bool(b) => JsonEvent::Bool(*b),
            Self::Number(n) => JsonEvent::Number(number_from_serde(n)),
            Self::String(s) => JsonEvent::String(s.as_str().into()),
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
                    sink.write_event(JsonEvent::FieldName(name.as_str().into()))?;
                    value.emit(sink)?;
                }
                JsonEvent::EndObject
            }
        };
        sink.write_event(event)
    }
}

/// Integers that fit `i64` stay integers; everything else is a double.
fn number_from_serde(n: &serde_json::Number) -> Number64 {
    match n.as_i64() {
        Some(i) => Number64::Integer(i),
        None => Number64::Double(n.as_f64().unwrap_or(f64::NAN)),
    }
}

impl From<&serde_json::Value> for JsonValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(number_from_serde(n)),
            serde_json::Value::String(s) => Self::String(s.as_str().into()),
            serde_json::Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            serde_json::Value::Object(members) => Self::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.as_str().into(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Renders a value as compact JSON text.
pub fn to_json_text(value: &JsonValue) -> Result<String, CodecError> {
    let mut writer = TextWriter::new();
    value.emit(&mut writer)?;
    writer.finish()
}

/// Decodes a binary JSON document straight to JSON text.
pub fn transcode_to_text(data: impl Into<Bytes>) -> Result<String, CodecError> {
    let mut writer = TextWriter::new();
    BinaryReader::new(data).read_events(&mut writer)?;
    writer.finish()
}

/// Parses JSON text and encodes it as binary JSON.
pub fn encode_json_text(text: &str) -> Result<Bytes, CodecError> {
    encode_json_text_with(text, EncoderOptions::default())
}

pub fn encode_json_text_with(text: &str, options: EncoderOptions) -> Result<Bytes, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    encode_source_with(&value, options)
}
