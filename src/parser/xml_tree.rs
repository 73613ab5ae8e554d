//! XML to value-tree conversion
//!
//! Measurement files are semi-structured: the same field may be written as an
//! attribute or as a child element, and a list with one entry is
//! indistinguishable from a single object. The document is therefore first
//! converted into a loose [`serde_json::Value`] tree:
//!
//! - attributes and child elements both become object keys
//! - an element without attributes or children becomes its text
//! - mixed content keeps its text under `#text`
//! - repeated children become arrays
//! - children matching an [`ArrayPath`] rule are always arrays
//!
//! Curve `<points>` elements are stop nodes: their content is kept as raw
//! text and decoded separately by [`crate::parser::points`].

use crate::error::{CurveError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Key under which the text of a mixed-content element is stored
pub const TEXT_KEY: &str = "#text";

/// Element paths that always produce arrays, matched on the path suffix.
///
/// The nesting depth of these lists differs between document dialects, so
/// matching is done on the trailing segments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayPath {
    Curve,
    SetValuePlc,
    SetValue,
    ActualValuePlc,
    ActualValue,
    LineGroup,
    Line,
    WindowGroup,
    Window,
    CircleGroup,
    Circle,
}

impl ArrayPath {
    pub const ALL: [ArrayPath; 11] = [
        ArrayPath::Curve,
        ArrayPath::SetValuePlc,
        ArrayPath::SetValue,
        ArrayPath::ActualValuePlc,
        ArrayPath::ActualValue,
        ArrayPath::LineGroup,
        ArrayPath::Line,
        ArrayPath::WindowGroup,
        ArrayPath::Window,
        ArrayPath::CircleGroup,
        ArrayPath::Circle,
    ];

    /// Trailing path segments this rule matches
    pub fn suffix(&self) -> &'static [&'static str] {
        match self {
            ArrayPath::Curve => &["curves", "curve"],
            ArrayPath::SetValuePlc => &["setValues", "plc"],
            ArrayPath::SetValue => &["plc", "setValue"],
            ArrayPath::ActualValuePlc => &["actualValues", "plc"],
            ArrayPath::ActualValue => &["plc", "actualValue"],
            ArrayPath::LineGroup => &["linegroup"],
            ArrayPath::Line => &["lines", "line"],
            ArrayPath::WindowGroup => &["windowgroup"],
            ArrayPath::Window => &["windows", "window"],
            ArrayPath::CircleGroup => &["circlegroup"],
            ArrayPath::Circle => &["circles", "circle"],
        }
    }

    /// First rule matching the end of `path`
    pub fn matching<S: AsRef<str>>(path: &[S]) -> Option<ArrayPath> {
        Self::ALL.into_iter().find(|rule| {
            let suffix = rule.suffix();
            path.len() >= suffix.len()
                && path[path.len() - suffix.len()..]
                    .iter()
                    .zip(suffix)
                    .all(|(seg, want)| seg.as_ref() == *want)
        })
    }
}

/// Paths whose content is captured as raw text
const STOP_NODES: &[&[&str]] = &[&["curve", "points"]];

fn is_stop_node(path: &[String]) -> bool {
    STOP_NODES.iter().any(|suffix| {
        path.len() >= suffix.len()
            && path[path.len() - suffix.len()..]
                .iter()
                .zip(suffix.iter())
                .all(|(seg, want)| seg == want)
    })
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String, fields: Map<String, Value>) -> Self {
        Self {
            name,
            fields,
            text: String::new(),
        }
    }

    fn into_value(self) -> Value {
        if self.fields.is_empty() {
            return Value::String(self.text);
        }
        let mut fields = self.fields;
        if !self.text.is_empty() {
            fields.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        Value::Object(fields)
    }
}

fn insert_child(parent: &mut Map<String, Value>, path: &[String], name: String, value: Value) {
    let force_array = ArrayPath::matching(path).is_some();
    match parent.get_mut(&name) {
        Some(Value::Array(items)) if force_array || !items.is_empty() => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None if force_array => {
            parent.insert(name, Value::Array(vec![value]));
        }
        None => {
            parent.insert(name, value);
        }
    }
}

fn element_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn read_attributes(start: &BytesStart<'_>) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let key = element_name(attr.key.local_name().as_ref());
        let value = attr
            .unescape_value()
            .map_err(|e| CurveError::Xml(e.to_string()))?;
        fields.insert(key, Value::String(value.into_owned()));
    }
    Ok(fields)
}

/// Parse XML text into a value tree rooted at a synthetic document object.
///
/// The returned object has one key per top-level element, e.g.
/// `{"data": {"body": …}}`.
pub fn parse_xml_tree(text: &str) -> Result<Value> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Frame::new(String::new(), Map::new())];
    let mut path: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            CurveError::Xml(format!("{} at position {}", e, reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => {
                let name = element_name(start.local_name().as_ref());
                let fields = read_attributes(&start)?;
                path.push(name.clone());

                if is_stop_node(&path) {
                    let end = start.name().as_ref().to_vec();
                    let raw = reader.read_text(QName(&end)).map_err(|e| {
                        CurveError::Xml(format!("unterminated <{}>: {}", name, e))
                    })?;
                    let mut frame = Frame::new(name.clone(), fields);
                    frame.text = raw.into_owned();
                    let value = frame.into_value();
                    if let Some(parent) = stack.last_mut() {
                        insert_child(&mut parent.fields, &path, name, value);
                    }
                    path.pop();
                } else {
                    stack.push(Frame::new(name, fields));
                }
            }
            Event::Empty(start) => {
                let name = element_name(start.local_name().as_ref());
                let fields = read_attributes(&start)?;
                path.push(name.clone());
                let value = Frame::new(name.clone(), fields).into_value();
                if let Some(parent) = stack.last_mut() {
                    insert_child(&mut parent.fields, &path, name, value);
                }
                path.pop();
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(CurveError::Xml("unexpected closing tag".to_string()));
                }
                if let Some(frame) = stack.pop() {
                    let name = frame.name.clone();
                    let value = frame.into_value();
                    if let Some(parent) = stack.last_mut() {
                        insert_child(&mut parent.fields, &path, name, value);
                    }
                }
                path.pop();
            }
            Event::Text(t) => {
                let decoded = t.unescape().map_err(|e| CurveError::Xml(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&decoded);
                }
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        let open = stack.last().map(|f| f.name.clone()).unwrap_or_default();
        return Err(CurveError::Xml(format!(
            "unexpected end of document inside <{}>",
            open
        )));
    }

    let root = stack.pop().map(|f| f.fields).unwrap_or_default();
    if root.is_empty() {
        return Err(CurveError::Xml("document has no root element".to_string()));
    }
    Ok(Value::Object(root))
}

/// Read-only view over a node of the value tree with lenient field accessors
#[derive(Debug, Clone, Copy)]
pub struct XmlNode<'a>(pub &'a Value);

impl<'a> XmlNode<'a> {
    /// Child by key; repeated children resolve to the first occurrence
    pub fn get(&self, key: &str) -> Option<XmlNode<'a>> {
        match self.0.get(key)? {
            Value::Array(items) => items.first().map(XmlNode),
            other => Some(XmlNode(other)),
        }
    }

    /// Follow a chain of keys
    pub fn at(&self, keys: &[&str]) -> Option<XmlNode<'a>> {
        keys.iter().try_fold(*self, |node, key| node.get(key))
    }

    /// All children under `key`, whether serialized as one object or many
    pub fn items(&self, key: &str) -> Vec<XmlNode<'a>> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.iter().map(XmlNode).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![XmlNode(other)],
        }
    }

    /// Text content of this node
    pub fn text(&self) -> Option<&'a str> {
        match self.0 {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get(TEXT_KEY).and_then(Value::as_str),
            _ => None,
        }
    }

    /// Text of field `key`, if present
    pub fn field_text(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(|n| n.text())
    }

    /// String field, empty when absent
    pub fn str_field(&self, key: &str) -> String {
        self.field_text(key).map(|s| s.trim().to_string()).unwrap_or_default()
    }

    /// Floating point field with fallback when absent or unparseable
    pub fn f64_field(&self, key: &str, fallback: f64) -> f64 {
        self.field_text(key)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(fallback)
    }

    /// Integer field; decimal text is truncated toward zero
    pub fn i64_field(&self, key: &str, fallback: i64) -> i64 {
        let Some(text) = self.field_text(key).map(str::trim) else {
            return fallback;
        };
        text.parse::<i64>()
            .ok()
            .or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| v.trunc() as i64)
            })
            .unwrap_or(fallback)
    }

    pub fn i32_field(&self, key: &str, fallback: i32) -> i32 {
        i32::try_from(self.i64_field(key, fallback as i64)).unwrap_or(fallback)
    }

    /// Packed RGB color; values outside `u32` fall back
    pub fn color_field(&self, key: &str, fallback: u32) -> u32 {
        u32::try_from(self.i64_field(key, fallback as i64)).unwrap_or(fallback)
    }

    /// Optional integer field, `None` when absent or unparseable
    pub fn opt_i32_field(&self, key: &str) -> Option<i32> {
        self.field_text(key)?.trim().parse::<i32>().ok()
    }

    /// Boolean field: case-insensitive `"true"`, `default` when absent
    pub fn bool_field(&self, key: &str, default: bool) -> bool {
        self.field_text(key)
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }
}
