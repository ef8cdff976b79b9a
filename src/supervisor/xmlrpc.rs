// XML-RPC encoding and decoding for supervisor calls

use crate::error::{RemoteFault, Result, UptimemonError};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(i) => {
                let _ = write!(out, "<int>{}</int>", i);
            }
            Value::Bool(b) => {
                let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
            }
            Value::String(s) => {
                let _ = write!(out, "<string>{}</string>", escape(s));
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write_xml(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(fields) => {
                out.push_str("<struct>");
                for (name, value) in fields {
                    let _ = write!(out, "<member><name>{}</name>", escape(name));
                    value.write_xml(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build a `methodCall` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.write_xml(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

/// Parsed element of a response document
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn expect_child(&self, name: &str) -> Result<&Element> {
        self.child(name).ok_or_else(|| {
            UptimemonError::RpcDecodeError(format!("<{}> has no <{}> element", self.name, name))
        })
    }
}

fn parse_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            UptimemonError::RpcDecodeError(format!(
                "malformed XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => stack.push(Element {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ..Element::default()
            }),
            Event::Empty(e) => {
                let element = Element {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    UptimemonError::RpcDecodeError("unbalanced closing tag".to_string())
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    let text = e.unescape().map_err(|e| {
                        UptimemonError::RpcDecodeError(format!("bad text content: {}", e))
                    })?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(UptimemonError::RpcDecodeError(
            "document ended inside an element".to_string(),
        ));
    }
    root.ok_or_else(|| UptimemonError::RpcDecodeError("empty document".to_string()))
}

fn decode_value(element: &Element) -> Result<Value> {
    // A <value> without a type element is a string
    let Some(typed) = element.children.first() else {
        return Ok(Value::String(element.text.clone()));
    };

    let text = typed.text.trim();
    let bad = |kind: &str| UptimemonError::RpcDecodeError(format!("invalid {} '{}'", kind, text));

    match typed.name.as_str() {
        "int" | "i4" | "i8" => text.parse().map(Value::Int).map_err(|_| bad("int")),
        "boolean" => match text {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            _ => Err(bad("boolean")),
        },
        "string" => Ok(Value::String(typed.text.clone())),
        // Kept as their textual form; no supervisor field we read uses them
        "double" | "dateTime.iso8601" | "base64" => Ok(Value::String(text.to_string())),
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = typed.expect_child("data")?;
            data.children
                .iter()
                .filter(|c| c.name == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut fields = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.expect_child("name")?.text.clone();
                let value = decode_value(member.expect_child("value")?)?;
                fields.insert(name, value);
            }
            Ok(Value::Struct(fields))
        }
        other => Err(UptimemonError::RpcDecodeError(format!(
            "unsupported value type <{}>",
            other
        ))),
    }
}

/// Decode a `methodResponse` document
///
/// A `<fault>` response is returned as `UptimemonError::RemoteFault`.
pub fn decode_response(xml: &str) -> Result<Value> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(UptimemonError::RpcDecodeError(format!(
            "expected <methodResponse>, got <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.expect_child("value")?)?;
        let fields = value.as_struct().ok_or_else(|| {
            UptimemonError::RpcDecodeError("fault value is not a struct".to_string())
        })?;
        let code = fields.get("faultCode").and_then(Value::as_int).unwrap_or_default();
        let message = fields
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(RemoteFault::new(code, message).into());
    }

    let param = root.expect_child("params")?.expect_child("param")?;
    decode_value(param.expect_child("value")?)
}
