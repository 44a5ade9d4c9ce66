//! Value codec
//!
//! Converts typed [`Value`]s to and from the escaped single-line text that
//! flat-file backends store, and coerces between value types by
//! round-tripping through that text. The escaping rules are compatible with
//! desktop key-files: `\s` for leading spaces, `\n`, `\t`, `\r`, `\\`, and
//! `\<separator>` inside list elements.

mod keyfile;

pub use keyfile::KeyFile;

use std::num::IntErrorKind;

use serde::Serialize;
use thiserror::Error;

use crate::types::{ObjectPath, SimplePresence, Value, ValueType};

/// Default separator between list elements.
pub const DEFAULT_LIST_SEPARATOR: char = ',';

/// Codec and key-file errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CodecError {
    /// Unknown escape sequence or a dangling backslash
    #[error("Invalid escape sequence in '{0}'")]
    InvalidEscape(String),

    /// Text is not a literal of the expected type
    #[error("'{text}' is not a valid {expected}")]
    Malformed { text: String, expected: ValueType },

    /// Numeric literal does not fit the expected type
    #[error("'{text}' is out of range for {expected}")]
    OutOfRange { text: String, expected: ValueType },

    #[error("Invalid object path: {0}")]
    InvalidObjectPath(String),

    #[error("Invalid simple-presence structure: {0}")]
    InvalidPresence(String),

    /// Group or key name that cannot be written to a key-file
    #[error("Invalid key-file name: {0:?}")]
    InvalidName(String),

    #[error("Key-file syntax error on line {line}: {detail}")]
    Syntax { line: usize, detail: String },
}

/// Escapes values for storage and decodes them back, schema-directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    separator: char,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_SEPARATOR)
    }
}

impl Codec {
    #[must_use]
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    #[must_use]
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Escape `value` to the text stored for it in a key-file.
    ///
    /// For instance `true` becomes `"true"` and a string holding one space
    /// becomes `"\s"`.
    #[must_use]
    pub fn escape(&self, value: &Value) -> String {
        match value {
            Value::String(s) => escape_str(s, None),
            Value::ObjectPath(p) => escape_str(p.as_str(), None),
            Value::Boolean(b) => b.to_string(),
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::UInt32(u) => u.to_string(),
            Value::UInt64(u) => u.to_string(),
            Value::Byte(b) => b.to_string(),
            Value::Double(d) => d.to_string(),
            Value::StringArray(items) => self.join(items.iter().map(String::as_str)),
            Value::ObjectPathArray(items) => self.join(items.iter().map(ObjectPath::as_str)),
            Value::SimplePresence(p) => {
                let kind = p.kind.to_string();
                self.join([kind.as_str(), p.status.as_str(), p.message.as_str()].into_iter())
            }
        }
    }

    /// Interpret `escaped` as a value of type `ty`.
    pub fn unescape(&self, escaped: &str, ty: ValueType) -> Result<Value, CodecError> {
        let value = match ty {
            ValueType::String => Value::String(unescape_str(escaped, None)?),
            ValueType::Boolean => Value::Boolean(parse_bool(escaped)?),
            ValueType::Int32 => Value::Int32(parse_int(escaped, ty)?),
            ValueType::Int64 => Value::Int64(parse_int(escaped, ty)?),
            ValueType::UInt32 => Value::UInt32(parse_u32(escaped, ty)?),
            ValueType::UInt64 => Value::UInt64(parse_int(escaped, ty)?),
            ValueType::Byte => {
                let wide: i32 = parse_int(escaped, ty)?;
                let byte = u8::try_from(wide).map_err(|_| CodecError::OutOfRange {
                    text: escaped.to_string(),
                    expected: ty,
                })?;
                Value::Byte(byte)
            }
            ValueType::Double => {
                let d = escaped
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| malformed(escaped, ty))?;
                Value::Double(d)
            }
            ValueType::StringArray => Value::StringArray(self.split(escaped)?),
            ValueType::ObjectPath => {
                Value::ObjectPath(ObjectPath::new(unescape_str(escaped, None)?)?)
            }
            ValueType::ObjectPathArray => Value::ObjectPathArray(
                self.split(escaped)?
                    .into_iter()
                    .map(ObjectPath::new)
                    .collect::<Result<_, _>>()?,
            ),
            ValueType::SimplePresence => Value::SimplePresence(self.parse_presence(escaped)?),
        };
        Ok(value)
    }

    /// Convert `value` to `target`.
    ///
    /// Values already of the target type are returned as-is; everything else
    /// goes through [`escape`](Self::escape) and [`unescape`](Self::unescape),
    /// which is the only conversion path between types.
    pub fn coerce(&self, value: &Value, target: ValueType) -> Result<Value, CodecError> {
        if value.value_type() == target {
            return Ok(value.clone());
        }
        self.unescape(&self.escape(value), target)
    }

    fn join<'a>(&self, items: impl Iterator<Item = &'a str>) -> String {
        let mut out = String::new();
        for item in items {
            out.push_str(&escape_str(item, Some(self.separator)));
            out.push(self.separator);
        }
        out
    }

    /// Split on unescaped separators and unescape each element.
    ///
    /// A trailing separator is optional, so `"a,b,"` and `"a,b"` both decode
    /// to two elements and `""` is the empty list.
    fn split(&self, escaped: &str) -> Result<Vec<String>, CodecError> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut chars = escaped.chars();

        while let Some(c) = chars.next() {
            if c == '\\' {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            } else if c == self.separator {
                pieces.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }

        pieces
            .iter()
            .map(|piece| unescape_str(piece, Some(self.separator)))
            .collect()
    }

    fn parse_presence(&self, escaped: &str) -> Result<SimplePresence, CodecError> {
        let mut parts = self.split(escaped)?;
        if parts.len() != 3 {
            return Err(CodecError::InvalidPresence(format!(
                "expected 3 elements, found {}",
                parts.len()
            )));
        }
        let message = parts.pop().unwrap_or_default();
        let status = parts.pop().unwrap_or_default();
        let kind = parts.pop().unwrap_or_default();

        let kind = kind
            .parse::<u64>()
            .ok()
            .and_then(|k| u32::try_from(k).ok())
            .ok_or_else(|| CodecError::InvalidPresence(format!("invalid presence type {kind}")))?;

        Ok(SimplePresence {
            kind,
            status,
            message,
        })
    }
}

fn malformed(text: &str, expected: ValueType) -> CodecError {
    CodecError::Malformed {
        text: text.to_string(),
        expected,
    }
}

fn parse_int<T>(text: &str, ty: ValueType) -> Result<T, CodecError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    text.trim().parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => CodecError::OutOfRange {
            text: text.to_string(),
            expected: ty,
        },
        _ => malformed(text, ty),
    })
}

fn parse_u32(text: &str, ty: ValueType) -> Result<u32, CodecError> {
    let wide: u64 = parse_int(text, ty)?;
    u32::try_from(wide).map_err(|_| CodecError::OutOfRange {
        text: text.to_string(),
        expected: ty,
    })
}

fn parse_bool(text: &str) -> Result<bool, CodecError> {
    match text.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(malformed(text, ValueType::Boolean)),
    }
}

/// Escape one string, optionally escaping a list separator as well.
fn escape_str(input: &str, separator: Option<char>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut leading = true;

    for c in input.chars() {
        match c {
            ' ' if leading => out.push_str("\\s"),
            '\t' if leading => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            c if Some(c) == separator => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
        if c != ' ' && c != '\t' {
            leading = false;
        }
    }
    out
}

fn unescape_str(input: &str, separator: Option<char>) -> Result<String, CodecError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let unescaped = match chars.next() {
            Some('s') => ' ',
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            Some(other) if Some(other) == separator => other,
            _ => return Err(CodecError::InvalidEscape(input.to_string())),
        };
        out.push(unescaped);
    }
    Ok(out)
}
