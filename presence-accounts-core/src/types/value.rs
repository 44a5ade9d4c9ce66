//! Typed values stored in the account cache.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// The closed set of value kinds an attribute or parameter can hold.
///
/// Each kind maps onto a D-Bus type signature; the signature is what
/// command-line tools and plugins use to name a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    String,
    Boolean,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Byte,
    Double,
    StringArray,
    ObjectPath,
    ObjectPathArray,
    /// `(uss)`: presence type, status, message
    SimplePresence,
}

impl ValueType {
    /// D-Bus type signature for this kind
    #[must_use]
    pub fn signature(self) -> &'static str {
        match self {
            Self::String => "s",
            Self::Boolean => "b",
            Self::Int32 => "i",
            Self::Int64 => "x",
            Self::UInt32 => "u",
            Self::UInt64 => "t",
            Self::Byte => "y",
            Self::Double => "d",
            Self::StringArray => "as",
            Self::ObjectPath => "o",
            Self::ObjectPathArray => "ao",
            Self::SimplePresence => "(uss)",
        }
    }

    /// Inverse of [`signature`](Self::signature).
    #[must_use]
    pub fn from_signature(signature: &str) -> Option<Self> {
        let ty = match signature {
            "s" => Self::String,
            "b" => Self::Boolean,
            "i" => Self::Int32,
            "x" => Self::Int64,
            "u" => Self::UInt32,
            "t" => Self::UInt64,
            "y" => Self::Byte,
            "d" => Self::Double,
            "as" => Self::StringArray,
            "o" => Self::ObjectPath,
            "ao" => Self::ObjectPathArray,
            "(uss)" => Self::SimplePresence,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Byte => "byte",
            Self::Double => "double",
            Self::StringArray => "string array",
            Self::ObjectPath => "object path",
            Self::ObjectPathArray => "object path array",
            Self::SimplePresence => "simple presence",
        };
        f.write_str(name)
    }
}

/// A syntactically valid D-Bus object path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Validate `path` against the object path grammar.
    pub fn new(path: impl Into<String>) -> Result<Self, CodecError> {
        let path = path.into();
        if is_valid_object_path(&path) {
            Ok(Self(path))
        } else {
            Err(CodecError::InvalidObjectPath(path))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectPath {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}

/// `/` or one or more `/`-prefixed elements of `[A-Za-z0-9_]`.
#[must_use]
pub fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    rest.split('/').all(|element| {
        !element.is_empty()
            && element
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// The `(uss)` presence struct: connection presence type, status
/// identifier and a free-form message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimplePresence {
    pub kind: u32,
    pub status: String,
    pub message: String,
}

impl SimplePresence {
    #[must_use]
    pub fn new(kind: u32, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: status.into(),
            message: message.into(),
        }
    }
}

/// A dynamically typed attribute or parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    String(String),
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Byte(u8),
    Double(f64),
    StringArray(Vec<String>),
    ObjectPath(ObjectPath),
    ObjectPathArray(Vec<ObjectPath>),
    SimplePresence(SimplePresence),
}

impl Value {
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Int32(_) => ValueType::Int32,
            Self::Int64(_) => ValueType::Int64,
            Self::UInt32(_) => ValueType::UInt32,
            Self::UInt64(_) => ValueType::UInt64,
            Self::Byte(_) => ValueType::Byte,
            Self::Double(_) => ValueType::Double,
            Self::StringArray(_) => ValueType::StringArray,
            Self::ObjectPath(_) => ValueType::ObjectPath,
            Self::ObjectPathArray(_) => ValueType::ObjectPathArray,
            Self::SimplePresence(_) => ValueType::SimplePresence,
        }
    }

    /// Borrow the text of a string or object path value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::ObjectPath(p) => Some(p.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt32(u) => Some(*u),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int32(i)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Self::UInt32(u)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

impl From<ObjectPath> for Value {
    fn from(p: ObjectPath) -> Self {
        Self::ObjectPath(p)
    }
}

impl From<SimplePresence> for Value {
    fn from(p: SimplePresence) -> Self {
        Self::SimplePresence(p)
    }
}
