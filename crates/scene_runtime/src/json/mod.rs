//! # JSON Value Tree
//!
//! A dependency-free JSON reader for scene files. [`parse`] turns text into a [`Value`];
//! typed accessors (`as_object`, `as_array`, `as_number`, `as_string`) are the single
//! error path for shape mismatches. `Display` writes compact JSON back out.
//!
//! Numbers keep their lexical sub-kind so that index-like fields can be read as
//! unsigned without a conversion check:
//!
//! | text       | variant                  |
//! |------------|--------------------------|
//! | `12`       | [`Number::Unsigned`]     |
//! | `-12`      | [`Number::Negative`]     |
//! | `1.5`      | [`Number::Float`]        |
//! | `1.5e3`    | [`Number::Exponential`]  |

mod parser;
mod writer;

pub use parser::{parse, MAX_DEPTH};

use std::collections::BTreeMap;
use std::fmt;

/// Errors produced while parsing or reading JSON
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum JsonError {
    /// Input ended inside a value
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd {
        /// What the parser was looking for
        expected: &'static str,
    },

    /// A character that cannot start or continue the current construct
    #[error("unexpected '{found}' at byte {offset}, expected {expected}")]
    UnexpectedChar {
        /// Offending character
        found: char,
        /// Byte offset in the input
        offset: usize,
        /// What the parser was looking for
        expected: &'static str,
    },

    /// Malformed number body
    #[error("invalid number '{text}' at byte {offset}")]
    InvalidNumber {
        /// Raw number text
        text: String,
        /// Byte offset in the input
        offset: usize,
    },

    /// Unknown escape character after a backslash
    #[error("invalid escape '\\{found}' at byte {offset}")]
    InvalidEscape {
        /// Character following the backslash
        found: char,
        /// Byte offset in the input
        offset: usize,
    },

    /// Bad `\u` escape (non-hex digit or unpaired surrogate)
    #[error("invalid unicode escape at byte {offset}")]
    InvalidUnicode {
        /// Byte offset in the input
        offset: usize,
    },

    /// Arrays and objects nested deeper than [`MAX_DEPTH`]
    #[error("nesting deeper than {} levels at byte {offset}", MAX_DEPTH)]
    TooDeep {
        /// Byte offset of the opening bracket
        offset: usize,
    },

    /// Non-whitespace after the top-level value
    #[error("trailing content at byte {offset}")]
    TrailingContent {
        /// Byte offset in the input
        offset: usize,
    },

    /// A value had a different shape than requested
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested kind
        expected: ValueKind,
        /// Stored kind
        found: ValueKind,
    },

    /// Required object key is absent
    #[error("missing key \"{0}\"")]
    MissingKey(String),

    /// Fixed-size array field had the wrong length
    #[error("key \"{key}\" expects {expected} elements, found {found}")]
    ArrayLength {
        /// Field name
        key: String,
        /// Required length
        expected: usize,
        /// Actual length
        found: usize,
    },

    /// Number does not fit the requested integer type
    #[error("number {0} out of range")]
    OutOfRange(String),
}

/// Discriminant of a [`Value`], used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
    /// Any number
    Number,
    /// `true` / `false`
    Bool,
    /// `"..."`
    String,
    /// `null`
    Null,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}

/// A JSON number with its lexical sub-kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer written with a leading minus (always `< 0`)
    Negative(i64),
    /// Integer without a sign
    Unsigned(u64),
    /// Number with a fractional part and no exponent
    Float(f64),
    /// Number with an exponent
    Exponential(f64),
}

impl Number {
    /// Value as `f64`, whatever the sub-kind
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Negative(v) => v as f64,
            Self::Unsigned(v) => v as f64,
            Self::Float(v) | Self::Exponential(v) => v,
        }
    }

    /// Value as `f32`
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_f32(self) -> f32 {
        self.as_f64() as f32
    }

    /// Value as `u32`; only unsigned integers convert
    pub fn as_u32(self) -> Result<u32, JsonError> {
        match self {
            Self::Unsigned(v) => u32::try_from(v).map_err(|_| JsonError::OutOfRange(v.to_string())),
            other => Err(JsonError::OutOfRange(other.to_string())),
        }
    }
}

/// Parsed JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Key/value map
    Object(Object),
    /// Ordered list
    Array(Vec<Value>),
    /// Number
    Number(Number),
    /// Boolean
    Bool(bool),
    /// String with escapes decoded
    String(String),
    /// `null`
    Null,
}

impl Value {
    /// Discriminant of this value
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Object(_) => ValueKind::Object,
            Self::Array(_) => ValueKind::Array,
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Bool,
            Self::String(_) => ValueKind::String,
            Self::Null => ValueKind::Null,
        }
    }

    const fn mismatch(&self, expected: ValueKind) -> JsonError {
        JsonError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    /// Borrow as an object
    pub const fn as_object(&self) -> Result<&Object, JsonError> {
        match self {
            Self::Object(o) => Ok(o),
            other => Err(other.mismatch(ValueKind::Object)),
        }
    }

    /// Borrow as an array
    pub fn as_array(&self) -> Result<&[Value], JsonError> {
        match self {
            Self::Array(a) => Ok(a),
            other => Err(other.mismatch(ValueKind::Array)),
        }
    }

    /// Read as a number
    pub const fn as_number(&self) -> Result<Number, JsonError> {
        match self {
            Self::Number(n) => Ok(*n),
            other => Err(other.mismatch(ValueKind::Number)),
        }
    }

    /// Borrow as a string
    pub fn as_string(&self) -> Result<&str, JsonError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    /// Read as a boolean
    pub const fn as_bool(&self) -> Result<bool, JsonError> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.mismatch(ValueKind::Bool)),
        }
    }

    /// Read as `f32`
    pub fn as_f32(&self) -> Result<f32, JsonError> {
        self.as_number().map(Number::as_f32)
    }
}

/// JSON object with keys kept in sorted order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: BTreeMap<String, Value>,
}

impl Object {
    /// Empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key; a repeated key replaces the earlier value
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up a key that must be present
    pub fn require(&self, key: &str) -> Result<&Value, JsonError> {
        self.get(key).ok_or_else(|| JsonError::MissingKey(key.to_string()))
    }

    /// Required string field
    pub fn string(&self, key: &str) -> Result<&str, JsonError> {
        self.require(key)?.as_string()
    }

    /// Required object field
    pub fn object(&self, key: &str) -> Result<&Object, JsonError> {
        self.require(key)?.as_object()
    }

    /// Required array field
    pub fn array(&self, key: &str) -> Result<&[Value], JsonError> {
        self.require(key)?.as_array()
    }

    /// Required number field as `f32`
    pub fn f32(&self, key: &str) -> Result<f32, JsonError> {
        self.require(key)?.as_f32()
    }

    /// Required unsigned integer field
    pub fn u32(&self, key: &str) -> Result<u32, JsonError> {
        self.require(key)?.as_number()?.as_u32()
    }

    /// Optional number field as `f32`
    pub fn f32_or(&self, key: &str, default: f32) -> Result<f32, JsonError> {
        self.get(key).map_or(Ok(default), Value::as_f32)
    }

    /// Required array of numbers
    pub fn floats(&self, key: &str) -> Result<Vec<f32>, JsonError> {
        self.array(key)?.iter().map(Value::as_f32).collect()
    }

    /// Required array of exactly `N` numbers
    pub fn floats_n<const N: usize>(&self, key: &str) -> Result<[f32; N], JsonError> {
        let values = self.array(key)?;
        if values.len() != N {
            return Err(JsonError::ArrayLength {
                key: key.to_string(),
                expected: N,
                found: values.len(),
            });
        }
        let mut out = [0.0; N];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value.as_f32()?;
        }
        Ok(out)
    }

    /// Required array of strings
    pub fn strings(&self, key: &str) -> Result<Vec<&str>, JsonError> {
        self.array(key)?.iter().map(Value::as_string).collect()
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
