//! Typed value model for marshaled data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One marshaled value inside a parcel or bundle.
///
/// Each kind carries a documented zero-value that degraded reads fall
/// back to: `0`, `0.0`, `false`, the empty string, the empty blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// Double-precision float
    Float(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    String(String),
    /// Opaque byte blob
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the name of this value's kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Blob(_) => "blob",
        }
    }

    /// Returns the contained int, or `0` for any other kind.
    pub fn as_int(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            _ => 0,
        }
    }

    /// Returns the contained long, or `0` for any other kind.
    pub fn as_long(&self) -> i64 {
        match self {
            Value::Long(v) => *v,
            _ => 0,
        }
    }

    /// Returns the contained float, or `0.0` for any other kind.
    pub fn as_float(&self) -> f64 {
        match self {
            Value::Float(v) => *v,
            _ => 0.0,
        }
    }

    /// Returns the contained bool, or `false` for any other kind.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            _ => false,
        }
    }

    /// Returns the contained string, or the empty string for any other kind.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(v) => v.clone(),
            _ => String::new(),
        }
    }

    /// Returns the contained blob, or the empty blob for any other kind.
    pub fn as_blob(&self) -> Vec<u8> {
        match self {
            Value::Blob(v) => v.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Blob(v) => write!(f, "blob[{}]", v.len()),
        }
    }
}
