//! Value bridge between engine dynamic values and native typed values.
//!
//! Column getters and setters traffic in plain Rust types; the engine
//! trafficks in dynamically typed cells. The conversions here follow the
//! engine's own lossy coercion rules: a NULL or mistyped input coerces to
//! the target type's zero value rather than failing the statement.

use rusqlite::types::Value;

/// Declared type of a virtual-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer64,
    /// 32-bit signed integer. Stored and declared as INTEGER.
    Integer32,
    /// 64-bit float.
    Real,
    /// UTF-8 text.
    Text,
    /// Arbitrary bytes.
    Blob,
}

impl ColumnType {
    /// SQL type name used when declaring the table schema to the engine.
    #[must_use]
    pub const fn sql_decl(self) -> &'static str {
        match self {
            Self::Integer64 | Self::Integer32 => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

pub(crate) fn coerce_i64(v: &Value) -> i64 {
    match v {
        Value::Integer(i) => *i,
        Value::Real(f) => *f as i64,
        Value::Text(s) => s.trim().parse().unwrap_or(0),
        Value::Null | Value::Blob(_) => 0,
    }
}

pub(crate) fn coerce_i32(v: &Value) -> i32 {
    // Engine semantics: a 64-bit value narrows by truncation.
    coerce_i64(v) as i32
}

pub(crate) fn coerce_f64(v: &Value) -> f64 {
    match v {
        Value::Integer(i) => *i as f64,
        Value::Real(f) => *f,
        Value::Text(s) => s.trim().parse().unwrap_or(0.0),
        Value::Null | Value::Blob(_) => 0.0,
    }
}

pub(crate) fn coerce_text(v: &Value) -> String {
    match v {
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Null => String::new(),
    }
}

pub(crate) fn coerce_blob(v: &Value) -> Vec<u8> {
    match v {
        Value::Blob(b) => b.clone(),
        Value::Text(s) => s.clone().into_bytes(),
        Value::Integer(_) | Value::Real(_) | Value::Null => Vec::new(),
    }
}
