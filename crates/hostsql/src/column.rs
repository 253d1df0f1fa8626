//! Column descriptors for the three table flavors.
//!
//! A column is a named cell with a declared type and a value-producing
//! closure. Live columns address host data by row index and may carry a
//! setter; row columns read from a materialized row value and are always
//! read-only. Payloads are variant-per-type so the value bridge stays
//! monomorphic per cell type.

use std::sync::Arc;

use rusqlite::types::Value;

use crate::value::{ColumnType, coerce_blob, coerce_f64, coerce_i32, coerce_i64, coerce_text};

/// Getter for a live column: host data addressed by row index.
pub type LiveGet<T> = Arc<dyn Fn(usize) -> T + Send + Sync>;
/// Setter for a writable live column. Returns `false` to fail the statement.
pub type LiveSet<T> = Arc<dyn Fn(usize, T) -> bool + Send + Sync>;
/// Getter for a cached/generator column: reads from a materialized row.
pub type RowGet<R, T> = Arc<dyn Fn(&R) -> T + Send + Sync>;

/// Outcome of routing an UPDATE value to a live column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetOutcome {
    /// Column is read-only; the value was ignored.
    Skipped,
    /// Setter ran and accepted the value.
    Applied,
    /// Setter ran and rejected the value.
    Rejected,
}

#[derive(Clone)]
enum LiveKind {
    Int64 {
        get: LiveGet<i64>,
        set: Option<LiveSet<i64>>,
    },
    Int32 {
        get: LiveGet<i32>,
        set: Option<LiveSet<i32>>,
    },
    Real {
        get: LiveGet<f64>,
        set: Option<LiveSet<f64>>,
    },
    Text {
        get: LiveGet<String>,
        set: Option<LiveSet<String>>,
    },
    Blob {
        get: LiveGet<Vec<u8>>,
        set: Option<LiveSet<Vec<u8>>>,
    },
}

/// A column over live host data.
#[derive(Clone)]
pub struct LiveColumn {
    name: String,
    kind: LiveKind,
}

impl LiveColumn {
    fn new(name: &str, kind: LiveKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn int64(name: &str, get: impl Fn(usize) -> i64 + Send + Sync + 'static) -> Self {
        Self::new(
            name,
            LiveKind::Int64 {
                get: Arc::new(get),
                set: None,
            },
        )
    }

    pub fn int64_rw(
        name: &str,
        get: impl Fn(usize) -> i64 + Send + Sync + 'static,
        set: impl Fn(usize, i64) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            name,
            LiveKind::Int64 {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            },
        )
    }

    pub fn int32(name: &str, get: impl Fn(usize) -> i32 + Send + Sync + 'static) -> Self {
        Self::new(
            name,
            LiveKind::Int32 {
                get: Arc::new(get),
                set: None,
            },
        )
    }

    pub fn int32_rw(
        name: &str,
        get: impl Fn(usize) -> i32 + Send + Sync + 'static,
        set: impl Fn(usize, i32) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            name,
            LiveKind::Int32 {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            },
        )
    }

    pub fn real(name: &str, get: impl Fn(usize) -> f64 + Send + Sync + 'static) -> Self {
        Self::new(
            name,
            LiveKind::Real {
                get: Arc::new(get),
                set: None,
            },
        )
    }

    pub fn real_rw(
        name: &str,
        get: impl Fn(usize) -> f64 + Send + Sync + 'static,
        set: impl Fn(usize, f64) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            name,
            LiveKind::Real {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            },
        )
    }

    pub fn text(name: &str, get: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        Self::new(
            name,
            LiveKind::Text {
                get: Arc::new(get),
                set: None,
            },
        )
    }

    pub fn text_rw(
        name: &str,
        get: impl Fn(usize) -> String + Send + Sync + 'static,
        set: impl Fn(usize, String) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            name,
            LiveKind::Text {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            },
        )
    }

    pub fn blob(name: &str, get: impl Fn(usize) -> Vec<u8> + Send + Sync + 'static) -> Self {
        Self::new(
            name,
            LiveKind::Blob {
                get: Arc::new(get),
                set: None,
            },
        )
    }

    pub fn blob_rw(
        name: &str,
        get: impl Fn(usize) -> Vec<u8> + Send + Sync + 'static,
        set: impl Fn(usize, Vec<u8>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            name,
            LiveKind::Blob {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            },
        )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self.kind {
            LiveKind::Int64 { .. } => ColumnType::Integer64,
            LiveKind::Int32 { .. } => ColumnType::Integer32,
            LiveKind::Real { .. } => ColumnType::Real,
            LiveKind::Text { .. } => ColumnType::Text,
            LiveKind::Blob { .. } => ColumnType::Blob,
        }
    }

    /// Whether this column carries a setter.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        match &self.kind {
            LiveKind::Int64 { set, .. } => set.is_some(),
            LiveKind::Int32 { set, .. } => set.is_some(),
            LiveKind::Real { set, .. } => set.is_some(),
            LiveKind::Text { set, .. } => set.is_some(),
            LiveKind::Blob { set, .. } => set.is_some(),
        }
    }

    /// Produce the cell value at `row`.
    pub(crate) fn read(&self, row: usize) -> Value {
        match &self.kind {
            LiveKind::Int64 { get, .. } => Value::Integer(get(row)),
            LiveKind::Int32 { get, .. } => Value::Integer(i64::from(get(row))),
            LiveKind::Real { get, .. } => Value::Real(get(row)),
            LiveKind::Text { get, .. } => Value::Text(get(row)),
            LiveKind::Blob { get, .. } => Value::Blob(get(row)),
        }
    }

    /// Route an UPDATE value to the setter, coercing to the column's
    /// native type. Read-only columns skip without touching host data.
    pub(crate) fn apply_set(&self, row: usize, v: &Value) -> SetOutcome {
        fn run<T>(set: Option<&LiveSet<T>>, row: usize, v: T) -> SetOutcome {
            match set {
                None => SetOutcome::Skipped,
                Some(f) => {
                    if f(row, v) {
                        SetOutcome::Applied
                    } else {
                        SetOutcome::Rejected
                    }
                }
            }
        }
        match &self.kind {
            LiveKind::Int64 { set, .. } => run(set.as_ref(), row, coerce_i64(v)),
            LiveKind::Int32 { set, .. } => run(set.as_ref(), row, coerce_i32(v)),
            LiveKind::Real { set, .. } => run(set.as_ref(), row, coerce_f64(v)),
            LiveKind::Text { set, .. } => run(set.as_ref(), row, coerce_text(v)),
            LiveKind::Blob { set, .. } => run(set.as_ref(), row, coerce_blob(v)),
        }
    }
}

enum RowKind<R> {
    Int64(RowGet<R, i64>),
    Int32(RowGet<R, i32>),
    Real(RowGet<R, f64>),
    Text(RowGet<R, String>),
    Blob(RowGet<R, Vec<u8>>),
}

impl<R> Clone for RowKind<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Int64(g) => Self::Int64(Arc::clone(g)),
            Self::Int32(g) => Self::Int32(Arc::clone(g)),
            Self::Real(g) => Self::Real(Arc::clone(g)),
            Self::Text(g) => Self::Text(Arc::clone(g)),
            Self::Blob(g) => Self::Blob(Arc::clone(g)),
        }
    }
}

/// A read-only column over a materialized row type.
pub struct RowColumn<R> {
    name: String,
    kind: RowKind<R>,
}

impl<R> Clone for RowColumn<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
        }
    }
}

impl<R> RowColumn<R> {
    fn new(name: &str, kind: RowKind<R>) -> Self {
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn int64(name: &str, get: impl Fn(&R) -> i64 + Send + Sync + 'static) -> Self {
        Self::new(name, RowKind::Int64(Arc::new(get)))
    }

    pub fn int32(name: &str, get: impl Fn(&R) -> i32 + Send + Sync + 'static) -> Self {
        Self::new(name, RowKind::Int32(Arc::new(get)))
    }

    pub fn real(name: &str, get: impl Fn(&R) -> f64 + Send + Sync + 'static) -> Self {
        Self::new(name, RowKind::Real(Arc::new(get)))
    }

    pub fn text(name: &str, get: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        Self::new(name, RowKind::Text(Arc::new(get)))
    }

    pub fn blob(name: &str, get: impl Fn(&R) -> Vec<u8> + Send + Sync + 'static) -> Self {
        Self::new(name, RowKind::Blob(Arc::new(get)))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self.kind {
            RowKind::Int64(_) => ColumnType::Integer64,
            RowKind::Int32(_) => ColumnType::Integer32,
            RowKind::Real(_) => ColumnType::Real,
            RowKind::Text(_) => ColumnType::Text,
            RowKind::Blob(_) => ColumnType::Blob,
        }
    }

    pub(crate) fn read(&self, row: &R) -> Value {
        match &self.kind {
            RowKind::Int64(get) => Value::Integer(get(row)),
            RowKind::Int32(get) => Value::Integer(i64::from(get(row))),
            RowKind::Real(get) => Value::Real(get(row)),
            RowKind::Text(get) => Value::Text(get(row)),
            RowKind::Blob(get) => Value::Blob(get(row)),
        }
    }
}
