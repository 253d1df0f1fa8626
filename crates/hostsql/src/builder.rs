//! Fluent builders for the three table flavors.
//!
//! Builders are write-only accumulators; `build()` consumes them and the
//! resulting definition is immutable. Optional optimizations that
//! reference a missing column are dropped silently so a misconfigured
//! filter or index can never keep a table from working.

use std::sync::Arc;

use rusqlite::types::Value;

use crate::cache::{IndexEntry, SharedCache};
use crate::column::{LiveColumn, RowColumn};
use crate::def::{CachedTableDef, GeneratorTableDef, LiveTableDef};
use crate::filter::{FILTER_ID_MAX, FilterEntry};
use crate::row_iter::{IterGenerator, RowGenerator, RowIterator};

/// Start a live table definition.
#[must_use]
pub fn table(name: &str) -> LiveTableBuilder {
    LiveTableBuilder {
        def: LiveTableDef {
            name: name.to_owned(),
            row_count: Arc::new(|| 0),
            estimate_rows: None,
            columns: Vec::new(),
            filters: Vec::new(),
            delete_row: None,
            insert_row: None,
            before_modify: None,
        },
    }
}

/// Start a cached table definition over row type `R`.
#[must_use]
pub fn cached_table<R>(name: &str) -> CachedTableBuilder<R> {
    CachedTableBuilder {
        def: CachedTableDef {
            name: name.to_owned(),
            estimate_rows: None,
            populate: Arc::new(|_| {}),
            columns: Vec::new(),
            filters: Vec::new(),
            indexes: Vec::new(),
            cache: Arc::new(SharedCache::new()),
        },
    }
}

/// Start a generator table definition over row type `R`.
#[must_use]
pub fn generator_table<R: 'static>(name: &str) -> GeneratorTableBuilder<R> {
    GeneratorTableBuilder {
        def: GeneratorTableDef {
            name: name.to_owned(),
            estimate_rows: None,
            make_generator: Arc::new(|| {
                Box::new(IterGenerator::new(std::iter::empty())) as Box<dyn RowGenerator<R>>
            }),
            columns: Vec::new(),
            filters: Vec::new(),
        },
    }
}

fn push_filter<F>(
    filters: &mut Vec<FilterEntry>,
    column: Option<usize>,
    cost: f64,
    rows: f64,
    make: F,
) where
    F: FnOnce(usize, i32, f64, f64) -> FilterEntry,
{
    let Some(column) = column else {
        // Unknown column: the optimization is dropped, the table still works.
        return;
    };
    if filters.iter().any(|f| f.column() == column) {
        return;
    }
    let id = filters.len() as i32 + 1;
    if id > FILTER_ID_MAX {
        return;
    }
    filters.push(make(column, id, cost, rows));
}

/// Builder for [`LiveTableDef`].
pub struct LiveTableBuilder {
    def: LiveTableDef,
}

impl LiveTableBuilder {
    /// Authoritative row count, sampled once per scan. Not used for
    /// planning; see [`estimate_rows`](Self::estimate_rows).
    #[must_use]
    pub fn count(mut self, f: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.def.row_count = Arc::new(f);
        self
    }

    /// Cheap advisory row count used only while planning.
    #[must_use]
    pub fn estimate_rows(mut self, f: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.def.estimate_rows = Some(Arc::new(f));
        self
    }

    /// Hook invoked with an operation description before any setter,
    /// deleter, or inserter runs.
    #[must_use]
    pub fn on_modify(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.def.before_modify = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn column_i64(
        mut self,
        name: &str,
        get: impl Fn(usize) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::int64(name, get));
        self
    }

    #[must_use]
    pub fn column_i64_rw(
        mut self,
        name: &str,
        get: impl Fn(usize) -> i64 + Send + Sync + 'static,
        set: impl Fn(usize, i64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::int64_rw(name, get, set));
        self
    }

    #[must_use]
    pub fn column_i32(
        mut self,
        name: &str,
        get: impl Fn(usize) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::int32(name, get));
        self
    }

    #[must_use]
    pub fn column_i32_rw(
        mut self,
        name: &str,
        get: impl Fn(usize) -> i32 + Send + Sync + 'static,
        set: impl Fn(usize, i32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::int32_rw(name, get, set));
        self
    }

    #[must_use]
    pub fn column_real(
        mut self,
        name: &str,
        get: impl Fn(usize) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::real(name, get));
        self
    }

    #[must_use]
    pub fn column_real_rw(
        mut self,
        name: &str,
        get: impl Fn(usize) -> f64 + Send + Sync + 'static,
        set: impl Fn(usize, f64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::real_rw(name, get, set));
        self
    }

    #[must_use]
    pub fn column_text(
        mut self,
        name: &str,
        get: impl Fn(usize) -> String + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::text(name, get));
        self
    }

    #[must_use]
    pub fn column_text_rw(
        mut self,
        name: &str,
        get: impl Fn(usize) -> String + Send + Sync + 'static,
        set: impl Fn(usize, String) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::text_rw(name, get, set));
        self
    }

    #[must_use]
    pub fn column_blob(
        mut self,
        name: &str,
        get: impl Fn(usize) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::blob(name, get));
        self
    }

    #[must_use]
    pub fn column_blob_rw(
        mut self,
        name: &str,
        get: impl Fn(usize) -> Vec<u8> + Send + Sync + 'static,
        set: impl Fn(usize, Vec<u8>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(LiveColumn::blob_rw(name, get, set));
        self
    }

    /// Register a specialized iterator for `column = ?` constraints with
    /// integer keys.
    #[must_use]
    pub fn filter_eq(
        mut self,
        column: &str,
        factory: impl Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        estimated_rows: f64,
    ) -> Self {
        let pos = self.column_position(column);
        push_filter(&mut self.def.filters, pos, cost, estimated_rows, |c, id, cost, rows| {
            FilterEntry::int(c, id, cost, rows, factory)
        });
        self
    }

    /// Register a specialized iterator for `column = ?` constraints with
    /// text keys.
    #[must_use]
    pub fn filter_eq_text(
        mut self,
        column: &str,
        factory: impl Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        estimated_rows: f64,
    ) -> Self {
        let pos = self.column_position(column);
        push_filter(&mut self.def.filters, pos, cost, estimated_rows, |c, id, cost, rows| {
            FilterEntry::text(c, id, cost, rows, factory)
        });
        self
    }

    /// Opt in to DELETE. The callback removes the row at the given scan
    /// position and returns `false` to fail the statement.
    #[must_use]
    pub fn deletable(mut self, f: impl Fn(usize) -> bool + Send + Sync + 'static) -> Self {
        self.def.delete_row = Some(Arc::new(f));
        self
    }

    /// Opt in to INSERT. The callback receives the new column values and
    /// returns the rowid of the inserted row, or `None` to fail.
    #[must_use]
    pub fn insertable(
        mut self,
        f: impl Fn(&[Value]) -> Option<i64> + Send + Sync + 'static,
    ) -> Self {
        self.def.insert_row = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn build(self) -> LiveTableDef {
        self.def
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.def.columns.iter().position(|c| c.name() == name)
    }
}

/// Builder for [`CachedTableDef`].
pub struct CachedTableBuilder<R> {
    def: CachedTableDef<R>,
}

impl<R> CachedTableBuilder<R> {
    /// Cheap advisory row count used only while planning.
    #[must_use]
    pub fn estimate_rows(mut self, f: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.def.estimate_rows = Some(Arc::new(f));
        self
    }

    /// Bulk population callback, run once per cache build.
    #[must_use]
    pub fn cache_builder(mut self, f: impl Fn(&mut Vec<R>) + Send + Sync + 'static) -> Self {
        self.def.populate = Arc::new(f);
        self
    }

    #[must_use]
    pub fn column_i64(
        mut self,
        name: &str,
        get: impl Fn(&R) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::int64(name, get));
        self
    }

    #[must_use]
    pub fn column_i32(
        mut self,
        name: &str,
        get: impl Fn(&R) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::int32(name, get));
        self
    }

    #[must_use]
    pub fn column_real(
        mut self,
        name: &str,
        get: impl Fn(&R) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::real(name, get));
        self
    }

    #[must_use]
    pub fn column_text(
        mut self,
        name: &str,
        get: impl Fn(&R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::text(name, get));
        self
    }

    #[must_use]
    pub fn column_blob(
        mut self,
        name: &str,
        get: impl Fn(&R) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::blob(name, get));
        self
    }

    /// Register a specialized iterator for `column = ?` with integer keys.
    /// Bypasses the cache entirely.
    #[must_use]
    pub fn filter_eq(
        mut self,
        column: &str,
        factory: impl Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        estimated_rows: f64,
    ) -> Self {
        let pos = self.column_position(column);
        push_filter(&mut self.def.filters, pos, cost, estimated_rows, |c, id, cost, rows| {
            FilterEntry::int(c, id, cost, rows, factory)
        });
        self
    }

    /// Register a specialized iterator for `column = ?` with text keys.
    #[must_use]
    pub fn filter_eq_text(
        mut self,
        column: &str,
        factory: impl Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        estimated_rows: f64,
    ) -> Self {
        let pos = self.column_position(column);
        push_filter(&mut self.def.filters, pos, cost, estimated_rows, |c, id, cost, rows| {
            FilterEntry::text(c, id, cost, rows, factory)
        });
        self
    }

    /// Build a hash index over `column` inside the shared cache. The key
    /// extractor must agree with the column getter for results to match
    /// a full scan.
    #[must_use]
    pub fn index_on(
        mut self,
        column: &str,
        key: impl Fn(&R) -> i64 + Send + Sync + 'static,
    ) -> Self {
        if let Some(pos) = self.column_position(column)
            && !self.def.indexes.iter().any(|e| e.column() == pos)
        {
            self.def.indexes.push(IndexEntry::new(pos, key));
        }
        self
    }

    #[must_use]
    pub fn build(self) -> CachedTableDef<R> {
        self.def
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.def.columns.iter().position(|c| c.name() == name)
    }
}

/// Builder for [`GeneratorTableDef`].
pub struct GeneratorTableBuilder<R> {
    def: GeneratorTableDef<R>,
}

impl<R: 'static> GeneratorTableBuilder<R> {
    /// Cheap advisory row count used only while planning.
    #[must_use]
    pub fn estimate_rows(mut self, f: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.def.estimate_rows = Some(Arc::new(f));
        self
    }

    /// Factory producing a fresh generator per full scan.
    #[must_use]
    pub fn generator<G>(mut self, f: impl Fn() -> G + Send + Sync + 'static) -> Self
    where
        G: RowGenerator<R> + 'static,
    {
        self.def.make_generator = Arc::new(move || Box::new(f()));
        self
    }

    /// Factory producing a fresh iterator per full scan; rows get
    /// ordinal rowids.
    #[must_use]
    pub fn generator_iter<I>(mut self, f: impl Fn() -> I + Send + Sync + 'static) -> Self
    where
        I: Iterator<Item = R> + Send + 'static,
    {
        self.def.make_generator = Arc::new(move || Box::new(IterGenerator::new(f())));
        self
    }

    #[must_use]
    pub fn column_i64(
        mut self,
        name: &str,
        get: impl Fn(&R) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::int64(name, get));
        self
    }

    #[must_use]
    pub fn column_i32(
        mut self,
        name: &str,
        get: impl Fn(&R) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::int32(name, get));
        self
    }

    #[must_use]
    pub fn column_real(
        mut self,
        name: &str,
        get: impl Fn(&R) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::real(name, get));
        self
    }

    #[must_use]
    pub fn column_text(
        mut self,
        name: &str,
        get: impl Fn(&R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::text(name, get));
        self
    }

    #[must_use]
    pub fn column_blob(
        mut self,
        name: &str,
        get: impl Fn(&R) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        self.def.columns.push(RowColumn::blob(name, get));
        self
    }

    /// Register a specialized iterator for `column = ?` with integer
    /// keys. The generator is never constructed on this path.
    #[must_use]
    pub fn filter_eq(
        mut self,
        column: &str,
        factory: impl Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        estimated_rows: f64,
    ) -> Self {
        let pos = self.column_position(column);
        push_filter(&mut self.def.filters, pos, cost, estimated_rows, |c, id, cost, rows| {
            FilterEntry::int(c, id, cost, rows, factory)
        });
        self
    }

    /// Register a specialized iterator for `column = ?` with text keys.
    #[must_use]
    pub fn filter_eq_text(
        mut self,
        column: &str,
        factory: impl Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        estimated_rows: f64,
    ) -> Self {
        let pos = self.column_position(column);
        push_filter(&mut self.def.filters, pos, cost, estimated_rows, |c, id, cost, rows| {
            FilterEntry::text(c, id, cost, rows, factory)
        });
        self
    }

    #[must_use]
    pub fn build(self) -> GeneratorTableDef<R> {
        self.def
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.def.columns.iter().position(|c| c.name() == name)
    }
}
