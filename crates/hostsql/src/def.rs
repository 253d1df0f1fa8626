//! Table definitions for the three flavors.
//!
//! A definition is the immutable product of a builder: name, columns,
//! optional filters and indexes, and the host callbacks that produce or
//! mutate rows. Definitions are cheaply cloneable; registration clones
//! one onto the engine side, and the caller's copy may be dropped or
//! kept for operations like cache invalidation.

use std::sync::Arc;

use rusqlite::types::Value;

use crate::cache::{CacheSnapshot, IndexEntry, SharedCache};
use crate::column::{LiveColumn, RowColumn};
use crate::filter::FilterEntry;
use crate::row_iter::RowGenerator;
use crate::value::ColumnType;

pub(crate) type CountFn = Arc<dyn Fn() -> usize + Send + Sync>;
pub(crate) type EstimateFn = Arc<dyn Fn() -> i64 + Send + Sync>;
pub(crate) type DeleteFn = Arc<dyn Fn(usize) -> bool + Send + Sync>;
pub(crate) type InsertFn = Arc<dyn Fn(&[Value]) -> Option<i64> + Send + Sync>;
pub(crate) type ModifyHook = Arc<dyn Fn(&str) + Send + Sync>;
pub(crate) type PopulateFn<R> = Arc<dyn Fn(&mut Vec<R>) + Send + Sync>;
pub(crate) type GeneratorFn<R> = Arc<dyn Fn() -> Box<dyn RowGenerator<R>> + Send + Sync>;

fn render_schema<'a>(
    name: &str,
    columns: impl Iterator<Item = (&'a str, ColumnType)>,
) -> String {
    let mut sql = format!("CREATE TABLE {name}(");
    for (i, (col, ty)) in columns.enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(col);
        sql.push(' ');
        sql.push_str(ty.sql_decl());
    }
    sql.push(')');
    sql
}

/// A table whose rows are produced by indexing into host data on every
/// access. The only flavor that admits mutation.
#[derive(Clone)]
pub struct LiveTableDef {
    pub(crate) name: String,
    pub(crate) row_count: CountFn,
    pub(crate) estimate_rows: Option<EstimateFn>,
    pub(crate) columns: Vec<LiveColumn>,
    pub(crate) filters: Vec<FilterEntry>,
    pub(crate) delete_row: Option<DeleteFn>,
    pub(crate) insert_row: Option<InsertFn>,
    pub(crate) before_modify: Option<ModifyHook>,
}

impl LiveTableDef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[LiveColumn] {
        &self.columns
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterEntry] {
        &self.filters
    }

    /// DDL declared to the engine on connect.
    #[must_use]
    pub fn schema_sql(&self) -> String {
        render_schema(
            &self.name,
            self.columns.iter().map(|c| (c.name(), c.column_type())),
        )
    }

    pub(crate) fn planning_rows(&self) -> f64 {
        self.estimate_rows
            .as_ref()
            .map_or(crate::plan::FALLBACK_ROWS_LIVE, |f| f() as f64)
    }

    pub(crate) fn fire_before_modify(&self, op: &str) {
        if let Some(hook) = &self.before_modify {
            hook(op);
        }
    }
}

/// A table that enumerates host data once into a shared cache and
/// optionally serves equality lookups from hash indexes over it.
pub struct CachedTableDef<R> {
    pub(crate) name: String,
    pub(crate) estimate_rows: Option<EstimateFn>,
    pub(crate) populate: PopulateFn<R>,
    pub(crate) columns: Vec<RowColumn<R>>,
    pub(crate) filters: Vec<FilterEntry>,
    pub(crate) indexes: Vec<IndexEntry<R>>,
    pub(crate) cache: Arc<SharedCache<R>>,
}

impl<R> Clone for CachedTableDef<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            estimate_rows: self.estimate_rows.clone(),
            populate: Arc::clone(&self.populate),
            columns: self.columns.clone(),
            filters: self.filters.clone(),
            indexes: self.indexes.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<R> CachedTableDef<R> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[RowColumn<R>] {
        &self.columns
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterEntry] {
        &self.filters
    }

    #[must_use]
    pub fn schema_sql(&self) -> String {
        render_schema(
            &self.name,
            self.columns.iter().map(|c| (c.name(), c.column_type())),
        )
    }

    /// Drop the cache so the next cursor rebuilds it. This is the only
    /// way host-data changes propagate into an already registered cached
    /// table.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Whether the shared cache currently holds a snapshot.
    #[must_use]
    pub fn is_cache_built(&self) -> bool {
        self.cache.is_built()
    }

    pub(crate) fn snapshot(&self) -> Arc<CacheSnapshot<R>> {
        self.cache.snapshot(self.populate.as_ref(), &self.indexes)
    }

    pub(crate) fn indexed_columns(&self) -> Vec<usize> {
        self.indexes.iter().map(IndexEntry::column).collect()
    }

    pub(crate) fn planning_rows(&self) -> f64 {
        self.estimate_rows
            .as_ref()
            .map_or(crate::plan::FALLBACK_ROWS_MATERIALIZED, |f| f() as f64)
    }
}

/// A table that streams rows from a one-shot producer, constructed per
/// scan so `LIMIT` stops enumeration early.
pub struct GeneratorTableDef<R> {
    pub(crate) name: String,
    pub(crate) estimate_rows: Option<EstimateFn>,
    pub(crate) make_generator: GeneratorFn<R>,
    pub(crate) columns: Vec<RowColumn<R>>,
    pub(crate) filters: Vec<FilterEntry>,
}

impl<R> Clone for GeneratorTableDef<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            estimate_rows: self.estimate_rows.clone(),
            make_generator: Arc::clone(&self.make_generator),
            columns: self.columns.clone(),
            filters: self.filters.clone(),
        }
    }
}

impl<R> GeneratorTableDef<R> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[RowColumn<R>] {
        &self.columns
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterEntry] {
        &self.filters
    }

    #[must_use]
    pub fn schema_sql(&self) -> String {
        render_schema(
            &self.name,
            self.columns.iter().map(|c| (c.name(), c.column_type())),
        )
    }

    pub(crate) fn planning_rows(&self) -> f64 {
        self.estimate_rows
            .as_ref()
            .map_or(crate::plan::FALLBACK_ROWS_MATERIALIZED, |f| f() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{cached_table, table};

    #[test]
    fn schema_renders_columns_in_order() {
        let def = table("inventory")
            .count(|| 0)
            .column_i64("id", |_| 0)
            .column_text("name", |_| String::new())
            .column_real("price", |_| 0.0)
            .column_blob("thumb", |_| Vec::new())
            .build();
        assert_eq!(
            def.schema_sql(),
            "CREATE TABLE inventory(id INTEGER, name TEXT, price REAL, thumb BLOB)"
        );
    }

    #[test]
    fn clone_shares_the_cache_handle() {
        let def = cached_table::<i64>("nums")
            .cache_builder(|rows| rows.push(1))
            .column_i64("n", |r| *r)
            .build();
        let clone = def.clone();
        let _ = def.snapshot();
        assert!(clone.is_cache_built());
        clone.invalidate_cache();
        assert!(!def.is_cache_built());
    }

    #[test]
    fn planning_rows_falls_back_pessimistically() {
        let live = table("t").count(|| 3).column_i64("a", |_| 0).build();
        assert!((live.planning_rows() - 100_000.0).abs() < f64::EPSILON);

        let live = table("t")
            .count(|| 3)
            .estimate_rows(|| 3)
            .column_i64("a", |_| 0)
            .build();
        assert!((live.planning_rows() - 3.0).abs() < f64::EPSILON);
    }
}
