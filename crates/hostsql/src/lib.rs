//! hostsql - expose in-process data as first-class SQL tables.
//!
//! A host application declares a table by supplying a row count, per-column
//! value producers, and optionally setters, a row deleter, and specialized
//! iterators for equality constraints. The framework maps that declaration
//! onto the engine's virtual-table protocol, so the full SQL surface
//! (joins, aggregates, window functions, recursive CTEs) works over live
//! host data.
//!
//! Three table flavors cover the common access patterns:
//!
//! - **Live** ([`table`]): every cell read calls back into host data, and
//!   the definition may opt in to UPDATE, DELETE, and INSERT.
//! - **Cached** ([`cached_table`]): host data is enumerated once into a
//!   cache shared by all cursors, with optional hash indexes for
//!   equality lookups. [`CachedTableDef::invalidate_cache`] drops the
//!   cache when the underlying data changes.
//! - **Generator** ([`generator_table`]): rows stream from a one-shot
//!   producer built per scan, so a `LIMIT` stops enumeration early.
//!
//! ```
//! use hostsql::{create_virtual_table, register_table, table};
//!
//! let data: &'static [i64] = &[10, 20, 30];
//! let def = table("numbers")
//!     .count(|| data.len())
//!     .column_i64("value", |i| data.get(i).copied().unwrap_or(0))
//!     .build();
//!
//! let conn = hostsql::rusqlite::Connection::open_in_memory().unwrap();
//! register_table(&conn, "numbers", &def).unwrap();
//! create_virtual_table(&conn, "numbers", "numbers").unwrap();
//!
//! let over_15: i64 = conn
//!     .query_row("SELECT COUNT(*) FROM numbers WHERE value > 15", [], |r| r.get(0))
//!     .unwrap();
//! assert_eq!(over_15, 2);
//! ```

pub use rusqlite;
pub use rusqlite::types::Value;

mod builder;
mod cache;
mod column;
mod database;
mod def;
mod error;
mod filter;
mod functions;
mod plan;
mod register;
mod row_iter;
mod value;
mod vtab;

pub use builder::{
    CachedTableBuilder, GeneratorTableBuilder, LiveTableBuilder, cached_table, generator_table,
    table,
};
pub use cache::{CacheSnapshot, IndexEntry, SharedCache};
pub use column::{LiveColumn, RowColumn};
pub use database::{Database, QueryOutput};
pub use def::{CachedTableDef, GeneratorTableDef, LiveTableDef};
pub use error::{HostError, Result};
pub use filter::{FILTER_ID_MAX, FilterEntry};
pub use functions::register_scalar_function;
pub use plan::INDEX_BASE;
pub use register::{
    create_virtual_table, register_cached_table, register_generator_table, register_table,
    valid_identifier,
};
pub use row_iter::{IterGenerator, RowGenerator, RowIterator, VecRows};
pub use value::ColumnType;
