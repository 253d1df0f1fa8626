//! Convenience wrapper around an engine connection.
//!
//! Registers definitions and creates their tables in one call, and runs
//! queries into a stringly result shape that the wire protocol and the
//! CLI both consume. Hosts that need the full engine API can reach the
//! underlying connection at any time.

use std::path::Path;

use rusqlite::Connection;
use rusqlite::types::ValueRef;

use crate::def::{CachedTableDef, GeneratorTableDef, LiveTableDef};
use crate::error::Result;
use crate::register::{
    create_virtual_table, register_cached_table, register_generator_table, register_table,
};

/// Column names plus rows rendered to text, the way the engine's own
/// text-mode column accessor renders them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryOutput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

fn render_cell(v: ValueRef<'_>) -> String {
    match v {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

/// An open engine connection with registration helpers.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Open a database file, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// The underlying engine connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Register a live definition and create its table under the
    /// definition's own name.
    pub fn register_and_create_table(&self, def: &LiveTableDef) -> Result<()> {
        self.register_and_create_table_as(def, def.name())
    }

    /// Register a live definition and create its table under a
    /// different name.
    pub fn register_and_create_table_as(&self, def: &LiveTableDef, table_name: &str) -> Result<()> {
        register_table(&self.conn, def.name(), def)?;
        create_virtual_table(&self.conn, table_name, def.name())
    }

    /// Register a cached definition and create its table.
    pub fn register_and_create_cached_table<R: Send + Sync + 'static>(
        &self,
        def: &CachedTableDef<R>,
    ) -> Result<()> {
        register_cached_table(&self.conn, def.name(), def)?;
        create_virtual_table(&self.conn, def.name(), def.name())
    }

    /// Register a generator definition and create its table.
    pub fn register_and_create_generator_table<R: Send + Sync + 'static>(
        &self,
        def: &GeneratorTableDef<R>,
    ) -> Result<()> {
        register_generator_table(&self.conn, def.name(), def)?;
        create_virtual_table(&self.conn, def.name(), def.name())
    }

    /// Run a query and collect every row as text.
    pub fn query(&self, sql: &str) -> Result<QueryOutput> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| (*c).to_owned()).collect();
        let column_count = columns.len();

        let mut out = QueryOutput {
            columns,
            rows: Vec::new(),
        };
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut rendered = Vec::with_capacity(column_count);
            for i in 0..column_count {
                rendered.push(render_cell(row.get_ref(i)?));
            }
            out.rows.push(rendered);
        }
        Ok(out)
    }

    /// Run a statement, returning the number of affected rows.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.execute(sql, [])?)
    }

    /// Run one or more statements, discarding results.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    /// First column of the first row, if any row matches.
    pub fn scalar(&self, sql: &str) -> Result<Option<String>> {
        Ok(self.query(sql)?.rows.into_iter().next().and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        }))
    }

    /// Rows changed by the most recent statement.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.conn.changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::table;

    #[test]
    fn query_renders_rows_as_text() {
        let db = Database::open_in_memory().unwrap();
        let out = db
            .query("SELECT 1 AS a, 'x' AS b, 2.5 AS c, NULL AS d")
            .unwrap();
        assert_eq!(out.columns, vec!["a", "b", "c", "d"]);
        assert_eq!(out.rows, vec![vec!["1", "x", "2.5", ""]]);
    }

    #[test]
    fn scalar_returns_first_cell() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.scalar("SELECT 40 + 2").unwrap().as_deref(), Some("42"));
        assert_eq!(db.scalar("SELECT 1 WHERE 0").unwrap(), None);
    }

    #[test]
    fn register_and_create_in_one_call() {
        static DATA: [i64; 3] = [10, 20, 30];
        let db = Database::open_in_memory().unwrap();
        let def = table("numbers")
            .count(|| DATA.len())
            .column_i64("value", |i| DATA.get(i).copied().unwrap_or(0))
            .build();
        db.register_and_create_table(&def).unwrap();

        let out = db.query("SELECT value FROM numbers ORDER BY value DESC").unwrap();
        assert_eq!(out.rows, vec![vec!["30"], vec!["20"], vec!["10"]]);
    }

    #[test]
    fn create_under_distinct_table_name() {
        static DATA: [i64; 2] = [1, 2];
        let db = Database::open_in_memory().unwrap();
        let def = table("numbers_mod")
            .count(|| DATA.len())
            .column_i64("n", |i| DATA.get(i).copied().unwrap_or(0))
            .build();
        db.register_and_create_table_as(&def, "nums").unwrap();
        assert_eq!(db.scalar("SELECT COUNT(*) FROM nums").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn on_disk_database_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.db");
        let db = Database::open(&path).unwrap();
        db.execute_batch("CREATE TABLE t(x); INSERT INTO t VALUES (7);")
            .unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.scalar("SELECT x FROM t").unwrap().as_deref(), Some("7"));
    }
}
