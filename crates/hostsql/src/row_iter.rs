//! Pull-style row contracts for filter iterators and the streaming flavor.
//!
//! Both contracts derive termination from the advance call alone: once
//! `next` reports exhaustion the cursor latches, and no separate end
//! predicate exists to disagree with it.

use rusqlite::types::Value;

/// One-at-a-time row source used by constraint filter implementations.
///
/// A freshly constructed iterator is positioned before the first row;
/// the cursor calls [`next`](Self::next) once before any column access.
/// Returning `false` ends the scan permanently.
pub trait RowIterator: Send {
    /// Advance to the next row. `false` means the scan is exhausted.
    fn next(&mut self) -> bool;

    /// Cell value of the current row. Out-of-range columns yield
    /// [`Value::Null`].
    fn value(&self, column: usize) -> Value;

    /// Identifier of the current row.
    fn rowid(&self) -> i64;
}

/// One-shot row producer backing a streaming table.
///
/// A fresh generator is constructed per full scan and dropped with its
/// cursor, so a `LIMIT` stops the producer early.
pub trait RowGenerator<R>: Send {
    /// Pull the next row, or `None` when the stream is exhausted.
    fn next(&mut self) -> Option<R>;

    /// Identifier of the row most recently yielded.
    fn rowid(&self) -> i64;
}

/// Adapts any iterator into a [`RowGenerator`] with ordinal rowids.
pub struct IterGenerator<I> {
    inner: I,
    yielded: i64,
}

impl<I> IterGenerator<I> {
    pub fn new(inner: I) -> Self {
        Self { inner, yielded: 0 }
    }
}

impl<R, I> RowGenerator<R> for IterGenerator<I>
where
    I: Iterator<Item = R> + Send,
{
    fn next(&mut self) -> Option<R> {
        let row = self.inner.next();
        if row.is_some() {
            self.yielded += 1;
        }
        row
    }

    fn rowid(&self) -> i64 {
        self.yielded - 1
    }
}

/// A [`RowIterator`] over pre-materialized rows, each with an explicit
/// rowid. Convenient for filter factories that resolve their matches
/// eagerly from a host-side index.
pub struct VecRows {
    rows: Vec<(i64, Vec<Value>)>,
    pos: Option<usize>,
}

impl VecRows {
    #[must_use]
    pub fn new(rows: Vec<(i64, Vec<Value>)>) -> Self {
        Self { rows, pos: None }
    }

    fn current(&self) -> Option<&(i64, Vec<Value>)> {
        self.pos.and_then(|p| self.rows.get(p))
    }
}

impl RowIterator for VecRows {
    fn next(&mut self) -> bool {
        let next = self.pos.map_or(0, |p| p + 1);
        self.pos = Some(next);
        next < self.rows.len()
    }

    fn value(&self, column: usize) -> Value {
        self.current()
            .and_then(|(_, cells)| cells.get(column))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn rowid(&self) -> i64 {
        self.current().map_or(0, |(rowid, _)| *rowid)
    }
}
