//! Registry of specialized equality-constraint iterators.

use std::sync::Arc;

use rusqlite::types::Value;

use crate::row_iter::RowIterator;
use crate::value::{coerce_i64, coerce_text};

/// Highest id assignable to a filter; ids above this band identify hash
/// indexes.
pub const FILTER_ID_MAX: i32 = 999;

type IntFactory = Arc<dyn Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync>;
type TextFactory = Arc<dyn Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync>;

#[derive(Clone)]
enum FilterFactory {
    Int(IntFactory),
    Text(TextFactory),
}

/// A registered equality filter: when the planner consumes `column = ?`,
/// the factory supplies the iterator that produces exactly the matching
/// rows.
#[derive(Clone)]
pub struct FilterEntry {
    column: usize,
    id: i32,
    cost: f64,
    rows: f64,
    factory: FilterFactory,
}

impl FilterEntry {
    pub(crate) fn int(
        column: usize,
        id: i32,
        cost: f64,
        rows: f64,
        factory: impl Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            column,
            id,
            cost,
            rows,
            factory: FilterFactory::Int(Arc::new(factory)),
        }
    }

    pub(crate) fn text(
        column: usize,
        id: i32,
        cost: f64,
        rows: f64,
        factory: impl Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            column,
            id,
            cost,
            rows,
            factory: FilterFactory::Text(Arc::new(factory)),
        }
    }

    /// Column this filter serves, as an index into the definition's
    /// column list.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Non-zero plan id reported to the engine for this filter.
    #[must_use]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    #[must_use]
    pub fn estimated_rows(&self) -> f64 {
        self.rows
    }

    /// Instantiate the iterator for one constraint key. `None` means the
    /// key matches nothing; the cursor goes straight to end-of-scan.
    pub(crate) fn open(&self, key: &Value) -> Option<Box<dyn RowIterator>> {
        match &self.factory {
            FilterFactory::Int(f) => f(coerce_i64(key)),
            FilterFactory::Text(f) => f(&coerce_text(key)),
        }
    }
}

/// Look up a filter by its plan id.
pub(crate) fn find_by_id(filters: &[FilterEntry], id: i32) -> Option<&FilterEntry> {
    filters.iter().find(|f| f.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_iter::VecRows;

    #[test]
    fn int_filter_coerces_key() {
        let entry = FilterEntry::int(0, 1, 10.0, 3.0, |key| {
            Some(Box::new(VecRows::new(vec![(0, vec![Value::Integer(key)])])) as Box<dyn RowIterator>)
        });
        let mut it = entry.open(&Value::Text("42".into())).unwrap();
        assert!(it.next());
        assert_eq!(it.value(0), Value::Integer(42));
    }

    #[test]
    fn text_filter_sees_rendered_key() {
        let entry = FilterEntry::text(1, 2, 5.0, 1.0, |key| {
            assert_eq!(key, "7");
            None
        });
        assert!(entry.open(&Value::Integer(7)).is_none());
    }

    #[test]
    fn find_by_id_matches_exact() {
        let filters = vec![
            FilterEntry::int(0, 1, 1.0, 1.0, |_| None),
            FilterEntry::int(1, 2, 1.0, 1.0, |_| None),
        ];
        assert_eq!(find_by_id(&filters, 2).map(FilterEntry::id), Some(2));
        assert!(find_by_id(&filters, 3).is_none());
    }
}
