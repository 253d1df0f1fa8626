//! Shared row cache for the cached table flavor.
//!
//! The cache is built at most once per definition lifetime by whichever
//! cursor first needs it; concurrent builders coalesce on the slot lock.
//! A build publishes an immutable [`CacheSnapshot`] behind an `Arc`, so
//! readers hold no lock after acquisition. Invalidation empties the slot
//! rather than mutating the snapshot: cursors still holding the old
//! snapshot keep reading it until they close, and the next cursor
//! rebuilds from scratch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Hash index over one column: key to positions of matching rows.
type KeyIndex = HashMap<i64, Vec<usize>>;

/// A hash-index declaration: which column it serves and how to extract
/// the key from a row.
pub struct IndexEntry<R> {
    column: usize,
    key: Arc<dyn Fn(&R) -> i64 + Send + Sync>,
}

impl<R> Clone for IndexEntry<R> {
    fn clone(&self) -> Self {
        Self {
            column: self.column,
            key: Arc::clone(&self.key),
        }
    }
}

impl<R> IndexEntry<R> {
    pub(crate) fn new(column: usize, key: impl Fn(&R) -> i64 + Send + Sync + 'static) -> Self {
        Self {
            column,
            key: Arc::new(key),
        }
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }
}

/// Immutable rows plus their hash indexes, aligned with the definition's
/// index registry.
pub struct CacheSnapshot<R> {
    rows: Vec<R>,
    indexes: Vec<KeyIndex>,
}

impl<R> CacheSnapshot<R> {
    #[must_use]
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Row positions matching `key` in index `slot`, empty when the key
    /// is absent or the slot does not exist.
    pub(crate) fn lookup(&self, slot: usize, key: i64) -> &[usize] {
        self.indexes
            .get(slot)
            .and_then(|idx| idx.get(&key))
            .map_or(&[], Vec::as_slice)
    }
}

/// Lazily built cache shared by every cursor of one definition.
pub struct SharedCache<R> {
    slot: Mutex<Option<Arc<CacheSnapshot<R>>>>,
}

impl<R> Default for SharedCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> SharedCache<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Current snapshot, building it first if the slot is empty.
    ///
    /// `populate` fills the row vector in bulk; every registered index is
    /// then derived in one pass over the rows. The check and the build
    /// both run under the slot lock, so exactly one caller builds.
    pub(crate) fn snapshot(
        &self,
        populate: &(dyn Fn(&mut Vec<R>) + Send + Sync),
        indexes: &[IndexEntry<R>],
    ) -> Arc<CacheSnapshot<R>> {
        let mut slot = self.slot.lock();
        if let Some(snap) = slot.as_ref() {
            return Arc::clone(snap);
        }

        let mut rows = Vec::new();
        populate(&mut rows);

        let mut built: Vec<KeyIndex> = indexes.iter().map(|_| KeyIndex::new()).collect();
        for (pos, row) in rows.iter().enumerate() {
            for (slot_no, entry) in indexes.iter().enumerate() {
                built[slot_no]
                    .entry((entry.key)(row))
                    .or_default()
                    .push(pos);
            }
        }

        debug!(rows = rows.len(), indexes = built.len(), "cache built");
        let snap = Arc::new(CacheSnapshot {
            rows,
            indexes: built,
        });
        *slot = Some(Arc::clone(&snap));
        snap
    }

    /// Drop the current snapshot. The next cursor rebuilds; cursors
    /// already holding the snapshot keep it until they close.
    pub fn invalidate(&self) {
        let dropped = self.slot.lock().take().is_some();
        if dropped {
            debug!("cache invalidated");
        }
    }

    /// Whether a snapshot is currently published.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.slot.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn builds_once_and_reuses_snapshot() {
        let builds = AtomicUsize::new(0);
        let cache: SharedCache<i64> = SharedCache::new();
        let populate = |rows: &mut Vec<i64>| {
            builds.fetch_add(1, Ordering::SeqCst);
            rows.extend([10, 20, 30]);
        };

        let a = cache.snapshot(&populate, &[]);
        let b = cache.snapshot(&populate, &[]);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(a.rows(), &[10, 20, 30]);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn indexes_group_row_positions_by_key() {
        let cache: SharedCache<(i64, i64)> = SharedCache::new();
        let idx = IndexEntry::new(1, |r: &(i64, i64)| r.1);
        let snap = cache.snapshot(
            &|rows| rows.extend([(1, 100), (2, 200), (3, 100)]),
            std::slice::from_ref(&idx),
        );
        assert_eq!(snap.lookup(0, 100), &[0, 2]);
        assert_eq!(snap.lookup(0, 200), &[1]);
        assert_eq!(snap.lookup(0, 999), &[] as &[usize]);
        assert_eq!(snap.lookup(7, 100), &[] as &[usize]);
    }

    #[test]
    fn invalidate_forces_rebuild_but_keeps_old_snapshot_alive() {
        let builds = AtomicUsize::new(0);
        let cache: SharedCache<i64> = SharedCache::new();
        let populate = |rows: &mut Vec<i64>| {
            let n = builds.fetch_add(1, Ordering::SeqCst);
            rows.push(n as i64);
        };

        let old = cache.snapshot(&populate, &[]);
        assert!(cache.is_built());
        cache.invalidate();
        assert!(!cache.is_built());

        let new = cache.snapshot(&populate, &[]);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(old.rows(), &[0]);
        assert_eq!(new.rows(), &[1]);
    }

    #[test]
    fn concurrent_snapshots_coalesce_on_one_build() {
        let builds = Arc::new(AtomicUsize::new(0));
        let cache: Arc<SharedCache<i64>> = Arc::new(SharedCache::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let builds = Arc::clone(&builds);
                std::thread::spawn(move || {
                    let snap = cache.snapshot(
                        &move |rows: &mut Vec<i64>| {
                            builds.fetch_add(1, Ordering::SeqCst);
                            rows.extend(0..100);
                        },
                        &[],
                    );
                    snap.rows().len()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 100);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}
