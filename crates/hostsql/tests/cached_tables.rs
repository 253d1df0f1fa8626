//! Integration tests for the cached flavor: shared cache lifecycle,
//! constraint pushdown, hash indexes, and plan equivalence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hostsql::{Database, RowIterator, Value, VecRows, cached_table};

#[derive(Clone, Copy)]
struct Xref {
    from: i64,
    to: i64,
    kind: i64,
}

static XREFS: [Xref; 7] = [
    Xref { from: 0x1000, to: 0x2000, kind: 1 },
    Xref { from: 0x1004, to: 0x2000, kind: 1 },
    Xref { from: 0x1008, to: 0x3000, kind: 2 },
    Xref { from: 0x100C, to: 0x2000, kind: 1 },
    Xref { from: 0x2000, to: 0x3000, kind: 1 },
    Xref { from: 0x2004, to: 0x4000, kind: 2 },
    Xref { from: 0x3000, to: 0x4000, kind: 1 },
];

/// Host-side lookup structure standing in for an external index.
fn xrefs_by_target() -> HashMap<i64, Vec<usize>> {
    let mut map: HashMap<i64, Vec<usize>> = HashMap::new();
    for (pos, x) in XREFS.iter().enumerate() {
        map.entry(x.to).or_default().push(pos);
    }
    map
}

fn xref_row(pos: usize) -> (i64, Vec<Value>) {
    let x = &XREFS[pos];
    (
        pos as i64,
        vec![
            Value::Integer(x.from),
            Value::Integer(x.to),
            Value::Integer(x.kind),
        ],
    )
}

struct XrefFixture {
    db: Database,
    cache_builds: Arc<AtomicUsize>,
    filter_opens: Arc<AtomicUsize>,
}

fn xref_db(with_filter: bool, with_index: bool, filter_cost: f64) -> XrefFixture {
    let cache_builds = Arc::new(AtomicUsize::new(0));
    let filter_opens = Arc::new(AtomicUsize::new(0));

    let builds = Arc::clone(&cache_builds);
    let mut builder = cached_table::<Xref>("xrefs")
        .estimate_rows(|| XREFS.len() as i64)
        .cache_builder(move |rows| {
            builds.fetch_add(1, Ordering::SeqCst);
            rows.extend_from_slice(&XREFS);
        })
        .column_i64("from_ea", |x| x.from)
        .column_i64("to_ea", |x| x.to)
        .column_i64("kind", |x| x.kind);

    if with_filter {
        let opens = Arc::clone(&filter_opens);
        let by_target = xrefs_by_target();
        builder = builder.filter_eq(
            "to_ea",
            move |target| {
                opens.fetch_add(1, Ordering::SeqCst);
                let rows = by_target
                    .get(&target)
                    .map(|positions| positions.iter().map(|&p| xref_row(p)).collect())
                    .unwrap_or_default();
                Some(Box::new(VecRows::new(rows)) as Box<dyn RowIterator>)
            },
            filter_cost,
            3.0,
        );
    }
    if with_index {
        builder = builder.index_on("to_ea", |x| x.to);
    }

    let db = Database::open_in_memory().unwrap();
    db.register_and_create_cached_table(&builder.build()).unwrap();
    XrefFixture {
        db,
        cache_builds,
        filter_opens,
    }
}

fn sorted(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    rows.sort();
    rows
}

// ===========================================================================
// 1. FILTER PUSHDOWN
// ===========================================================================

#[test]
fn filtered_query_skips_the_cache_entirely() {
    let fx = xref_db(true, false, 10.0);
    let out = fx
        .db
        .query("SELECT from_ea FROM xrefs WHERE to_ea = 8192")
        .unwrap();

    assert_eq!(
        sorted(out.rows),
        vec![vec!["4096"], vec!["4100"], vec!["4108"]]
    );
    assert_eq!(fx.filter_opens.load(Ordering::SeqCst), 1);
    // Neither planning nor execution enumerated the host data.
    assert_eq!(fx.cache_builds.load(Ordering::SeqCst), 0);
}

#[test]
fn full_scan_builds_the_cache_once() {
    let fx = xref_db(true, false, 10.0);
    let all = fx.db.query("SELECT from_ea, to_ea, kind FROM xrefs").unwrap();
    assert_eq!(all.len(), 7);
    assert_eq!(fx.cache_builds.load(Ordering::SeqCst), 1);

    let again = fx.db.query("SELECT COUNT(*) FROM xrefs").unwrap();
    assert_eq!(again.rows, vec![vec!["7"]]);
    assert_eq!(fx.cache_builds.load(Ordering::SeqCst), 1);
}

#[test]
fn filter_and_full_scan_agree() {
    let plain = xref_db(false, false, 10.0);
    let filtered = xref_db(true, false, 10.0);

    let sql = "SELECT from_ea, kind FROM xrefs WHERE to_ea = 8192";
    assert_eq!(
        sorted(plain.db.query(sql).unwrap().rows),
        sorted(filtered.db.query(sql).unwrap().rows)
    );
}

// ===========================================================================
// 2. HASH INDEXES
// ===========================================================================

#[test]
fn index_lookup_matches_full_scan() {
    let plain = xref_db(false, false, 10.0);
    let indexed = xref_db(false, true, 10.0);

    for target in [0x2000, 0x3000, 0x4000, 0x9999] {
        let sql = format!("SELECT from_ea FROM xrefs WHERE to_ea = {target}");
        assert_eq!(
            sorted(plain.db.query(&sql).unwrap().rows),
            sorted(indexed.db.query(&sql).unwrap().rows),
            "target {target:#x}"
        );
    }
}

#[test]
fn index_outranks_a_registered_filter() {
    let fx = xref_db(true, true, 10.0);
    let out = fx
        .db
        .query("SELECT from_ea FROM xrefs WHERE to_ea = 8192")
        .unwrap();
    assert_eq!(
        sorted(out.rows),
        vec![vec!["4096"], vec!["4100"], vec!["4108"]]
    );

    // The index path went through the cache, not the filter iterator.
    assert_eq!(fx.filter_opens.load(Ordering::SeqCst), 0);
    assert_eq!(fx.cache_builds.load(Ordering::SeqCst), 1);
}

#[test]
fn index_miss_is_an_empty_result() {
    let fx = xref_db(false, true, 10.0);
    let out = fx
        .db
        .query("SELECT from_ea FROM xrefs WHERE to_ea = 1")
        .unwrap();
    assert!(out.is_empty());
}

// ===========================================================================
// 3. CACHE LIFECYCLE
// ===========================================================================

#[test]
fn invalidation_rebuilds_from_fresh_host_data() {
    let source = Arc::new(Mutex::new(vec![1i64, 2, 3]));
    let feed = Arc::clone(&source);

    let def = cached_table::<i64>("nums")
        .estimate_rows(|| 3)
        .cache_builder(move |rows| rows.extend(feed.lock().unwrap().iter().copied()))
        .column_i64("n", |n| *n)
        .build();

    let db = Database::open_in_memory().unwrap();
    db.register_and_create_cached_table(&def).unwrap();

    assert_eq!(db.scalar("SELECT SUM(n) FROM nums").unwrap().as_deref(), Some("6"));
    assert!(def.is_cache_built());

    // Host data changes are invisible until the cache is dropped.
    source.lock().unwrap().push(10);
    assert_eq!(db.scalar("SELECT SUM(n) FROM nums").unwrap().as_deref(), Some("6"));

    def.invalidate_cache();
    assert!(!def.is_cache_built());
    assert_eq!(db.scalar("SELECT SUM(n) FROM nums").unwrap().as_deref(), Some("16"));
}

#[test]
fn two_connections_share_one_cache() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);

    let def = cached_table::<i64>("shared")
        .cache_builder(move |rows| {
            counter.fetch_add(1, Ordering::SeqCst);
            rows.extend(0..5);
        })
        .column_i64("n", |n| *n)
        .build();

    let a = Database::open_in_memory().unwrap();
    let b = Database::open_in_memory().unwrap();
    a.register_and_create_cached_table(&def).unwrap();
    b.register_and_create_cached_table(&def).unwrap();

    assert_eq!(a.scalar("SELECT COUNT(*) FROM shared").unwrap().as_deref(), Some("5"));
    assert_eq!(b.scalar("SELECT COUNT(*) FROM shared").unwrap().as_deref(), Some("5"));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn cached_tables_reject_writes() {
    let fx = xref_db(false, false, 10.0);
    let err = fx.db.execute("DELETE FROM xrefs WHERE kind = 1").unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("modif") || msg.contains("read"),
        "unexpected error: {msg}"
    );
}

// ===========================================================================
// 4. SQL SURFACE OVER THE CACHE
// ===========================================================================

#[test]
fn group_by_and_having_over_cached_rows() {
    let fx = xref_db(false, false, 10.0);
    let out = fx
        .db
        .query(
            "SELECT to_ea, COUNT(*) AS n FROM xrefs GROUP BY to_ea HAVING n > 1 ORDER BY to_ea",
        )
        .unwrap();
    assert_eq!(
        out.rows,
        vec![
            vec!["8192".to_owned(), "3".to_owned()],
            vec!["12288".to_owned(), "2".to_owned()],
            vec!["16384".to_owned(), "2".to_owned()],
        ]
    );
}

#[test]
fn self_join_resolves_two_hop_references() {
    let fx = xref_db(false, true, 10.0);
    let out = fx
        .db
        .query(
            "SELECT a.from_ea, b.to_ea
             FROM xrefs a JOIN xrefs b ON b.from_ea = a.to_ea
             WHERE a.from_ea = 4096",
        )
        .unwrap();
    assert_eq!(out.rows, vec![vec!["4096".to_owned(), "12288".to_owned()]]);
}
