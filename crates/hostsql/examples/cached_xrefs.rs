//! Cached table with a constraint-pushdown filter: full scans read the
//! shared cache, equality lookups go straight to a host-side index.

use std::collections::HashMap;

use hostsql::{Database, RowIterator, Value, VecRows, cached_table};

#[derive(Clone, Copy)]
struct Xref {
    from: u64,
    to: u64,
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

fn main() -> hostsql::Result<()> {
    // Host-side index by target address, the kind of structure a
    // disassembler keeps anyway.
    let mut by_target: HashMap<i64, Vec<usize>> = HashMap::new();
    for (pos, x) in XREFS.iter().enumerate() {
        by_target.entry(x.to as i64).or_default().push(pos);
    }

    let def = cached_table::<Xref>("xrefs")
        .estimate_rows(|| XREFS.len() as i64)
        .cache_builder(|rows| {
            println!("[cache] enumerating {} xrefs", XREFS.len());
            rows.extend_from_slice(&XREFS);
        })
        .column_i64("from_ea", |x| x.from as i64)
        .column_i64("to_ea", |x| x.to as i64)
        .column_i64("kind", |x| x.kind)
        .filter_eq(
            "to_ea",
            move |target| {
                println!("[filter] direct lookup for to_ea = {target:#x}");
                let rows = by_target
                    .get(&target)
                    .map(|positions| {
                        positions
                            .iter()
                            .map(|&p| {
                                let x = &XREFS[p];
                                (
                                    p as i64,
                                    vec![
                                        Value::Integer(x.from as i64),
                                        Value::Integer(x.to as i64),
                                        Value::Integer(x.kind),
                                    ],
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Some(Box::new(VecRows::new(rows)) as Box<dyn RowIterator>)
            },
            10.0,
            3.0,
        )
        .build();

    let db = Database::open_in_memory()?;
    db.register_and_create_cached_table(&def)?;

    println!("Filtered lookup (no cache build):");
    for row in &db
        .query("SELECT printf('%#x', from_ea) FROM xrefs WHERE to_ea = 0x2000")?
        .rows
    {
        println!("  {}", row[0]);
    }

    println!("Full scan (builds the cache):");
    for row in &db
        .query("SELECT printf('%#x -> %#x', from_ea, to_ea) FROM xrefs")?
        .rows
    {
        println!("  {}", row[0]);
    }

    Ok(())
}
