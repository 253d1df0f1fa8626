//! Generator table: rows stream on demand, so LIMIT stops enumeration.

use hostsql::{Database, generator_table};

fn main() -> hostsql::Result<()> {
    let def = generator_table::<(i64, i64)>("fib")
        .estimate_rows(|| 90)
        .generator_iter(|| {
            (0..90).scan((0i64, 1i64), |state, n| {
                let current = state.0;
                *state = (state.1, state.0.saturating_add(state.1));
                Some((n, current))
            })
        })
        .column_i64("n", |r| r.0)
        .column_i64("value", |r| r.1)
        .build();

    let db = Database::open_in_memory()?;
    db.register_and_create_generator_table(&def)?;

    println!("First ten Fibonacci numbers:");
    for row in &db.query("SELECT n, value FROM fib LIMIT 10")?.rows {
        println!("  fib({}) = {}", row[0], row[1]);
    }

    if let Some(big) = db.scalar("SELECT value FROM fib WHERE n = 80")? {
        println!("fib(80) = {big}");
    }
    Ok(())
}
