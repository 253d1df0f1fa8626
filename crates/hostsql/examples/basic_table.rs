//! Minimal read-only table over a host vector.

use hostsql::{Database, table};

fn main() -> hostsql::Result<()> {
    static PRICES: [(i64, &str, f64); 5] = [
        (1, "Apple", 1.50),
        (2, "Banana", 0.75),
        (3, "Cherry", 3.00),
        (4, "Date", 2.25),
        (5, "Elderberry", 4.50),
    ];

    let def = table("fruit")
        .count(|| PRICES.len())
        .estimate_rows(|| PRICES.len() as i64)
        .column_i64("id", |i| PRICES.get(i).map_or(0, |r| r.0))
        .column_text("name", |i| {
            PRICES.get(i).map_or_else(String::new, |r| r.1.to_owned())
        })
        .column_real("price", |i| PRICES.get(i).map_or(0.0, |r| r.2))
        .build();

    let db = Database::open_in_memory()?;
    db.register_and_create_table(&def)?;

    println!("Everything over 2.00:");
    for row in &db.query("SELECT name, price FROM fruit WHERE price > 2.0")?.rows {
        println!("  {} at {}", row[0], row[1]);
    }

    if let Some(avg) = db.scalar("SELECT ROUND(AVG(price), 2) FROM fruit")? {
        println!("Average price: {avg}");
    }
    Ok(())
}
