//! Writable table: setters, a row deleter, and the before-modify hook.

use std::sync::{Arc, Mutex};

use hostsql::{Database, table};

#[derive(Clone)]
struct Task {
    id: i64,
    title: String,
    done: bool,
}

fn main() -> hostsql::Result<()> {
    let tasks = Arc::new(Mutex::new(vec![
        Task { id: 1, title: "Write documentation".into(), done: false },
        Task { id: 2, title: "Fix bug #123".into(), done: false },
        Task { id: 3, title: "Review PR".into(), done: true },
        Task { id: 4, title: "Deploy to staging".into(), done: false },
    ]));

    let count_src = Arc::clone(&tasks);
    let id_src = Arc::clone(&tasks);
    let title_src = Arc::clone(&tasks);
    let title_sink = Arc::clone(&tasks);
    let done_src = Arc::clone(&tasks);
    let done_sink = Arc::clone(&tasks);
    let delete_sink = Arc::clone(&tasks);

    let def = table("tasks")
        .count(move || count_src.lock().unwrap().len())
        .on_modify(|op| println!("[hook] {op}"))
        .column_i64("id", move |i| id_src.lock().unwrap().get(i).map_or(0, |t| t.id))
        .column_text_rw(
            "title",
            move |i| {
                title_src
                    .lock()
                    .unwrap()
                    .get(i)
                    .map_or_else(String::new, |t| t.title.clone())
            },
            move |i, v| {
                title_sink.lock().unwrap().get_mut(i).map(|t| t.title = v).is_some()
            },
        )
        .column_i32_rw(
            "done",
            move |i| i32::from(done_src.lock().unwrap().get(i).is_some_and(|t| t.done)),
            move |i, v| {
                done_sink
                    .lock()
                    .unwrap()
                    .get_mut(i)
                    .map(|t| t.done = v != 0)
                    .is_some()
            },
        )
        .deletable(move |i| {
            let mut tasks = delete_sink.lock().unwrap();
            if i < tasks.len() {
                tasks.remove(i);
                true
            } else {
                false
            }
        })
        .build();

    let db = Database::open_in_memory()?;
    db.register_and_create_table(&def)?;

    let show = |label: &str| -> hostsql::Result<()> {
        println!("{label}:");
        for row in &db.query("SELECT id, title, done FROM tasks")?.rows {
            let mark = if row[2] == "1" { "x" } else { " " };
            println!("  [{mark}] {} {}", row[0], row[1]);
        }
        Ok(())
    };

    show("Initial tasks")?;

    db.execute("UPDATE tasks SET done = 1 WHERE id = 2")?;
    show("After marking task 2 done")?;

    db.execute("DELETE FROM tasks WHERE done = 1")?;
    show("After deleting completed tasks")?;

    Ok(())
}
