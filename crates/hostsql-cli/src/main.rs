//! Command-line front end.
//!
//! Modes:
//!   hostsql [--db PATH] -e SQL            run a statement locally
//!   hostsql [--db PATH] script.sql        run a SQL script file
//!   hostsql [--db PATH] --serve ADDR      expose the database over TCP
//!   hostsql --connect ADDR -e SQL         query a running server
//!
//! With no SQL source, statements are read from stdin. `--demo`
//! registers a small set of sample virtual tables before anything runs.

use std::io::Read;
use std::process::ExitCode;

use hostsql::{Database, QueryOutput, table};
use hostsql_net::{Client, Server};

#[derive(Debug, Default, PartialEq)]
struct Args {
    db_path: Option<String>,
    serve: Option<String>,
    connect: Option<String>,
    sql: Option<String>,
    script: Option<String>,
    demo: bool,
    help: bool,
}

fn parse_args(argv: &[String]) -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = argv.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--db" => args.db_path = Some(take_value(&mut it, "--db")?),
            "--serve" => args.serve = Some(take_value(&mut it, "--serve")?),
            "--connect" => args.connect = Some(take_value(&mut it, "--connect")?),
            "-e" | "--execute" => args.sql = Some(take_value(&mut it, "-e")?),
            "--demo" => args.demo = true,
            "-h" | "--help" => args.help = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            script => {
                if args.script.is_some() {
                    return Err("more than one script file given".to_owned());
                }
                args.script = Some(script.to_owned());
            }
        }
    }
    if args.serve.is_some() && args.connect.is_some() {
        return Err("--serve and --connect are mutually exclusive".to_owned());
    }
    Ok(args)
}

fn take_value(it: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<String, String> {
    it.next()
        .map(ToOwned::to_owned)
        .ok_or_else(|| format!("{flag} requires a value"))
}

const USAGE: &str = "usage: hostsql [--db PATH] [--demo] [-e SQL | script.sql | --serve ADDR]
       hostsql --connect ADDR [-e SQL]

options:
  --db PATH       open a database file instead of memory
  --demo          register sample virtual tables
  -e, --execute   run one SQL statement and print the result
  --serve ADDR    serve the database over TCP (e.g. 127.0.0.1:7878)
  --connect ADDR  send queries to a running server
  -h, --help      show this help";

/// Render rows as fixed-width columns, header first.
fn format_table(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c:<width$}", width = widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    let mut out = render(columns);
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in rows {
        out.push('\n');
        out.push_str(&render(row));
    }
    out
}

fn print_output(out: &QueryOutput) {
    if out.columns.is_empty() {
        return;
    }
    println!("{}", format_table(&out.columns, &out.rows));
    println!("({} rows)", out.rows.len());
}

/// Sample tables so the binary is explorable without host code.
fn register_demo_tables(db: &Database) -> hostsql::Result<()> {
    static SQUARES: [i64; 10] = [0, 1, 4, 9, 16, 25, 36, 49, 64, 81];
    let squares = table("squares")
        .count(|| SQUARES.len())
        .column_i64("n", |i| i as i64)
        .column_i64("square", |i| SQUARES.get(i).copied().unwrap_or(0))
        .build();
    db.register_and_create_table(&squares)?;

    static GREEK: [&str; 5] = ["alpha", "beta", "gamma", "delta", "epsilon"];
    let letters = table("greek")
        .count(|| GREEK.len())
        .column_i64("pos", |i| i as i64 + 1)
        .column_text("letter", |i| {
            GREEK.get(i).copied().unwrap_or_default().to_owned()
        })
        .build();
    db.register_and_create_table(&letters)?;
    Ok(())
}

fn read_sql_source(args: &Args) -> Result<String, String> {
    if let Some(sql) = &args.sql {
        return Ok(sql.clone());
    }
    if let Some(path) = &args.script {
        return std::fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| format!("cannot read stdin: {e}"))?;
    Ok(buf)
}

/// Split a script on semicolons, honoring single-quoted strings.
fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            ';' if !in_string => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_owned());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        statements.push(current.trim().to_owned());
    }
    statements
}

fn run_local(args: &Args) -> Result<(), String> {
    let db = match &args.db_path {
        Some(path) => Database::open(path),
        None => Database::open_in_memory(),
    }
    .map_err(|e| e.to_string())?;

    if args.demo {
        register_demo_tables(&db).map_err(|e| e.to_string())?;
    }

    if let Some(addr) = &args.serve {
        let server = Server::bind(addr.as_str(), db).map_err(|e| e.to_string())?;
        eprintln!("serving on {}", server.local_addr().map_err(|e| e.to_string())?);
        return server.serve().map_err(|e| e.to_string());
    }

    let source = read_sql_source(args)?;
    for statement in split_statements(&source) {
        let out = db.query(&statement).map_err(|e| e.to_string())?;
        print_output(&out);
    }
    Ok(())
}

fn run_remote(addr: &str, args: &Args) -> Result<(), String> {
    let mut client = Client::connect(addr).map_err(|e| e.to_string())?;
    let source = read_sql_source(args)?;
    for statement in split_statements(&source) {
        let resp = client.query(&statement).map_err(|e| e.to_string())?;
        if resp.success {
            print_output(&QueryOutput {
                columns: resp.columns,
                rows: resp.rows,
            });
        } else {
            return Err(resp.error.unwrap_or_else(|| "query failed".to_owned()));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let outcome = match &args.connect {
        Some(addr) => run_remote(addr, &args),
        None => run_local(&args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn parses_local_execute() {
        let args = parse_args(&argv(&["--db", "x.db", "-e", "SELECT 1"])).unwrap();
        assert_eq!(args.db_path.as_deref(), Some("x.db"));
        assert_eq!(args.sql.as_deref(), Some("SELECT 1"));
        assert!(args.serve.is_none());
    }

    #[test]
    fn parses_serve_and_demo() {
        let args = parse_args(&argv(&["--demo", "--serve", "127.0.0.1:0"])).unwrap();
        assert!(args.demo);
        assert_eq!(args.serve.as_deref(), Some("127.0.0.1:0"));
    }

    #[test]
    fn rejects_serve_plus_connect() {
        assert!(parse_args(&argv(&["--serve", "a:1", "--connect", "b:2"])).is_err());
    }

    #[test]
    fn rejects_missing_flag_value() {
        assert!(parse_args(&argv(&["--db"])).is_err());
    }

    #[test]
    fn rejects_unknown_option() {
        assert!(parse_args(&argv(&["--frobnicate"])).is_err());
    }

    #[test]
    fn script_splitting_honors_strings() {
        let parts = split_statements("SELECT 'a;b'; SELECT 2;\n");
        assert_eq!(parts, vec!["SELECT 'a;b'", "SELECT 2"]);
    }

    #[test]
    fn table_formatting_pads_columns() {
        let out = format_table(
            &["id".to_owned(), "name".to_owned()],
            &[
                vec!["1".to_owned(), "Apple".to_owned()],
                vec!["20".to_owned(), "Fig".to_owned()],
            ],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "id  name");
        assert_eq!(lines[1], "--  -----");
        assert_eq!(lines[2], "1   Apple");
        assert_eq!(lines[3], "20  Fig");
    }

    #[test]
    fn demo_tables_are_queryable() {
        let db = Database::open_in_memory().unwrap();
        register_demo_tables(&db).unwrap();
        let out = db
            .query("SELECT letter FROM greek WHERE pos = 3")
            .unwrap();
        assert_eq!(out.rows, vec![vec!["gamma"]]);
        assert_eq!(
            db.scalar("SELECT MAX(square) FROM squares").unwrap().as_deref(),
            Some("81")
        );
    }
}
