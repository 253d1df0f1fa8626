//! End-to-end tests: a server exposing virtual tables, queried over TCP.

use std::thread;

use hostsql::{Database, table};
use hostsql_net::{Client, Server};

fn demo_db() -> Database {
    static NUMBERS: [i64; 4] = [2, 3, 5, 7];
    let def = table("primes")
        .count(|| NUMBERS.len())
        .column_i64("p", |i| NUMBERS.get(i).copied().unwrap_or(0))
        .build();
    let db = Database::open_in_memory().unwrap();
    db.register_and_create_table(&def).unwrap();
    db
}

struct RunningServer {
    addr: std::net::SocketAddr,
    handle: hostsql_net::ShutdownHandle,
    join: thread::JoinHandle<()>,
}

fn start_server() -> RunningServer {
    let server = Server::bind("127.0.0.1:0", demo_db()).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle().unwrap();
    let join = thread::spawn(move || server.serve().unwrap());
    RunningServer { addr, handle, join }
}

#[test]
fn query_virtual_table_over_the_wire() {
    let server = start_server();

    let mut client = Client::connect(server.addr).unwrap();
    let resp = client.query("SELECT p FROM primes ORDER BY p DESC").unwrap();
    assert!(resp.success);
    assert_eq!(resp.columns, vec!["p"]);
    assert_eq!(
        resp.rows,
        vec![vec!["7"], vec!["5"], vec!["3"], vec!["2"]]
    );
    assert_eq!(resp.row_count, 4);

    server.handle.stop();
    server.join.join().unwrap();
}

#[test]
fn sql_errors_come_back_as_failed_responses() {
    let server = start_server();

    let mut client = Client::connect(server.addr).unwrap();
    let resp = client.query("SELECT * FROM does_not_exist").unwrap();
    assert!(!resp.success);
    assert!(resp.error.unwrap().contains("does_not_exist"));

    // The connection stays usable after a failed statement.
    let resp = client.query("SELECT COUNT(*) FROM primes").unwrap();
    assert!(resp.success);
    assert_eq!(resp.rows, vec![vec!["4"]]);

    server.handle.stop();
    server.join.join().unwrap();
}

#[test]
fn many_sequential_requests_on_one_connection() {
    let server = start_server();

    let mut client = Client::connect(server.addr).unwrap();
    for i in 0..20 {
        let resp = client.query(&format!("SELECT {i} + 1")).unwrap();
        assert!(resp.success);
        assert_eq!(resp.rows, vec![vec![(i + 1).to_string()]]);
    }

    server.handle.stop();
    server.join.join().unwrap();
}

#[test]
fn concurrent_clients_share_the_database() {
    let server = start_server();
    let addr = server.addr;

    let workers: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(move || {
                let mut client = Client::connect(addr).unwrap();
                let resp = client.query("SELECT SUM(p) FROM primes").unwrap();
                assert!(resp.success);
                assert_eq!(resp.rows, vec![vec!["17"]]);
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    server.handle.stop();
    server.join.join().unwrap();
}
