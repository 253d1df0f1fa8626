//! Blocking TCP server: one thread per connection, one shared database.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use hostsql::{Database, Result};
use tracing::{debug, info, warn};

use crate::protocol::{Request, Response, decode, encode, read_frame, write_frame};

/// A running query server bound to a local address.
pub struct Server {
    listener: TcpListener,
    db: Arc<Mutex<Database>>,
    shutdown: Arc<AtomicBool>,
}

/// Handle for stopping a server from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting connections. In-flight requests
    /// finish; the accept loop exits on its next wakeup.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Poke the blocking accept so the flag is observed promptly.
        let _ = TcpStream::connect(self.addr);
    }
}

impl Server {
    /// Bind to `addr`. Port 0 picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub fn bind(addr: impl ToSocketAddrs, db: Database) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!(addr = %listener.local_addr()?, "query server listening");
        Ok(Self {
            listener,
            db: Arc::new(Mutex::new(db)),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The address the server actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle that can stop this server from another thread.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            addr: self.listener.local_addr()?,
            shutdown: Arc::clone(&self.shutdown),
        })
    }

    /// Accept and serve connections until the shutdown handle fires.
    pub fn serve(self) -> Result<()> {
        for incoming in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match incoming {
                Ok(stream) => {
                    let db = Arc::clone(&self.db);
                    thread::spawn(move || serve_connection(stream, &db));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
        info!("query server stopped");
        Ok(())
    }
}

fn serve_connection(mut stream: TcpStream, db: &Mutex<Database>) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_owned(), |a| a.to_string());
    debug!(peer, "client connected");

    loop {
        let frame = match read_frame(&mut stream) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!(peer, error = %e, "dropping client");
                break;
            }
        };

        let response = match decode::<Request>(&frame) {
            Ok(req) => run_query(db, &req.sql),
            Err(e) => Response::fail(e.to_string()),
        };

        let sent = encode(&response).and_then(|payload| write_frame(&mut stream, &payload));
        if let Err(e) = sent {
            warn!(peer, error = %e, "write failed");
            break;
        }
    }
    debug!(peer, "client disconnected");
}

fn run_query(db: &Mutex<Database>, sql: &str) -> Response {
    debug!(sql, "executing remote query");
    let db = match db.lock() {
        Ok(db) => db,
        Err(poisoned) => poisoned.into_inner(),
    };
    match db.query(sql) {
        Ok(out) => Response::ok(out),
        Err(e) => Response::fail(e.to_string()),
    }
}
