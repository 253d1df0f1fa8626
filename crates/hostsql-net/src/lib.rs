//! Length-prefixed JSON query protocol over TCP.
//!
//! A client sends `{"sql": "..."}` and receives either
//! `{"success": true, "columns": [...], "rows": [[...]], "row_count": N}`
//! or `{"success": false, "error": "..."}`. Every frame is a 4-byte
//! big-endian payload length followed by UTF-8 JSON.
//!
//! The server executes statements against one shared [`hostsql::Database`],
//! so virtual tables registered before serving are queryable remotely.
//! There is no authentication or transport security; bind to loopback or
//! front it with something that provides both.

mod client;
mod protocol;
mod server;

pub use client::Client;
pub use protocol::{MAX_FRAME_LEN, Request, Response, read_frame, write_frame};
pub use server::{Server, ShutdownHandle};
