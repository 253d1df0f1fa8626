//! Scalar SQL function registration.
//!
//! A thin shim over the engine's function API: the callback receives its
//! arguments as owned values and returns one value or an error.

use std::panic::AssertUnwindSafe;

use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;

use crate::error::{HostError, Result};

/// Register a deterministic scalar function with a fixed arity.
///
/// Pass `-1` for `arity` to accept any number of arguments.
pub fn register_scalar_function(
    conn: &Connection,
    name: &str,
    arity: i32,
    f: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
) -> Result<()> {
    let f = AssertUnwindSafe(f);
    conn.create_scalar_function(
        name,
        arity,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            let mut args = Vec::with_capacity(ctx.len());
            for i in 0..ctx.len() {
                args.push(ctx.get::<Value>(i)?);
            }
            (f.0)(&args).map_err(HostError::into_sqlite)
        },
    )?;
    Ok(())
}
