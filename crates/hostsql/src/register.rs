//! Module registration and schema emission.
//!
//! Registration clones the caller's definition and hands the clone to
//! the engine as module user data; the engine drops it when the module
//! is torn down, so the caller's copy can go away immediately. Every
//! identifier that ends up inside DDL is validated first, because the
//! statements are assembled by interpolation.

use std::sync::Arc;

use rusqlite::Connection;
use rusqlite::vtab::{read_only_module, update_module};
use tracing::debug;

use crate::def::{CachedTableDef, GeneratorTableDef, LiveTableDef};
use crate::error::{HostError, Result};
use crate::vtab::{CachedTable, LiveTable, StreamTable};

/// Whether `name` is safe to splice into DDL: one or more ASCII
/// alphanumerics or underscores, nothing else.
#[must_use]
pub fn valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn ensure_identifier(name: &str) -> Result<()> {
    if valid_identifier(name) {
        Ok(())
    } else {
        Err(HostError::InvalidIdentifier {
            name: name.to_owned(),
        })
    }
}

/// Register a live table definition under `module_name`.
///
/// The definition is cloned; the engine owns the clone for the module's
/// lifetime.
pub fn register_table(conn: &Connection, module_name: &str, def: &LiveTableDef) -> Result<()> {
    ensure_identifier(module_name)?;
    conn.create_module(
        module_name,
        update_module::<LiveTable>(),
        Some(Arc::new(def.clone())),
    )?;
    debug!(module = module_name, table = def.name(), "registered live table module");
    Ok(())
}

/// Register a cached table definition under `module_name`.
pub fn register_cached_table<R: Send + Sync + 'static>(
    conn: &Connection,
    module_name: &str,
    def: &CachedTableDef<R>,
) -> Result<()> {
    ensure_identifier(module_name)?;
    conn.create_module(
        module_name,
        read_only_module::<CachedTable<R>>(),
        Some(Arc::new(def.clone())),
    )?;
    debug!(module = module_name, table = def.name(), "registered cached table module");
    Ok(())
}

/// Register a generator table definition under `module_name`.
pub fn register_generator_table<R: Send + Sync + 'static>(
    conn: &Connection,
    module_name: &str,
    def: &GeneratorTableDef<R>,
) -> Result<()> {
    ensure_identifier(module_name)?;
    conn.create_module(
        module_name,
        read_only_module::<StreamTable<R>>(),
        Some(Arc::new(def.clone())),
    )?;
    debug!(module = module_name, table = def.name(), "registered generator table module");
    Ok(())
}

/// Emit `CREATE VIRTUAL TABLE <table> USING <module>;`.
///
/// Both identifiers are validated before any SQL is formed; on failure
/// nothing reaches the engine.
pub fn create_virtual_table(conn: &Connection, table_name: &str, module_name: &str) -> Result<()> {
    ensure_identifier(table_name)?;
    ensure_identifier(module_name)?;
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE {table_name} USING {module_name};"
    ))?;
    Ok(())
}
