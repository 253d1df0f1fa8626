//! Engine-facing module adapters.
//!
//! One adapter per table flavor, each translating the engine's generic
//! virtual-table callback protocol (connect, best-index, open, filter,
//! next, eof, column, rowid, update) into calls against a definition.
//! The adapters are the only place in the crate that touches the
//! engine's raw vtab ABI.

use rusqlite::types::Value;
use rusqlite::vtab::{Filters, IndexConstraintOp, IndexInfo};
use tracing::trace;

use crate::plan::{ConstraintView, ScanChoice};

mod cached;
mod live;
mod stream;

pub(crate) use cached::CachedTable;
pub(crate) use live::LiveTable;
pub(crate) use stream::StreamTable;

/// Reduce the engine's constraint list to what the planner consumes.
fn constraint_views(info: &IndexInfo) -> Vec<ConstraintView> {
    info.constraints()
        .map(|c| ConstraintView {
            column: c.column(),
            is_eq: c.operator() == IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ,
            usable: c.is_usable(),
        })
        .collect()
}

/// Write a scan choice back into the engine's index-info structure.
///
/// The consumed constraint is marked `omit`: equality filters and index
/// lookups are exact, so the engine need not re-check the predicate.
fn apply_choice(table: &str, info: &mut IndexInfo, choice: &ScanChoice) {
    info.set_idx_num(choice.idx_num());
    info.set_estimated_cost(choice.cost());
    info.set_estimated_rows(choice.estimated_rows() as i64);
    if let Some(pos) = choice.consumed_constraint() {
        let mut usage = info.constraint_usage(pos);
        usage.set_argv_index(1);
        usage.set_omit(true);
    }
    trace!(
        table,
        idx_num = choice.idx_num(),
        cost = choice.cost(),
        "scan strategy chosen"
    );
}

/// The constraint key passed down for an optimized scan.
fn first_arg(args: &Filters<'_>) -> rusqlite::Result<Value> {
    if args.len() == 0 {
        Ok(Value::Null)
    } else {
        args.get::<Value>(0)
    }
}
