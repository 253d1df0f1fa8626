//! Adapter for the live flavor: rows are produced by indexing into host
//! data at access time, and mutations dispatch to host callbacks.
#![allow(unsafe_code)]

use std::os::raw::c_int;
use std::sync::Arc;

use rusqlite::types::{Value, ValueRef};
use rusqlite::vtab::{
    Context, CreateVTab, Filters, IndexInfo, Inserts, UpdateVTab, Updates, VTab, VTabConnection,
    VTabCursor, VTabKind, sqlite3_vtab, sqlite3_vtab_cursor,
};

use super::{apply_choice, constraint_views, first_arg};
use crate::column::SetOutcome;
use crate::def::LiveTableDef;
use crate::error::HostError;
use crate::filter::find_by_id;
use crate::plan::choose_scan;
use crate::row_iter::RowIterator;

#[repr(C)]
pub struct LiveTable {
    base: sqlite3_vtab,
    def: Arc<LiveTableDef>,
}

unsafe impl<'vtab> VTab<'vtab> for LiveTable {
    type Aux = Arc<LiveTableDef>;
    type Cursor = LiveCursor;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let def = aux.ok_or_else(|| {
            rusqlite::Error::ModuleError("live table module registered without definition".into())
        })?;
        Ok((
            def.schema_sql(),
            Self {
                base: sqlite3_vtab::default(),
                def: Arc::clone(def),
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let views = constraint_views(info);
        let choice = choose_scan(&views, self.def.filters(), &[], self.def.planning_rows());
        apply_choice(self.def.name(), info, &choice);
        Ok(())
    }

    fn open(&'vtab mut self) -> rusqlite::Result<LiveCursor> {
        Ok(LiveCursor {
            base: sqlite3_vtab_cursor::default(),
            def: Arc::clone(&self.def),
            state: LiveState::Done,
        })
    }
}

impl<'vtab> CreateVTab<'vtab> for LiveTable {
    const KIND: VTabKind = VTabKind::Default;
}

impl<'vtab> UpdateVTab<'vtab> for LiveTable {
    fn delete(&mut self, arg: ValueRef<'_>) -> rusqlite::Result<()> {
        let def = &self.def;
        let Some(delete_row) = def.delete_row.as_ref() else {
            return Err(HostError::ReadOnly.into_sqlite());
        };
        let ValueRef::Integer(rowid) = arg else {
            return Err(HostError::RowidOutOfRange { rowid: 0 }.into_sqlite());
        };
        let row = usize::try_from(rowid)
            .map_err(|_| HostError::RowidOutOfRange { rowid }.into_sqlite())?;
        def.fire_before_modify(&format!("DELETE FROM {}", def.name()));
        if delete_row(row) {
            Ok(())
        } else {
            Err(HostError::WriteRejected { op: "DELETE" }.into_sqlite())
        }
    }

    fn insert(&mut self, args: &Inserts<'_>) -> rusqlite::Result<i64> {
        let def = &self.def;
        let Some(insert_row) = def.insert_row.as_ref() else {
            return Err(HostError::ReadOnly.into_sqlite());
        };
        def.fire_before_modify(&format!("INSERT INTO {}", def.name()));
        let mut values = Vec::with_capacity(args.len().saturating_sub(2));
        for i in 2..args.len() {
            values.push(args.get::<Value>(i)?);
        }
        insert_row(&values).ok_or_else(|| HostError::WriteRejected { op: "INSERT" }.into_sqlite())
    }

    fn update(&mut self, args: &Updates<'_>) -> rusqlite::Result<()> {
        let def = &self.def;
        let rowid = args.get::<i64>(0)?;
        let row = usize::try_from(rowid)
            .map_err(|_| HostError::RowidOutOfRange { rowid }.into_sqlite())?;
        def.fire_before_modify(&format!("UPDATE {}", def.name()));
        // New column values start at argv[2], aligned with the column list.
        for (pos, col) in def.columns().iter().enumerate() {
            let arg = pos + 2;
            if arg >= args.len() {
                break;
            }
            if !col.is_writable() {
                continue;
            }
            let value = args.get::<Value>(arg)?;
            if col.apply_set(row, &value) == SetOutcome::Rejected {
                return Err(HostError::WriteRejected { op: "UPDATE" }.into_sqlite());
            }
        }
        Ok(())
    }
}

enum LiveState {
    Done,
    Scan {
        pos: usize,
        total: usize,
    },
    Filter {
        iter: Box<dyn RowIterator>,
    },
}

#[repr(C)]
pub struct LiveCursor {
    base: sqlite3_vtab_cursor,
    def: Arc<LiveTableDef>,
    state: LiveState,
}

unsafe impl VTabCursor for LiveCursor {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        self.state = match idx_num {
            0 => {
                // The authoritative count is sampled exactly once per scan.
                let total = (self.def.row_count)();
                LiveState::Scan { pos: 0, total }
            }
            id => {
                let Some(entry) = find_by_id(self.def.filters(), id) else {
                    return Err(HostError::UnknownPlan { idx_num: id }.into_sqlite());
                };
                let key = first_arg(args)?;
                match entry.open(&key) {
                    Some(mut iter) => {
                        if iter.next() {
                            LiveState::Filter { iter }
                        } else {
                            LiveState::Done
                        }
                    }
                    None => LiveState::Done,
                }
            }
        };
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        let exhausted = match &mut self.state {
            LiveState::Done => false,
            LiveState::Scan { pos, .. } => {
                *pos += 1;
                false
            }
            LiveState::Filter { iter } => !iter.next(),
        };
        if exhausted {
            self.state = LiveState::Done;
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        match &self.state {
            LiveState::Done => true,
            LiveState::Scan { pos, total } => pos >= total,
            LiveState::Filter { .. } => false,
        }
    }

    fn column(&self, ctx: &mut Context, col: c_int) -> rusqlite::Result<()> {
        let value = usize::try_from(col).ok().and_then(|col| {
            if col >= self.def.columns().len() {
                return None;
            }
            match &self.state {
                LiveState::Scan { pos, total } if pos < total => {
                    Some(self.def.columns()[col].read(*pos))
                }
                LiveState::Filter { iter } => Some(iter.value(col)),
                _ => None,
            }
        });
        ctx.set_result(&value.unwrap_or(Value::Null))
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(match &self.state {
            LiveState::Done => 0,
            LiveState::Scan { pos, .. } => *pos as i64,
            LiveState::Filter { iter } => iter.rowid(),
        })
    }
}
