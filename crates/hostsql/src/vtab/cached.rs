//! Adapter for the cached flavor: one shared enumeration of host data,
//! served from an immutable snapshot with optional hash-index lookups.
#![allow(unsafe_code)]

use std::os::raw::c_int;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::vtab::{
    Context, CreateVTab, Filters, IndexInfo, VTab, VTabConnection, VTabCursor, VTabKind,
    sqlite3_vtab, sqlite3_vtab_cursor,
};

use super::{apply_choice, constraint_views, first_arg};
use crate::cache::CacheSnapshot;
use crate::def::CachedTableDef;
use crate::error::HostError;
use crate::filter::find_by_id;
use crate::plan::{INDEX_BASE, choose_scan};
use crate::row_iter::RowIterator;
use crate::value::coerce_i64;

#[repr(C)]
pub struct CachedTable<R: 'static> {
    base: sqlite3_vtab,
    def: Arc<CachedTableDef<R>>,
}

unsafe impl<'vtab, R: Send + Sync + 'static> VTab<'vtab> for CachedTable<R> {
    type Aux = Arc<CachedTableDef<R>>;
    type Cursor = CachedCursor<R>;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let def = aux.ok_or_else(|| {
            rusqlite::Error::ModuleError("cached table module registered without definition".into())
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
        let choice = choose_scan(
            &views,
            self.def.filters(),
            &self.def.indexed_columns(),
            self.def.planning_rows(),
        );
        apply_choice(self.def.name(), info, &choice);
        Ok(())
    }

    fn open(&'vtab mut self) -> rusqlite::Result<CachedCursor<R>> {
        Ok(CachedCursor {
            base: sqlite3_vtab_cursor::default(),
            def: Arc::clone(&self.def),
            state: CachedState::Done,
        })
    }
}

impl<'vtab, R: Send + Sync + 'static> CreateVTab<'vtab> for CachedTable<R> {
    const KIND: VTabKind = VTabKind::Default;
}

enum CachedState<R: 'static> {
    Done,
    Scan {
        snap: Arc<CacheSnapshot<R>>,
        pos: usize,
    },
    IndexLookup {
        snap: Arc<CacheSnapshot<R>>,
        matches: Vec<usize>,
        pos: usize,
    },
    Filter {
        iter: Box<dyn RowIterator>,
    },
}

#[repr(C)]
pub struct CachedCursor<R: 'static> {
    base: sqlite3_vtab_cursor,
    def: Arc<CachedTableDef<R>>,
    state: CachedState<R>,
}

impl<R> CachedCursor<R> {
    fn current_row(&self) -> Option<&R> {
        match &self.state {
            CachedState::Scan { snap, pos } => snap.rows().get(*pos),
            CachedState::IndexLookup { snap, matches, pos } => {
                matches.get(*pos).and_then(|&row| snap.rows().get(row))
            }
            _ => None,
        }
    }
}

unsafe impl<R: Send + Sync + 'static> VTabCursor for CachedCursor<R> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        self.state = match idx_num {
            0 => CachedState::Scan {
                snap: self.def.snapshot(),
                pos: 0,
            },
            id if id >= INDEX_BASE => {
                let slot = (id - INDEX_BASE) as usize;
                if slot >= self.def.indexed_columns().len() {
                    return Err(HostError::UnknownPlan { idx_num: id }.into_sqlite());
                }
                let key = coerce_i64(&first_arg(args)?);
                let snap = self.def.snapshot();
                let matches = snap.lookup(slot, key).to_vec();
                if matches.is_empty() {
                    CachedState::Done
                } else {
                    CachedState::IndexLookup {
                        snap,
                        matches,
                        pos: 0,
                    }
                }
            }
            id => {
                let Some(entry) = find_by_id(self.def.filters(), id) else {
                    return Err(HostError::UnknownPlan { idx_num: id }.into_sqlite());
                };
                let key = first_arg(args)?;
                match entry.open(&key) {
                    Some(mut iter) => {
                        if iter.next() {
                            CachedState::Filter { iter }
                        } else {
                            CachedState::Done
                        }
                    }
                    None => CachedState::Done,
                }
            }
        };
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        let exhausted = match &mut self.state {
            CachedState::Done => false,
            CachedState::Scan { pos, .. } | CachedState::IndexLookup { pos, .. } => {
                *pos += 1;
                false
            }
            CachedState::Filter { iter } => !iter.next(),
        };
        if exhausted {
            self.state = CachedState::Done;
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        match &self.state {
            CachedState::Done => true,
            CachedState::Scan { snap, pos } => *pos >= snap.rows().len(),
            CachedState::IndexLookup { matches, pos, .. } => *pos >= matches.len(),
            CachedState::Filter { .. } => false,
        }
    }

    fn column(&self, ctx: &mut Context, col: c_int) -> rusqlite::Result<()> {
        let value = usize::try_from(col).ok().and_then(|col| {
            if col >= self.def.columns().len() {
                return None;
            }
            if let CachedState::Filter { iter } = &self.state {
                return Some(iter.value(col));
            }
            self.current_row().map(|row| self.def.columns()[col].read(row))
        });
        ctx.set_result(&value.unwrap_or(Value::Null))
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(match &self.state {
            CachedState::Done => 0,
            CachedState::Scan { pos, .. } => *pos as i64,
            // Position within the match list, not the cached row position.
            CachedState::IndexLookup { pos, .. } => *pos as i64,
            CachedState::Filter { iter } => iter.rowid(),
        })
    }
}
