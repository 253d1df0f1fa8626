//! Adapter for the generator flavor: rows are pulled from a one-shot
//! producer so the engine's demand drives enumeration.
#![allow(unsafe_code)]

use std::os::raw::c_int;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::vtab::{
    Context, CreateVTab, Filters, IndexInfo, VTab, VTabConnection, VTabCursor, VTabKind,
    sqlite3_vtab, sqlite3_vtab_cursor,
};

use super::{apply_choice, constraint_views, first_arg};
use crate::def::GeneratorTableDef;
use crate::error::HostError;
use crate::filter::find_by_id;
use crate::plan::choose_scan;
use crate::row_iter::{RowGenerator, RowIterator};

#[repr(C)]
pub struct StreamTable<R: 'static> {
    base: sqlite3_vtab,
    def: Arc<GeneratorTableDef<R>>,
}

unsafe impl<'vtab, R: Send + Sync + 'static> VTab<'vtab> for StreamTable<R> {
    type Aux = Arc<GeneratorTableDef<R>>;
    type Cursor = StreamCursor<R>;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let def = aux.ok_or_else(|| {
            rusqlite::Error::ModuleError(
                "generator table module registered without definition".into(),
            )
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

    fn open(&'vtab mut self) -> rusqlite::Result<StreamCursor<R>> {
        Ok(StreamCursor {
            base: sqlite3_vtab_cursor::default(),
            def: Arc::clone(&self.def),
            state: StreamState::Done,
        })
    }
}

impl<'vtab, R: Send + Sync + 'static> CreateVTab<'vtab> for StreamTable<R> {
    const KIND: VTabKind = VTabKind::Default;
}

enum StreamState<R> {
    Done,
    Stream {
        generator: Box<dyn RowGenerator<R>>,
        row: R,
    },
    Filter {
        iter: Box<dyn RowIterator>,
    },
}

#[repr(C)]
pub struct StreamCursor<R: 'static> {
    base: sqlite3_vtab_cursor,
    def: Arc<GeneratorTableDef<R>>,
    state: StreamState<R>,
}

unsafe impl<R: Send + Sync + 'static> VTabCursor for StreamCursor<R> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        self.state = match idx_num {
            0 => {
                let mut generator = (self.def.make_generator)();
                match generator.next() {
                    Some(row) => StreamState::Stream { generator, row },
                    None => StreamState::Done,
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
                            StreamState::Filter { iter }
                        } else {
                            StreamState::Done
                        }
                    }
                    None => StreamState::Done,
                }
            }
        };
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        let exhausted = match &mut self.state {
            StreamState::Done => false,
            StreamState::Stream { generator, row } => match generator.next() {
                Some(r) => {
                    *row = r;
                    false
                }
                None => true,
            },
            StreamState::Filter { iter } => !iter.next(),
        };
        if exhausted {
            self.state = StreamState::Done;
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        matches!(self.state, StreamState::Done)
    }

    fn column(&self, ctx: &mut Context, col: c_int) -> rusqlite::Result<()> {
        let value = usize::try_from(col).ok().and_then(|col| {
            if col >= self.def.columns().len() {
                return None;
            }
            match &self.state {
                StreamState::Stream { row, .. } => Some(self.def.columns()[col].read(row)),
                StreamState::Filter { iter } => Some(iter.value(col)),
                StreamState::Done => None,
            }
        });
        ctx.set_result(&value.unwrap_or(Value::Null))
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(match &self.state {
            StreamState::Done => 0,
            StreamState::Stream { generator, .. } => generator.rowid(),
            StreamState::Filter { iter } => iter.rowid(),
        })
    }
}
