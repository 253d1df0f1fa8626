//! Scan-strategy selection.
//!
//! The engine proposes a set of WHERE-clause constraints; this module
//! picks the cheapest way to satisfy the scan: a hash index when one
//! covers an equality constraint, else a registered filter iterator,
//! else a full scan. The decision is pure so it can be exercised without
//! an engine in the loop; the adapter layer translates it onto the
//! engine's index-info structure.

use crate::filter::FilterEntry;

/// First plan id of the hash-index band. Filter ids stay below this.
pub const INDEX_BASE: i32 = 1000;

/// Fixed cost advertised for a hash-index lookup.
pub(crate) const INDEX_COST: f64 = 1.0;
/// Row estimate advertised for a hash-index lookup.
pub(crate) const INDEX_ROWS: f64 = 5.0;

/// Planning fallback when a live definition supplies no row estimator.
/// Deliberately pessimistic so the engine prefers other join orders.
pub(crate) const FALLBACK_ROWS_LIVE: f64 = 100_000.0;
/// Planning fallback for cached and generator definitions.
pub(crate) const FALLBACK_ROWS_MATERIALIZED: f64 = 1_000.0;

/// One engine constraint, reduced to what the planner cares about.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConstraintView {
    /// Column index; negative values address the rowid.
    pub column: i32,
    pub is_eq: bool,
    pub usable: bool,
}

/// Chosen scan strategy for one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ScanChoice {
    FullScan {
        rows: f64,
    },
    Filter {
        id: i32,
        cost: f64,
        rows: f64,
        /// Position of the consumed constraint in the engine's list.
        constraint: usize,
    },
    Index {
        /// Position of the index in the definition's index registry.
        slot: usize,
        constraint: usize,
    },
}

impl ScanChoice {
    pub(crate) fn idx_num(&self) -> i32 {
        match self {
            Self::FullScan { .. } => 0,
            Self::Filter { id, .. } => *id,
            Self::Index { slot, .. } => INDEX_BASE + *slot as i32,
        }
    }

    pub(crate) fn cost(&self) -> f64 {
        match self {
            Self::FullScan { rows } => *rows,
            Self::Filter { cost, .. } => *cost,
            Self::Index { .. } => INDEX_COST,
        }
    }

    pub(crate) fn estimated_rows(&self) -> f64 {
        match self {
            Self::FullScan { rows } => *rows,
            Self::Filter { rows, .. } => *rows,
            Self::Index { .. } => INDEX_ROWS,
        }
    }

    /// The constraint whose value the engine must pass to `filter`, if
    /// an optimized strategy was chosen.
    pub(crate) fn consumed_constraint(&self) -> Option<usize> {
        match self {
            Self::FullScan { .. } => None,
            Self::Filter { constraint, .. } | Self::Index { constraint, .. } => Some(*constraint),
        }
    }

    /// Tie-break rank: lower wins at equal cost.
    fn rank(&self) -> u8 {
        match self {
            Self::Index { .. } => 0,
            Self::Filter { .. } => 1,
            Self::FullScan { .. } => 2,
        }
    }

    fn is_full_scan(&self) -> bool {
        matches!(self, Self::FullScan { .. })
    }

    /// An optimized strategy always outranks the full scan, whatever its
    /// advertised cost; cost only orders the optimized candidates among
    /// themselves.
    fn beats(&self, other: &Self) -> bool {
        (self.is_full_scan(), self.cost(), self.rank())
            < (other.is_full_scan(), other.cost(), other.rank())
    }
}

/// Pick the cheapest strategy for the given constraints.
///
/// `indexed_columns` lists, in registry order, the column each hash
/// index covers; an empty slice disables the index band. The
/// authoritative row counter is never consulted here, only the cheap
/// `fallback_rows` advisory.
pub(crate) fn choose_scan(
    constraints: &[ConstraintView],
    filters: &[FilterEntry],
    indexed_columns: &[usize],
    fallback_rows: f64,
) -> ScanChoice {
    let mut best = ScanChoice::FullScan {
        rows: fallback_rows,
    };

    for (pos, c) in constraints.iter().enumerate() {
        if !c.usable || !c.is_eq || c.column < 0 {
            continue;
        }
        let column = c.column as usize;

        if let Some(slot) = indexed_columns.iter().position(|&ic| ic == column) {
            let candidate = ScanChoice::Index {
                slot,
                constraint: pos,
            };
            if candidate.beats(&best) {
                best = candidate;
            }
        } else if let Some(f) = filters.iter().find(|f| f.column() == column) {
            let candidate = ScanChoice::Filter {
                id: f.id(),
                cost: f.cost(),
                rows: f.estimated_rows(),
                constraint: pos,
            };
            if candidate.beats(&best) {
                best = candidate;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::filter::FilterEntry;

    fn eq(column: i32) -> ConstraintView {
        ConstraintView {
            column,
            is_eq: true,
            usable: true,
        }
    }

    fn filter_on(column: usize, id: i32, cost: f64) -> FilterEntry {
        FilterEntry::int(column, id, cost, 3.0, |_| None)
    }

    #[test]
    fn no_constraints_is_full_scan() {
        let choice = choose_scan(&[], &[filter_on(0, 1, 10.0)], &[], 500.0);
        assert_eq!(choice.idx_num(), 0);
        assert!((choice.cost() - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn filter_wins_over_full_scan() {
        let choice = choose_scan(&[eq(0)], &[filter_on(0, 1, 10.0)], &[], 500.0);
        assert_eq!(choice.idx_num(), 1);
        assert_eq!(choice.consumed_constraint(), Some(0));
    }

    #[test]
    fn filter_wins_even_when_the_table_estimate_is_tiny() {
        // A seven-row table with a cost-10 filter: the filter is exact
        // for the constraint, so it still beats enumerating the cache.
        let choice = choose_scan(&[eq(0)], &[filter_on(0, 1, 10.0)], &[], 7.0);
        assert_eq!(choice.idx_num(), 1);
    }

    #[test]
    fn index_beats_filter_on_same_column() {
        let choice = choose_scan(&[eq(2)], &[filter_on(2, 1, 10.0)], &[2], 500.0);
        assert!(choice.idx_num() >= INDEX_BASE);
        assert_eq!(choice.idx_num(), INDEX_BASE);
    }

    #[test]
    fn index_beats_filter_even_at_equal_cost() {
        // Both options cost 1.0 here; the tie-break prefers the index.
        let choice = choose_scan(&[eq(0), eq(1)], &[filter_on(1, 1, 1.0)], &[0], 500.0);
        assert_eq!(choice.idx_num(), INDEX_BASE);
    }

    #[test]
    fn sub_unit_cost_filter_outprices_index() {
        // Index cost is fixed at 1.0, so only a sub-1.0 filter can win.
        let choice = choose_scan(&[eq(0), eq(1)], &[filter_on(1, 1, 0.5)], &[0], 500.0);
        assert_eq!(choice.idx_num(), 1);
    }

    #[test]
    fn unusable_constraint_is_ignored() {
        let c = ConstraintView {
            column: 0,
            is_eq: true,
            usable: false,
        };
        let choice = choose_scan(&[c], &[filter_on(0, 1, 10.0)], &[], 500.0);
        assert_eq!(choice.idx_num(), 0);
    }

    #[test]
    fn non_eq_constraint_is_ignored() {
        let c = ConstraintView {
            column: 0,
            is_eq: false,
            usable: true,
        };
        let choice = choose_scan(&[c], &[filter_on(0, 1, 10.0)], &[], 500.0);
        assert_eq!(choice.idx_num(), 0);
    }

    #[test]
    fn rowid_constraint_is_ignored() {
        let choice = choose_scan(&[eq(-1)], &[filter_on(0, 1, 10.0)], &[], 500.0);
        assert_eq!(choice.idx_num(), 0);
    }

    #[test]
    fn second_index_slot_reports_banded_idx_num() {
        let choice = choose_scan(&[eq(5)], &[], &[3, 5], 500.0);
        assert_eq!(choice.idx_num(), INDEX_BASE + 1);
    }

    proptest! {
        #[test]
        fn optimized_path_chosen_whenever_one_applies(
            columns in proptest::collection::vec(0i32..8, 0..6),
            filter_cost in 0.1f64..10_000.0,
            fallback in 1.0f64..1_000_000.0,
        ) {
            let constraints: Vec<ConstraintView> = columns.iter().map(|&c| eq(c)).collect();
            let filters = vec![filter_on(0, 1, filter_cost), filter_on(3, 2, filter_cost * 2.0)];
            let choice = choose_scan(&constraints, &filters, &[1], fallback);
            let applicable = columns.iter().any(|&c| c == 0 || c == 1 || c == 3);
            prop_assert_eq!(choice.idx_num() != 0, applicable);
        }

        #[test]
        fn consumed_constraint_is_always_usable_eq(
            usable in proptest::collection::vec(any::<bool>(), 1..6),
        ) {
            let constraints: Vec<ConstraintView> = usable
                .iter()
                .enumerate()
                .map(|(i, &u)| ConstraintView { column: i as i32, is_eq: true, usable: u })
                .collect();
            let filters: Vec<FilterEntry> =
                (0..constraints.len()).map(|i| filter_on(i, i as i32 + 1, 5.0)).collect();
            let choice = choose_scan(&constraints, &filters, &[], 100.0);
            if let Some(pos) = choice.consumed_constraint() {
                prop_assert!(constraints[pos].usable);
            }
        }
    }
}
