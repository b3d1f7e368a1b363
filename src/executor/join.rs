//! Join algorithms for FernDB
//!
//! Inner equi-joins only, composed left-deep. Two algorithms: plain
//! nested-loop over materialized candidate rows, and index-nested-loop,
//! which probes an equality index once per row of the non-indexed side.
//! The probe can run in either direction: against the joined table's index,
//! or against an earlier participant's index when only that side is indexed.
//!
//! NULL never joins: an equality between two NULL cells does not pair rows,
//! matching what an index probe (which cannot see NULLs) produces.

use super::planner::{self, ResolvedColumn};
use crate::error::Result;
use crate::storage::{HashIndex, HeapTable, Row, Value};
use std::collections::HashMap;

/// A partial result: one row per participant joined so far
pub type JoinedRows = Vec<Vec<Row>>;

fn values_join(left: &Value, right: &Value) -> bool {
    !left.is_null() && left == right
}

/// Nested loop: pair every partial tuple with every inner candidate row
/// satisfying the join equality
pub fn nested_loop(
    partial: JoinedRows,
    inner: &[Row],
    outer_col: &ResolvedColumn,
    inner_col: &str,
) -> JoinedRows {
    let mut result = Vec::new();
    for tuple in &partial {
        let outer_value = tuple[outer_col.0].get(&outer_col.1);
        for inner_row in inner {
            if values_join(outer_value, inner_row.get(inner_col)) {
                let mut extended = tuple.clone();
                extended.push(inner_row.clone());
                result.push(extended);
            }
        }
    }
    result
}

/// Index-nested-loop: for each partial tuple, probe the joined table's
/// index with the outer value and fetch the matching live rows, filtering
/// them by the joined table's own literal predicates.
pub fn index_nested_loop(
    partial: JoinedRows,
    outer_col: &ResolvedColumn,
    inner_heap: &mut HeapTable,
    inner_index: &HashIndex,
    inner_col: &str,
    inner_preds: &[(String, Value)],
) -> Result<JoinedRows> {
    let mut result = Vec::new();
    for tuple in &partial {
        let outer_value = tuple[outer_col.0].get(&outer_col.1);
        if outer_value.is_null() {
            continue;
        }
        for rid in inner_index.lookup(outer_value) {
            let inner_row = match inner_heap.get(rid)? {
                Some(row) => row,
                None => continue,
            };
            if !values_join(outer_value, inner_row.get(inner_col)) {
                continue;
            }
            if !planner::row_matches(&inner_row, inner_preds) {
                continue;
            }
            let mut extended = tuple.clone();
            extended.push(inner_row);
            result.push(extended);
        }
    }
    Ok(result)
}

/// Index-nested-loop with the roles swapped: the joined table's candidates
/// drive the loop and probe an index on an earlier participant's join
/// column. Probed RIDs are matched back to the partial tuples holding that
/// row.
pub fn index_nested_loop_swapped(
    partial: JoinedRows,
    outer_col: &ResolvedColumn,
    outer_index: &HashIndex,
    inner: &[Row],
    inner_col: &str,
) -> JoinedRows {
    // RID of the indexed participant -> positions of the tuples carrying it
    let mut by_rid: HashMap<u64, Vec<usize>> = HashMap::new();
    for (pos, tuple) in partial.iter().enumerate() {
        by_rid.entry(tuple[outer_col.0].rid()).or_default().push(pos);
    }

    let mut result = Vec::new();
    for inner_row in inner {
        let inner_value = inner_row.get(inner_col);
        if inner_value.is_null() {
            continue;
        }
        for rid in outer_index.lookup(inner_value) {
            let Some(positions) = by_rid.get(&rid) else {
                continue;
            };
            for &pos in positions {
                let tuple = &partial[pos];
                if !values_join(tuple[outer_col.0].get(&outer_col.1), inner_value) {
                    continue;
                }
                let mut extended = tuple.clone();
                extended.push(inner_row.clone());
                result.push(extended);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rid: u64, col: &str, value: Value) -> Row {
        let mut row = Row::new(rid);
        row.set(col, value);
        row
    }

    fn singletons(rows: Vec<Row>) -> JoinedRows {
        rows.into_iter().map(|r| vec![r]).collect()
    }

    #[test]
    fn test_nested_loop_pairs_on_equality() {
        let outer = singletons(vec![
            row(1, "id", Value::Integer(1)),
            row(2, "id", Value::Integer(2)),
        ]);
        let inner = vec![
            row(1, "tid", Value::Integer(1)),
            row(2, "tid", Value::Integer(1)),
            row(3, "tid", Value::Integer(3)),
        ];

        let joined = nested_loop(outer, &inner, &(0, "id".to_string()), "tid");
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0][0].rid(), 1);
        assert_eq!(joined[0][1].rid(), 1);
        assert_eq!(joined[1][1].rid(), 2);
    }

    #[test]
    fn test_nested_loop_null_never_joins() {
        let outer = singletons(vec![row(1, "id", Value::Null)]);
        let inner = vec![row(1, "tid", Value::Null)];

        let joined = nested_loop(outer, &inner, &(0, "id".to_string()), "tid");
        assert!(joined.is_empty());
    }

    #[test]
    fn test_swapped_probe_matches_tuples_back() {
        let outer = singletons(vec![
            row(10, "id", Value::Integer(1)),
            row(11, "id", Value::Integer(2)),
        ]);

        let dir = tempfile::TempDir::new().unwrap();
        let mut index = HashIndex::open(dir.path(), "idx").unwrap();
        index.insert(&Value::Integer(1), 10);
        index.insert(&Value::Integer(2), 11);
        index.insert(&Value::Integer(3), 12); // posting with no matching tuple

        let inner = vec![
            row(1, "tid", Value::Integer(2)),
            row(2, "tid", Value::Integer(3)),
        ];

        let joined =
            index_nested_loop_swapped(outer, &(0, "id".to_string()), &index, &inner, "tid");
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0][0].rid(), 11);
        assert_eq!(joined[0][1].rid(), 1);
    }
}
