//! Query planning for FernDB
//!
//! This module resolves column references against the participating tables,
//! splits a WHERE conjunction into per-table predicates, and picks a scan
//! plan for each table: an index lookup when some equality predicate has an
//! index on its column, a full scan otherwise.

use crate::catalog::{Catalog, TableMeta};
use crate::error::{Error, Result};
use crate::sql::ast::{ColumnRef, JoinClause, WhereClause};
use crate::storage::{Row, Value};

/// A column resolved against the participating tables:
/// (participant index, column name)
pub type ResolvedColumn = (usize, String);

/// An equality predicate between columns of two participating tables
#[derive(Debug, Clone, PartialEq)]
pub struct CrossPredicate {
    pub left: ResolvedColumn,
    pub right: ResolvedColumn,
}

impl CrossPredicate {
    /// Split into (outer column, inner column name) relative to the
    /// participant that joined at `inner_idx`
    pub fn oriented(&self, inner_idx: usize) -> (ResolvedColumn, String) {
        if self.right.0 == inner_idx {
            (self.left.clone(), self.right.1.clone())
        } else {
            (self.right.clone(), self.left.1.clone())
        }
    }
}

/// How to fetch one table's candidate rows
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPlan {
    /// Read every live row and filter
    FullScan,
    /// Probe the named index with an equality key, then filter
    IndexLookup { index: String, key: Value },
}

/// Resolve a column reference. Unqualified references must be unambiguous
/// across the participating tables; qualified references must name one of
/// them.
pub fn resolve_column(tables: &[&TableMeta], col: &ColumnRef) -> Result<ResolvedColumn> {
    match &col.table {
        Some(qualifier) => {
            let idx = tables
                .iter()
                .position(|t| t.name == *qualifier)
                .ok_or_else(|| Error::TableNotFound(qualifier.clone()))?;
            if !tables[idx].has_column(&col.column) {
                return Err(Error::ColumnNotFound(col.column.clone(), qualifier.clone()));
            }
            Ok((idx, col.column.clone()))
        }
        None => {
            let matches: Vec<usize> = tables
                .iter()
                .enumerate()
                .filter(|(_, t)| t.has_column(&col.column))
                .map(|(i, _)| i)
                .collect();

            match matches.as_slice() {
                [] => {
                    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
                    Err(Error::ColumnNotFound(col.column.clone(), names.join(", ")))
                }
                [idx] => Ok((*idx, col.column.clone())),
                _ => Err(Error::AmbiguousColumn(col.column.clone())),
            }
        }
    }
}

/// Split a WHERE conjunction into per-table literal predicates. The grammar
/// only admits `col = literal` conditions, so every condition lands on
/// exactly one participant.
pub fn split_where(
    tables: &[&TableMeta],
    where_clause: Option<&WhereClause>,
) -> Result<Vec<Vec<(String, Value)>>> {
    let mut per_table: Vec<Vec<(String, Value)>> = vec![Vec::new(); tables.len()];

    if let Some(clause) = where_clause {
        for cond in &clause.conditions {
            let (idx, column) = resolve_column(tables, &cond.column)?;
            per_table[idx].push((column, cond.value.to_value()));
        }
    }

    Ok(per_table)
}

/// Resolve a JOIN's ON clause into a cross-table predicate. One side must be
/// the newly joined table (`inner_idx`); the other must be an earlier
/// participant.
pub fn resolve_join(
    tables: &[&TableMeta],
    join: &JoinClause,
    inner_idx: usize,
) -> Result<CrossPredicate> {
    let left = resolve_column(tables, &join.left)?;
    let right = resolve_column(tables, &join.right)?;

    if left.0 == right.0 || (left.0 != inner_idx && right.0 != inner_idx) {
        return Err(Error::InvalidJoinCondition(join.table.clone()));
    }

    Ok(CrossPredicate { left, right })
}

/// Pick a scan plan for one table given its literal predicates. An equality
/// against NULL can never be answered from an index (NULLs are not indexed),
/// so such predicates always fall through to a full scan.
pub fn choose_scan(
    catalog: &Catalog,
    table: &TableMeta,
    preds: &[(String, Value)],
) -> ScanPlan {
    for (column, value) in preds {
        if value.is_null() {
            continue;
        }
        if let Some(index) = catalog.index_on(&table.name, column) {
            return ScanPlan::IndexLookup {
                index: index.name.clone(),
                key: value.clone(),
            };
        }
    }
    ScanPlan::FullScan
}

/// Check a row against a set of literal equality predicates
pub fn row_matches(row: &Row, preds: &[(String, Value)]) -> bool {
    preds.iter().all(|(column, value)| row.get(column) == value)
}
