//! Query Executor for FernDB
//!
//! This module interprets parsed statements against the catalog, heap
//! tables and indexes. DML validates types and constraints fully before the
//! first write; UPDATE validates its whole batch so a mid-batch violation
//! leaves no visible change. Counters, directories and touched indexes are
//! persisted before a statement returns.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, trace};

use super::join;
use super::planner::{self, ResolvedColumn, ScanPlan};
use crate::catalog::{Catalog, Column, IndexMeta, TableMeta};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::storage::{HashIndex, HeapTable, Rid, Row, Value};

/// A SELECT result: column names plus rows of values
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    /// Output column names; qualified as `table.column` where the bare name
    /// is ambiguous among the participating tables
    pub columns: Vec<String>,
    /// Result rows, aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

/// Which command an acknowledgement answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    CreateTable,
    CreateIndex,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckKind::CreateTable => write!(f, "CREATE_TABLE"),
            AckKind::CreateIndex => write!(f, "CREATE_INDEX"),
            AckKind::Insert => write!(f, "INSERT"),
            AckKind::Update => write!(f, "UPDATE"),
            AckKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Acknowledgement for DDL and DML statements
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub kind: AckKind,
    /// Number of affected rows (0 for DDL)
    pub affected: usize,
}

/// The result of one executed statement
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    Rows(RowSet),
    Ack(Ack),
}

impl StatementResult {
    /// The row set, if this was a SELECT
    pub fn rows(&self) -> Option<&RowSet> {
        match self {
            StatementResult::Rows(rows) => Some(rows),
            StatementResult::Ack(_) => None,
        }
    }

    /// The acknowledgement, if this was DDL or DML
    pub fn ack(&self) -> Option<&Ack> {
        match self {
            StatementResult::Rows(_) => None,
            StatementResult::Ack(ack) => Some(ack),
        }
    }
}

/// Execution Engine
///
/// Owns the catalog and all open table and index handles for one database
/// directory. Not thread-safe; callers serialize access.
pub struct ExecutionEngine {
    /// Database root directory
    root: PathBuf,
    /// System catalog
    catalog: Catalog,
    /// Open heap tables (table name -> handle), opened on first use
    tables: HashMap<String, HeapTable>,
    /// Open indexes (index name -> handle), opened on first use
    indexes: HashMap<String, HashIndex>,
}

impl ExecutionEngine {
    /// Create an engine for a database directory, loading the catalog
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let catalog = Catalog::load(&root)?;

        Ok(Self {
            root,
            catalog,
            tables: HashMap::new(),
            indexes: HashMap::new(),
        })
    }

    /// Execute one statement
    pub fn execute(&mut self, stmt: Statement) -> Result<StatementResult> {
        match stmt {
            Statement::CreateTable(s) => self.execute_create_table(s),
            Statement::CreateIndex(s) => self.execute_create_index(s),
            Statement::Insert(s) => self.execute_insert(s),
            Statement::Select(s) => self.execute_select(s),
            Statement::Update(s) => self.execute_update(s),
            Statement::Delete(s) => self.execute_delete(s),
        }
    }

    /// Flush every open table
    pub fn sync(&mut self) -> Result<()> {
        for table in self.tables.values_mut() {
            table.sync()?;
        }
        Ok(())
    }

    // ========== DDL ==========

    fn execute_create_table(&mut self, stmt: CreateTableStatement) -> Result<StatementResult> {
        debug!(table = %stmt.table_name, "CREATE TABLE");

        let columns: Vec<Column> = stmt
            .columns
            .into_iter()
            .map(|c| {
                Column::new(c.name, c.data_type)
                    .not_null(c.not_null)
                    .unique(c.unique)
                    .primary_key(c.primary_key)
            })
            .collect();

        self.catalog.create_table(&stmt.table_name, columns)?;
        self.catalog.save(&self.root)?;

        // Create the storage files right away
        self.heap(&stmt.table_name)?;

        Ok(StatementResult::Ack(Ack {
            kind: AckKind::CreateTable,
            affected: 0,
        }))
    }

    fn execute_create_index(&mut self, stmt: CreateIndexStatement) -> Result<StatementResult> {
        debug!(index = %stmt.index_name, table = %stmt.table_name, "CREATE INDEX");

        if self.catalog.index_exists(&stmt.index_name) {
            return Err(Error::IndexAlreadyExists(stmt.index_name));
        }
        let table = self.catalog.table(&stmt.table_name)?.clone();
        let column = table
            .column(&stmt.column_name)
            .ok_or_else(|| {
                Error::ColumnNotFound(stmt.column_name.clone(), stmt.table_name.clone())
            })?
            .clone();

        // Build the index from a full scan before registering anything, so a
        // failed build leaves neither catalog entry nor index document
        let rows = self.heap(&table.name)?.scan()?;
        let mut index = HashIndex::create(&self.root, &stmt.index_name)?;
        for row in &rows {
            let value = row.get(&column.name);
            if value.is_null() {
                continue;
            }
            if column.requires_unique() && index.contains(value) {
                return Err(duplicate_error(&table.name, &column, value.clone()));
            }
            index.insert(value, row.rid());
        }
        index.save()?;

        self.catalog
            .create_index(&stmt.index_name, &stmt.table_name, &stmt.column_name)?;
        self.catalog.save(&self.root)?;
        self.indexes.insert(stmt.index_name, index);

        Ok(StatementResult::Ack(Ack {
            kind: AckKind::CreateIndex,
            affected: 0,
        }))
    }

    // ========== INSERT ==========

    fn execute_insert(&mut self, stmt: InsertStatement) -> Result<StatementResult> {
        debug!(table = %stmt.table_name, "INSERT");

        let table = self.catalog.table(&stmt.table_name)?.clone();
        for column in &stmt.columns {
            if !table.has_column(column) {
                return Err(Error::ColumnNotFound(column.clone(), table.name.clone()));
            }
        }

        // Missing columns default to NULL
        let mut row = Row::new(0);
        for col in &table.columns {
            row.set(col.name.clone(), Value::Null);
        }
        for (column, literal) in stmt.columns.iter().zip(&stmt.values) {
            row.set(column.clone(), literal.to_value());
        }

        check_row_types(&table, &row)?;
        self.check_constraints(&table, std::slice::from_ref(&row), &HashSet::new())?;

        let rid = self.allocate_rid(&table.name)?;
        row.set_rid(rid);
        self.heap(&table.name)?.append_row(&row)?;

        let index_metas = self.table_indexes(&table.name);
        for meta in &index_metas {
            let value = row.get(&meta.column).clone();
            let index = self.index(&meta.name)?;
            index.insert(&value, row.rid());
            index.save()?;
        }

        Ok(StatementResult::Ack(Ack {
            kind: AckKind::Insert,
            affected: 1,
        }))
    }

    // ========== SELECT ==========

    fn execute_select(&mut self, stmt: SelectStatement) -> Result<StatementResult> {
        debug!(table = %stmt.from, joins = stmt.joins.len(), "SELECT");

        // Participating tables: FROM first, then JOINs in clause order
        let mut participants: Vec<TableMeta> = vec![self.catalog.table(&stmt.from)?.clone()];
        for join in &stmt.joins {
            participants.push(self.catalog.table(&join.table)?.clone());
        }

        let refs: Vec<&TableMeta> = participants.iter().collect();
        let per_table = planner::split_where(&refs, stmt.where_clause.as_ref())?;

        let mut cross = Vec::new();
        for (i, join) in stmt.joins.iter().enumerate() {
            cross.push(planner::resolve_join(&refs[..=i + 1], join, i + 1)?);
        }

        // Projection: explicit columns, or all columns FROM-first
        let projection: Vec<ResolvedColumn> = match &stmt.columns {
            Some(cols) => cols
                .iter()
                .map(|c| planner::resolve_column(&refs, c))
                .collect::<Result<_>>()?,
            None => participants
                .iter()
                .enumerate()
                .flat_map(|(i, t)| t.columns.iter().map(move |c| (i, c.name.clone())))
                .collect(),
        };

        // Driving table, then left-deep joins
        let rows = self.candidate_rows(&participants[0], &per_table[0])?;
        let mut tuples: join::JoinedRows = rows.into_iter().map(|r| vec![r]).collect();

        for (i, pred) in cross.iter().enumerate() {
            let inner_idx = i + 1;
            let inner = &participants[inner_idx];
            let (outer_col, inner_col) = pred.oriented(inner_idx);
            let outer_table = &participants[outer_col.0];

            let inner_indexed = self
                .catalog
                .index_on(&inner.name, &inner_col)
                .map(|m| m.name.clone());
            let outer_indexed = self
                .catalog
                .index_on(&outer_table.name, &outer_col.1)
                .map(|m| m.name.clone());

            tuples = if let Some(index_name) = inner_indexed {
                trace!(inner = %inner.name, index = %index_name, "index-nested-loop join");
                let (heap, index) = self.heap_and_index(&inner.name, &index_name)?;
                join::index_nested_loop(
                    tuples,
                    &outer_col,
                    heap,
                    index,
                    &inner_col,
                    &per_table[inner_idx],
                )?
            } else if let Some(index_name) = outer_indexed {
                trace!(outer = %outer_table.name, index = %index_name, "index-nested-loop join (probing the outer side)");
                let inner_rows = self.candidate_rows(inner, &per_table[inner_idx])?;
                let index = self.index(&index_name)?;
                join::index_nested_loop_swapped(tuples, &outer_col, index, &inner_rows, &inner_col)
            } else {
                trace!(inner = %inner.name, "nested-loop join");
                let inner_rows = self.candidate_rows(inner, &per_table[inner_idx])?;
                join::nested_loop(tuples, &inner_rows, &outer_col, &inner_col)
            };
        }

        // Qualify output names only where the bare name is ambiguous
        let columns: Vec<String> = projection
            .iter()
            .map(|(ti, col)| {
                let ambiguous = participants.iter().filter(|t| t.has_column(col)).count() > 1;
                if ambiguous {
                    format!("{}.{}", participants[*ti].name, col)
                } else {
                    col.clone()
                }
            })
            .collect();

        let rows: Vec<Vec<Value>> = tuples
            .iter()
            .map(|tuple| {
                projection
                    .iter()
                    .map(|(ti, col)| tuple[*ti].get(col).clone())
                    .collect()
            })
            .collect();

        Ok(StatementResult::Rows(RowSet { columns, rows }))
    }

    // ========== UPDATE ==========

    fn execute_update(&mut self, stmt: UpdateStatement) -> Result<StatementResult> {
        debug!(table = %stmt.table_name, "UPDATE");

        let table = self.catalog.table(&stmt.table_name)?.clone();
        for assignment in &stmt.assignments {
            if !table.has_column(&assignment.column) {
                return Err(Error::ColumnNotFound(
                    assignment.column.clone(),
                    table.name.clone(),
                ));
            }
        }

        let refs = [&table];
        let per_table = planner::split_where(&refs, stmt.where_clause.as_ref())?;
        let matches = self.candidate_rows(&table, &per_table[0])?;
        if matches.is_empty() {
            return Ok(StatementResult::Ack(Ack {
                kind: AckKind::Update,
                affected: 0,
            }));
        }

        // Build the prospective rows; nothing is written yet
        let mut updates: Vec<(Row, Row)> = Vec::new();
        for old in matches {
            let mut new_row = Row::new(0);
            for col in &table.columns {
                new_row.set(col.name.clone(), old.get(&col.name).clone());
            }
            for assignment in &stmt.assignments {
                new_row.set(assignment.column.clone(), assignment.value.to_value());
            }
            check_row_types(&table, &new_row)?;
            updates.push((old, new_row));
        }

        // Batch validation against the post-update state: a violation here
        // aborts the whole statement with no visible change
        let exclude: HashSet<Rid> = updates.iter().map(|(old, _)| old.rid()).collect();
        let new_rows: Vec<Row> = updates.iter().map(|(_, new)| new.clone()).collect();
        self.check_constraints(&table, &new_rows, &exclude)?;

        // Commit per row: append the replacement, tombstone the old RID,
        // fix every index on the table
        let index_metas = self.table_indexes(&table.name);
        let affected = updates.len();
        for (old, mut new_row) in updates {
            let rid = self.allocate_rid(&table.name)?;
            new_row.set_rid(rid);

            let heap = self.heap(&table.name)?;
            heap.append_row(&new_row)?;
            heap.append_tombstone(old.rid())?;

            for meta in &index_metas {
                let old_value = old.get(&meta.column).clone();
                let new_value = new_row.get(&meta.column).clone();
                let index = self.index(&meta.name)?;
                index.remove(&old_value, old.rid());
                index.insert(&new_value, new_row.rid());
            }
        }
        for meta in &index_metas {
            self.index(&meta.name)?.save()?;
        }

        Ok(StatementResult::Ack(Ack {
            kind: AckKind::Update,
            affected,
        }))
    }

    // ========== DELETE ==========

    fn execute_delete(&mut self, stmt: DeleteStatement) -> Result<StatementResult> {
        debug!(table = %stmt.table_name, "DELETE");

        let table = self.catalog.table(&stmt.table_name)?.clone();
        let refs = [&table];
        let per_table = planner::split_where(&refs, stmt.where_clause.as_ref())?;
        let matches = self.candidate_rows(&table, &per_table[0])?;

        let index_metas = self.table_indexes(&table.name);
        let affected = matches.len();
        for row in matches {
            self.heap(&table.name)?.append_tombstone(row.rid())?;
            for meta in &index_metas {
                let value = row.get(&meta.column).clone();
                self.index(&meta.name)?.remove(&value, row.rid());
            }
        }
        if affected > 0 {
            for meta in &index_metas {
                self.index(&meta.name)?.save()?;
            }
        }

        Ok(StatementResult::Ack(Ack {
            kind: AckKind::Delete,
            affected,
        }))
    }

    // ========== Plan execution ==========

    /// Fetch one table's candidate rows: probe an index when some equality
    /// predicate has one, otherwise scan; apply the remaining predicates
    fn candidate_rows(
        &mut self,
        table: &TableMeta,
        preds: &[(String, Value)],
    ) -> Result<Vec<Row>> {
        match planner::choose_scan(&self.catalog, table, preds) {
            ScanPlan::FullScan => {
                trace!(table = %table.name, "full scan");
                let rows = self.heap(&table.name)?.scan()?;
                Ok(rows
                    .into_iter()
                    .filter(|r| planner::row_matches(r, preds))
                    .collect())
            }
            ScanPlan::IndexLookup { index, key } => {
                trace!(table = %table.name, index = %index, "index lookup");
                let rids = self.index(&index)?.lookup(&key);
                let heap = self.heap(&table.name)?;
                let mut rows = Vec::new();
                for rid in rids {
                    if let Some(row) = heap.get(rid)? {
                        if planner::row_matches(&row, preds) {
                            rows.push(row);
                        }
                    }
                }
                Ok(rows)
            }
        }
    }

    // ========== Constraint enforcement ==========

    /// Validate NOT NULL, PRIMARY KEY and UNIQUE for a batch of candidate
    /// rows against the live rows outside `exclude` and against each other.
    /// Three passes, in that order, so a PRIMARY KEY violation is reported
    /// ahead of a UNIQUE violation on the same batch regardless of column
    /// declaration order.
    fn check_constraints(
        &mut self,
        table: &TableMeta,
        new_rows: &[Row],
        exclude: &HashSet<Rid>,
    ) -> Result<()> {
        // NOT NULL (PRIMARY KEY implies it)
        for row in new_rows {
            for col in &table.columns {
                if col.requires_non_null() && row.get(&col.name).is_null() {
                    return Err(Error::NotNullViolation {
                        table: table.name.clone(),
                        column: col.name.clone(),
                    });
                }
            }
        }

        // PRIMARY KEY uniqueness
        if let Some(pk) = table.primary_key_column() {
            self.check_unique_column(table, pk, new_rows, exclude)?;
        }

        // Remaining UNIQUE columns, ignoring NULLs
        for col in &table.columns {
            if col.unique && !col.primary_key {
                self.check_unique_column(table, col, new_rows, exclude)?;
            }
        }
        Ok(())
    }

    /// Reject duplicate non-NULL values in one constrained column, both
    /// against live rows outside the batch and within the batch itself
    fn check_unique_column(
        &mut self,
        table: &TableMeta,
        col: &Column,
        new_rows: &[Row],
        exclude: &HashSet<Rid>,
    ) -> Result<()> {
        let mut seen: HashSet<Value> = HashSet::new();
        for row in new_rows {
            let value = row.get(&col.name);
            if value.is_null() {
                continue;
            }
            if self.unique_conflict(table, &col.name, value, exclude)?
                || !seen.insert(value.clone())
            {
                return Err(duplicate_error(&table.name, col, value.clone()));
            }
        }
        Ok(())
    }

    /// Does any live row outside `exclude` already hold `value` in `column`?
    /// The column's index is authoritative when one exists; otherwise a full
    /// scan decides.
    fn unique_conflict(
        &mut self,
        table: &TableMeta,
        column: &str,
        value: &Value,
        exclude: &HashSet<Rid>,
    ) -> Result<bool> {
        let indexed = self
            .catalog
            .index_on(&table.name, column)
            .map(|m| m.name.clone());

        if let Some(index_name) = indexed {
            let rids = self.index(&index_name)?.lookup(value);
            let heap = self.heap(&table.name)?;
            Ok(rids
                .into_iter()
                .any(|rid| !exclude.contains(&rid) && heap.is_live(rid)))
        } else {
            let rows = self.heap(&table.name)?.scan()?;
            Ok(rows
                .iter()
                .any(|row| !exclude.contains(&row.rid()) && row.get(column) == value))
        }
    }

    // ========== Handles and persistence ==========

    /// Allocate a RID and persist the catalog, so the counter survives a
    /// crash before the row lands in the heap
    fn allocate_rid(&mut self, table: &str) -> Result<Rid> {
        let rid = self.catalog.allocate_rid(table)?;
        self.catalog.save(&self.root)?;
        Ok(rid)
    }

    /// Get the heap handle for a table, opening it on first use
    fn heap(&mut self, name: &str) -> Result<&mut HeapTable> {
        self.catalog.table(name)?;
        match self.tables.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(HeapTable::open(&self.root, name)?)),
        }
    }

    /// Get the handle for an index, opening it on first use
    fn index(&mut self, name: &str) -> Result<&mut HashIndex> {
        match self.indexes.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(HashIndex::open(&self.root, name)?)),
        }
    }

    /// Borrow a table's heap mutably and an index immutably at once (the
    /// index-nested-loop probe needs both)
    fn heap_and_index(
        &mut self,
        table: &str,
        index: &str,
    ) -> Result<(&mut HeapTable, &HashIndex)> {
        self.heap(table)?;
        self.index(index)?;

        let heap = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::Internal(format!("table handle '{}' vanished", table)))?;
        let index = self
            .indexes
            .get(index)
            .ok_or_else(|| Error::Internal(format!("index handle '{}' vanished", index)))?;
        Ok((heap, index))
    }

    /// Metadata for every index on a table
    fn table_indexes(&self, table: &str) -> Vec<IndexMeta> {
        self.catalog
            .indexes_for(table)
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Check every non-NULL cell against its declared column type; the engine
/// never coerces
fn check_row_types(table: &TableMeta, row: &Row) -> Result<()> {
    for col in &table.columns {
        let value = row.get(&col.name);
        if value.is_null() {
            continue;
        }
        if !col.data_type.accepts(value) {
            return Err(Error::TypeMismatch {
                table: table.name.clone(),
                column: col.name.clone(),
                expected: col.data_type.to_string(),
                value: value.clone(),
            });
        }
        if let (Some(limit), Value::String(s)) = (col.data_type.varchar_limit(), value) {
            if s.chars().count() > limit {
                return Err(Error::VarcharOverflow {
                    table: table.name.clone(),
                    column: col.name.clone(),
                    limit,
                });
            }
        }
    }
    Ok(())
}

fn duplicate_error(table: &str, col: &Column, value: Value) -> Error {
    if col.primary_key {
        Error::PrimaryKeyViolation {
            table: table.to_string(),
            column: col.name.clone(),
            value,
        }
    } else {
        Error::UniqueViolation {
            table: table.to_string(),
            column: col.name.clone(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> ExecutionEngine {
        ExecutionEngine::new(dir.path()).unwrap()
    }

    fn run(engine: &mut ExecutionEngine, sql: &str) -> Result<StatementResult> {
        let stmt = Parser::new(sql).unwrap().parse().unwrap();
        engine.execute(stmt)
    }

    fn setup_users(engine: &mut ExecutionEngine) {
        run(
            engine,
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)",
        )
        .unwrap();
        run(engine, "INSERT INTO users (id, name, age) VALUES (1, 'Alice', 30)").unwrap();
        run(engine, "INSERT INTO users (id, name, age) VALUES (2, 'Bob', NULL)").unwrap();
    }

    #[test]
    fn test_create_insert_select() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        let result = run(&mut engine, "SELECT * FROM users WHERE id = 2").unwrap();
        let rows = result.rows().unwrap();
        assert_eq!(rows.columns, vec!["id", "name", "age"]);
        assert_eq!(
            rows.rows,
            vec![vec![
                Value::Integer(2),
                Value::String("Bob".to_string()),
                Value::Null,
            ]]
        );
    }

    #[test]
    fn test_insert_missing_columns_default_to_null() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        run(&mut engine, "INSERT INTO users (id, name) VALUES (3, 'Carol')").unwrap();
        let result = run(&mut engine, "SELECT age FROM users WHERE id = 3").unwrap();
        assert_eq!(result.rows().unwrap().rows, vec![vec![Value::Null]]);
    }

    #[test]
    fn test_primary_key_violation_leaves_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        let err = run(&mut engine, "INSERT INTO users (id, name) VALUES (1, 'dup')");
        assert!(matches!(err, Err(Error::PrimaryKeyViolation { .. })));

        let result = run(&mut engine, "SELECT * FROM users").unwrap();
        assert_eq!(result.rows().unwrap().rows.len(), 2);
    }

    #[test]
    fn test_primary_key_violation_reported_before_unique() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);

        // UNIQUE column declared ahead of the PK column
        run(
            &mut engine,
            "CREATE TABLE acct (email TEXT UNIQUE, id INTEGER PRIMARY KEY)",
        )
        .unwrap();
        run(&mut engine, "INSERT INTO acct (email, id) VALUES ('a@x', 1)").unwrap();

        // A row violating both constraints at once reports the PK first
        let err = run(&mut engine, "INSERT INTO acct (email, id) VALUES ('a@x', 1)");
        assert!(matches!(err, Err(Error::PrimaryKeyViolation { .. })));
    }

    #[test]
    fn test_not_null_violation() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        let err = run(&mut engine, "INSERT INTO users (id) VALUES (3)");
        assert!(matches!(err, Err(Error::NotNullViolation { .. })));
    }

    #[test]
    fn test_type_mismatch_is_rejected_without_coercion() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        let err = run(&mut engine, "INSERT INTO users (id, name) VALUES ('3', 'x')");
        assert!(matches!(err, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_varchar_length_is_enforced() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        run(&mut engine, "CREATE TABLE s (v VARCHAR(3))").unwrap();

        run(&mut engine, "INSERT INTO s (v) VALUES ('abc')").unwrap();
        let err = run(&mut engine, "INSERT INTO s (v) VALUES ('abcd')");
        assert!(matches!(err, Err(Error::VarcharOverflow { .. })));
    }

    #[test]
    fn test_unique_allows_multiple_nulls() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        run(&mut engine, "CREATE TABLE u (x INTEGER UNIQUE)").unwrap();

        run(&mut engine, "INSERT INTO u (x) VALUES (NULL)").unwrap();
        run(&mut engine, "INSERT INTO u (x) VALUES (NULL)").unwrap();
        run(&mut engine, "INSERT INTO u (x) VALUES (5)").unwrap();
        let err = run(&mut engine, "INSERT INTO u (x) VALUES (5)");
        assert!(matches!(err, Err(Error::UniqueViolation { .. })));

        let result = run(&mut engine, "SELECT * FROM u").unwrap();
        assert_eq!(result.rows().unwrap().rows.len(), 3);
    }

    #[test]
    fn test_update_replaces_rid_and_batch_validates() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        let result = run(&mut engine, "UPDATE users SET name = 'A' WHERE id = 1").unwrap();
        assert_eq!(result.ack().unwrap().affected, 1);

        let result = run(&mut engine, "SELECT name FROM users WHERE id = 1").unwrap();
        assert_eq!(
            result.rows().unwrap().rows,
            vec![vec![Value::String("A".to_string())]]
        );

        // Swapping one row's PK onto another must abort with nothing applied
        let err = run(&mut engine, "UPDATE users SET id = 2 WHERE id = 1");
        assert!(matches!(err, Err(Error::PrimaryKeyViolation { .. })));
        let result = run(&mut engine, "SELECT id FROM users WHERE name = 'A'").unwrap();
        assert_eq!(result.rows().unwrap().rows, vec![vec![Value::Integer(1)]]);

        // Updating a row onto its own current value is allowed
        let result = run(&mut engine, "UPDATE users SET id = 1 WHERE id = 1").unwrap();
        assert_eq!(result.ack().unwrap().affected, 1);
    }

    #[test]
    fn test_delete_then_delete_again_affects_zero() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        let result = run(&mut engine, "DELETE FROM users WHERE id = 1").unwrap();
        assert_eq!(result.ack().unwrap().affected, 1);
        let result = run(&mut engine, "DELETE FROM users WHERE id = 1").unwrap();
        assert_eq!(result.ack().unwrap().affected, 0);
    }

    #[test]
    fn test_index_backed_select_matches_full_scan() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        let full = run(&mut engine, "SELECT * FROM users WHERE id = 1").unwrap();
        run(&mut engine, "CREATE INDEX idx_users_id ON users (id)").unwrap();
        let indexed = run(&mut engine, "SELECT * FROM users WHERE id = 1").unwrap();
        assert_eq!(full, indexed);
    }

    #[test]
    fn test_create_index_backfills_and_stays_congruent() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);
        run(&mut engine, "CREATE INDEX idx_users_id ON users (id)").unwrap();

        run(&mut engine, "UPDATE users SET name = 'Bobby' WHERE id = 2").unwrap();
        run(&mut engine, "DELETE FROM users WHERE id = 1").unwrap();

        let result = run(&mut engine, "SELECT name FROM users WHERE id = 2").unwrap();
        assert_eq!(
            result.rows().unwrap().rows,
            vec![vec![Value::String("Bobby".to_string())]]
        );
        let result = run(&mut engine, "SELECT * FROM users WHERE id = 1").unwrap();
        assert!(result.rows().unwrap().rows.is_empty());
    }

    #[test]
    fn test_join_with_and_without_index() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);
        run(&mut engine, "CREATE TABLE orders (tid INTEGER, amt INTEGER)").unwrap();
        run(&mut engine, "INSERT INTO orders (tid, amt) VALUES (1, 10)").unwrap();
        run(&mut engine, "INSERT INTO orders (tid, amt) VALUES (2, 20)").unwrap();
        run(&mut engine, "INSERT INTO orders (tid, amt) VALUES (2, 25)").unwrap();

        let sql = "SELECT name, amt FROM users JOIN orders ON users.id = orders.tid";
        let plain = run(&mut engine, sql).unwrap();
        let mut rows = plain.rows().unwrap().rows.clone();
        rows.sort_by_key(|r| format!("{:?}", r));
        assert_eq!(rows.len(), 3);

        // The same query must return the same bag of rows through an index
        run(&mut engine, "CREATE INDEX idx_users_id ON users (id)").unwrap();
        let indexed = run(&mut engine, sql).unwrap();
        let mut indexed_rows = indexed.rows().unwrap().rows.clone();
        indexed_rows.sort_by_key(|r| format!("{:?}", r));
        assert_eq!(rows, indexed_rows);
    }

    #[test]
    fn test_join_columns_qualified_only_when_ambiguous() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        run(&mut engine, "CREATE TABLE a (id INTEGER, x INTEGER)").unwrap();
        run(&mut engine, "CREATE TABLE b (id INTEGER, y INTEGER)").unwrap();
        run(&mut engine, "INSERT INTO a (id, x) VALUES (1, 7)").unwrap();
        run(&mut engine, "INSERT INTO b (id, y) VALUES (1, 8)").unwrap();

        let result = run(&mut engine, "SELECT * FROM a JOIN b ON a.id = b.id").unwrap();
        assert_eq!(
            result.rows().unwrap().columns,
            vec!["a.id", "x", "b.id", "y"]
        );
    }

    #[test]
    fn test_unknown_table_and_column_errors() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine(&dir);
        setup_users(&mut engine);

        assert!(matches!(
            run(&mut engine, "SELECT * FROM missing"),
            Err(Error::TableNotFound(_))
        ));
        assert!(matches!(
            run(&mut engine, "SELECT nope FROM users"),
            Err(Error::ColumnNotFound(_, _))
        ));
        assert!(matches!(
            run(&mut engine, "INSERT INTO users (nope) VALUES (1)"),
            Err(Error::ColumnNotFound(_, _))
        ));
    }
}
