//! System Catalog for FernDB
//!
//! The catalog is the single durable document describing every table (with
//! columns, constraints and the per-table RID counter) and every index. It
//! is loaded when the database opens and rewritten atomically (write temp
//! file, rename) after every DDL statement and every RID allocation.

use super::schema::{Column, IndexMeta, TableMeta};
use crate::error::{Error, Result};
use crate::storage::Rid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const CATALOG_FILE: &str = "catalog.json";

/// System catalog: all schema metadata for one database directory
#[derive(Debug, Serialize, Deserialize)]
pub struct Catalog {
    version: u32,
    tables: BTreeMap<String, TableMeta>,
    indexes: BTreeMap<String, IndexMeta>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn empty() -> Self {
        Self {
            version: 1,
            tables: BTreeMap::new(),
            indexes: BTreeMap::new(),
        }
    }

    /// Load the catalog document, or an empty catalog on first open
    pub fn load(db_dir: &Path) -> Result<Self> {
        let path = db_dir.join(CATALOG_FILE);
        if !path.exists() {
            return Ok(Self::empty());
        }

        let raw = std::fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|e| Error::CorruptRecord {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Rewrite the catalog document atomically
    pub fn save(&self, db_dir: &Path) -> Result<()> {
        let path = db_dir.join(CATALOG_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::CorruptRecord {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        let tmp = db_dir.join(format!("{}.tmp", CATALOG_FILE));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Register a new table after validating its definition
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(Error::DuplicateColumn(col.name.clone(), name.to_string()));
            }
        }

        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(Error::MultiplePrimaryKeys(name.to_string()));
        }

        self.tables
            .insert(name.to_string(), TableMeta::new(name, columns));
        Ok(())
    }

    /// Register a new index after validating name, table and column
    pub fn create_index(&mut self, name: &str, table: &str, column: &str) -> Result<()> {
        if self.indexes.contains_key(name) {
            return Err(Error::IndexAlreadyExists(name.to_string()));
        }

        let meta = self.table(table)?;
        if !meta.has_column(column) {
            return Err(Error::ColumnNotFound(
                column.to_string(),
                table.to_string(),
            ));
        }

        self.indexes.insert(
            name.to_string(),
            IndexMeta {
                name: name.to_string(),
                table: table.to_string(),
                column: column.to_string(),
            },
        );
        Ok(())
    }

    /// Get table metadata by name
    pub fn table(&self, name: &str) -> Result<&TableMeta> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Check if an index exists
    pub fn index_exists(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Get index metadata by name
    pub fn index(&self, name: &str) -> Option<&IndexMeta> {
        self.indexes.get(name)
    }

    /// All indexes declared on a table
    pub fn indexes_for(&self, table: &str) -> Vec<&IndexMeta> {
        self.indexes
            .values()
            .filter(|idx| idx.table == table)
            .collect()
    }

    /// The index on a specific column, if one exists
    pub fn index_on(&self, table: &str, column: &str) -> Option<&IndexMeta> {
        self.indexes
            .values()
            .find(|idx| idx.table == table && idx.column == column)
    }

    /// Hand out the next RID for a table and advance the counter. The caller
    /// persists the catalog before writing the row, so a crash in between
    /// burns the RID rather than reusing it.
    pub fn allocate_rid(&mut self, table: &str) -> Result<Rid> {
        let meta = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        let rid = meta.next_rid;
        meta.next_rid += 1;
        Ok(rid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use tempfile::TempDir;

    fn users_columns() -> Vec<Column> {
        vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("email", DataType::Varchar(255)).unique(true),
        ]
    }

    #[test]
    fn test_create_and_get_table() {
        let mut catalog = Catalog::empty();
        catalog.create_table("users", users_columns()).unwrap();

        let table = catalog.table("users").unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(matches!(
            catalog.table("missing"),
            Err(Error::TableNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut catalog = Catalog::empty();
        catalog.create_table("users", users_columns()).unwrap();
        assert!(matches!(
            catalog.create_table("users", users_columns()),
            Err(Error::TableAlreadyExists(_))
        ));
    }

    #[test]
    fn test_multiple_primary_keys_rejected() {
        let mut catalog = Catalog::empty();
        let columns = vec![
            Column::new("a", DataType::Integer).primary_key(true),
            Column::new("b", DataType::Integer).primary_key(true),
        ];
        assert!(matches!(
            catalog.create_table("t", columns),
            Err(Error::MultiplePrimaryKeys(_))
        ));
    }

    #[test]
    fn test_create_index_validation() {
        let mut catalog = Catalog::empty();
        catalog.create_table("users", users_columns()).unwrap();

        catalog.create_index("idx_users_email", "users", "email").unwrap();
        assert!(matches!(
            catalog.create_index("idx_users_email", "users", "id"),
            Err(Error::IndexAlreadyExists(_))
        ));
        assert!(matches!(
            catalog.create_index("idx2", "users", "missing"),
            Err(Error::ColumnNotFound(_, _))
        ));
        assert!(matches!(
            catalog.create_index("idx3", "missing", "id"),
            Err(Error::TableNotFound(_))
        ));

        assert!(catalog.index("idx_users_email").is_some());
        assert!(catalog.index_on("users", "email").is_some());
        assert!(catalog.index_on("users", "id").is_none());
        assert_eq!(catalog.indexes_for("users").len(), 1);
    }

    #[test]
    fn test_allocate_rid_is_monotonic() {
        let mut catalog = Catalog::empty();
        catalog.create_table("users", users_columns()).unwrap();

        assert_eq!(catalog.allocate_rid("users").unwrap(), 1);
        assert_eq!(catalog.allocate_rid("users").unwrap(), 2);
        assert_eq!(catalog.table("users").unwrap().next_rid, 3);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut catalog = Catalog::empty();
        catalog.create_table("users", users_columns()).unwrap();
        catalog.create_index("idx_users_email", "users", "email").unwrap();
        catalog.allocate_rid("users").unwrap();
        catalog.save(dir.path()).unwrap();

        let loaded = Catalog::load(dir.path()).unwrap();
        assert!(loaded.table_exists("users"));
        assert_eq!(loaded.table("users").unwrap().next_rid, 2);
        assert!(loaded.index_on("users", "email").is_some());
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::load(dir.path()).unwrap();
        assert!(!catalog.table_exists("users"));
    }
}
