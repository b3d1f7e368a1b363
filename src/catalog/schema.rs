//! Schema definitions for FernDB
//!
//! This module defines table and index metadata as stored in the catalog.

use super::types::DataType;
use crate::storage::Rid;
use serde::{Deserialize, Serialize};

/// Column definition in a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name (case-sensitive)
    pub name: String,
    /// Declared data type
    pub data_type: DataType,
    /// NOT NULL constraint
    #[serde(default)]
    pub not_null: bool,
    /// UNIQUE constraint
    #[serde(default)]
    pub unique: bool,
    /// PRIMARY KEY constraint (implies NOT NULL and UNIQUE at enforcement)
    #[serde(default)]
    pub primary_key: bool,
}

impl Column {
    /// Create a new column with no constraints
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
            unique: false,
            primary_key: false,
        }
    }

    /// Set the NOT NULL flag
    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    /// Set the UNIQUE flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set the PRIMARY KEY flag
    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// NULL is forbidden here (NOT NULL, or PRIMARY KEY which implies it)
    pub fn requires_non_null(&self) -> bool {
        self.not_null || self.primary_key
    }

    /// Non-NULL values must be unique here (UNIQUE, or PRIMARY KEY)
    pub fn requires_unique(&self) -> bool {
        self.unique || self.primary_key
    }
}

fn first_rid() -> Rid {
    1
}

/// Table metadata: name, ordered columns and the RID allocation counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    /// Table name
    pub name: String,
    /// Ordered column list
    pub columns: Vec<Column>,
    /// Next RID to hand out; strictly exceeds every RID ever issued
    #[serde(default = "first_rid")]
    pub next_rid: Rid,
}

impl TableMeta {
    /// Create table metadata with a fresh RID counter
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            next_rid: first_rid(),
        }
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Declared column names, in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The PRIMARY KEY column, if one was declared
    pub fn primary_key_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// Index metadata: a named single-column equality index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Index name (globally unique)
    pub name: String,
    /// Table this index belongs to
    pub table: String,
    /// Indexed column
    pub column: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_implies_constraints() {
        let col = Column::new("id", DataType::Integer).primary_key(true);
        assert!(col.requires_non_null());
        assert!(col.requires_unique());
        assert!(!col.not_null);
    }

    #[test]
    fn test_table_meta_lookup() {
        let table = TableMeta::new(
            "users",
            vec![
                Column::new("id", DataType::Integer).primary_key(true),
                Column::new("name", DataType::Varchar(100)).not_null(true),
            ],
        );

        assert!(table.has_column("id"));
        assert!(!table.has_column("unknown"));
        assert_eq!(table.primary_key_column().unwrap().name, "id");
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.next_rid, 1);
    }
}
