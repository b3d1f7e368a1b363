//! Hash index storage for FernDB
//!
//! An index is a persisted mapping from a typed key encoding of a column
//! value to the set of RIDs currently holding that value. Keys keep the
//! value's type tag (see [`Value::index_key`]), so INTEGER 7 and STRING '7'
//! occupy different buckets. NULL is never stored; rows with a NULL indexed
//! column are simply not present in the index.

use super::codec::Rid;
use super::value::Value;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// On-disk document for one index
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: HashMap<String, Vec<Rid>>,
}

/// A persisted equality index over a single column
#[derive(Debug)]
pub struct HashIndex {
    name: String,
    path: PathBuf,
    entries: HashMap<String, Vec<Rid>>,
}

impl HashIndex {
    /// Open an index document, starting empty if the file does not exist
    pub fn open(db_dir: &Path, name: &str) -> Result<Self> {
        let index_dir = db_dir.join("indexes");
        std::fs::create_dir_all(&index_dir)?;
        let path = index_dir.join(format!("{}.json", name));

        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let file: IndexFile =
                serde_json::from_str(&raw).map_err(|e| Error::CorruptRecord {
                    path: path.display().to_string(),
                    detail: e.to_string(),
                })?;
            file.entries
        } else {
            HashMap::new()
        };

        Ok(Self {
            name: name.to_string(),
            path,
            entries,
        })
    }

    /// Create a fresh, empty index, ignoring any stale document left on disk
    /// by an interrupted CREATE INDEX
    pub fn create(db_dir: &Path, name: &str) -> Result<Self> {
        let index_dir = db_dir.join("indexes");
        std::fs::create_dir_all(&index_dir)?;
        Ok(Self {
            name: name.to_string(),
            path: index_dir.join(format!("{}.json", name)),
            entries: HashMap::new(),
        })
    }

    /// Get the index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record that `rid` holds `key` in the indexed column. NULL keys are
    /// never stored.
    pub fn insert(&mut self, key: &Value, rid: Rid) {
        if let Some(encoded) = key.index_key() {
            let postings = self.entries.entry(encoded).or_default();
            if !postings.contains(&rid) {
                postings.push(rid);
            }
        }
    }

    /// Remove one (key, rid) posting. Dropping the last posting removes the
    /// bucket entirely.
    pub fn remove(&mut self, key: &Value, rid: Rid) {
        if let Some(encoded) = key.index_key() {
            if let Some(postings) = self.entries.get_mut(&encoded) {
                postings.retain(|r| *r != rid);
                if postings.is_empty() {
                    self.entries.remove(&encoded);
                }
            }
        }
    }

    /// RIDs currently indexing `key`, in ascending order. NULL looks up
    /// nothing.
    pub fn lookup(&self, key: &Value) -> Vec<Rid> {
        let mut rids = match key.index_key() {
            Some(encoded) => self.entries.get(&encoded).cloned().unwrap_or_default(),
            None => Vec::new(),
        };
        rids.sort_unstable();
        rids
    }

    /// Check whether any RID indexes `key` (uniqueness probe)
    pub fn contains(&self, key: &Value) -> bool {
        match key.index_key() {
            Some(encoded) => self.entries.contains_key(&encoded),
            None => false,
        }
    }

    /// Rewrite the index document atomically (write temp, rename)
    pub fn save(&self) -> Result<()> {
        let file = IndexFile {
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| Error::CorruptRecord {
            path: self.path.display().to_string(),
            detail: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insert_lookup_remove() {
        let dir = TempDir::new().unwrap();
        let mut index = HashIndex::open(dir.path(), "idx_t_id").unwrap();

        index.insert(&Value::Integer(7), 1);
        index.insert(&Value::Integer(7), 3);
        index.insert(&Value::String("7".to_string()), 2);

        assert_eq!(index.lookup(&Value::Integer(7)), vec![1, 3]);
        assert_eq!(index.lookup(&Value::String("7".to_string())), vec![2]);
        assert!(index.contains(&Value::Integer(7)));

        index.remove(&Value::Integer(7), 1);
        assert_eq!(index.lookup(&Value::Integer(7)), vec![3]);
        index.remove(&Value::Integer(7), 3);
        assert!(!index.contains(&Value::Integer(7)));
    }

    #[test]
    fn test_null_is_never_stored() {
        let dir = TempDir::new().unwrap();
        let mut index = HashIndex::open(dir.path(), "idx_u_x").unwrap();

        index.insert(&Value::Null, 1);
        assert!(!index.contains(&Value::Null));
        assert!(index.lookup(&Value::Null).is_empty());
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut index = HashIndex::open(dir.path(), "idx_t_id").unwrap();
            index.insert(&Value::Integer(1), 10);
            index.insert(&Value::Boolean(true), 11);
            index.save().unwrap();
        }

        let index = HashIndex::open(dir.path(), "idx_t_id").unwrap();
        assert_eq!(index.lookup(&Value::Integer(1)), vec![10]);
        assert_eq!(index.lookup(&Value::Boolean(true)), vec![11]);
    }
}
