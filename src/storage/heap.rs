//! Heap table storage for FernDB
//!
//! Each table is an append-only log of line records plus two sidecar files:
//! a RID directory mapping every appended RID to its byte offset, and a
//! tombstone set of logically deleted RIDs. A row is live iff its RID is in
//! the directory and not in the tombstone set. Nothing is ever rewritten in
//! place; UPDATE and DELETE append.

use super::codec::{self, HeapRecord, Rid, Row};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// One line of the RID directory file
#[derive(Debug, Serialize, Deserialize)]
struct DirEntry {
    rid: Rid,
    offset: u64,
}

/// One line of the tombstone file
#[derive(Debug, Serialize, Deserialize)]
struct TombEntry {
    rid: Rid,
}

/// Handle around the three durable artifacts of one table
#[derive(Debug)]
pub struct HeapTable {
    name: String,
    data_path: PathBuf,
    data: File,
    dir_file: File,
    tomb_file: File,
    /// End-of-file offset of the heap; the offset of the next append
    data_len: u64,
    /// Directory entries in insertion order
    directory: Vec<(Rid, u64)>,
    offsets: HashMap<Rid, u64>,
    tombstones: HashSet<Rid>,
}

impl HeapTable {
    /// Open (creating if necessary) the heap files for a table
    pub fn open(db_dir: &Path, name: &str) -> Result<Self> {
        let data_dir = db_dir.join("data");
        std::fs::create_dir_all(&data_dir)?;

        let data_path = data_dir.join(format!("{}.jsonl", name));
        let dir_path = data_dir.join(format!("{}.dir", name));
        let tomb_path = data_dir.join(format!("{}.tomb", name));

        let data = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&data_path)?;
        let data_len = data.metadata()?.len();

        let mut directory = Vec::new();
        let mut offsets = HashMap::new();
        for line in read_lines(&dir_path)? {
            let entry: DirEntry =
                serde_json::from_str(&line).map_err(|e| Error::CorruptRecord {
                    path: dir_path.display().to_string(),
                    detail: e.to_string(),
                })?;
            directory.push((entry.rid, entry.offset));
            offsets.insert(entry.rid, entry.offset);
        }

        let mut tombstones = HashSet::new();
        for line in read_lines(&tomb_path)? {
            let entry: TombEntry =
                serde_json::from_str(&line).map_err(|e| Error::CorruptRecord {
                    path: tomb_path.display().to_string(),
                    detail: e.to_string(),
                })?;
            tombstones.insert(entry.rid);
        }

        let dir_file = OpenOptions::new().append(true).create(true).open(&dir_path)?;
        let tomb_file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&tomb_path)?;

        Ok(Self {
            name: name.to_string(),
            data_path,
            data,
            dir_file,
            tomb_file,
            data_len,
            directory,
            offsets,
            tombstones,
        })
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a row (with its RID already assigned) to the heap.
    ///
    /// The heap record is written and fsynced before the directory entry, so
    /// a crash in between leaves a record the directory never references.
    pub fn append_row(&mut self, row: &Row) -> Result<()> {
        let offset = self.data_len;
        let line = codec::encode_row(row);

        self.data.write_all(line.as_bytes())?;
        self.data.write_all(b"\n")?;
        self.data.sync_all()?;
        self.data_len += line.len() as u64 + 1;

        let entry = DirEntry {
            rid: row.rid(),
            offset,
        };
        let dir_line = serde_json::to_string(&entry).map_err(|e| Error::CorruptRecord {
            path: self.data_path.display().to_string(),
            detail: e.to_string(),
        })?;
        self.dir_file.write_all(dir_line.as_bytes())?;
        self.dir_file.write_all(b"\n")?;
        self.dir_file.sync_all()?;

        self.directory.push((row.rid(), offset));
        self.offsets.insert(row.rid(), offset);
        Ok(())
    }

    /// Retire a RID: append a tombstone marker to the heap and record the
    /// RID in the tombstone set
    pub fn append_tombstone(&mut self, rid: Rid) -> Result<()> {
        let line = codec::encode_tombstone(rid);
        self.data.write_all(line.as_bytes())?;
        self.data.write_all(b"\n")?;
        self.data.sync_all()?;
        self.data_len += line.len() as u64 + 1;

        let entry = TombEntry { rid };
        let tomb_line = serde_json::to_string(&entry).map_err(|e| Error::CorruptRecord {
            path: self.data_path.display().to_string(),
            detail: e.to_string(),
        })?;
        self.tomb_file.write_all(tomb_line.as_bytes())?;
        self.tomb_file.write_all(b"\n")?;
        self.tomb_file.sync_all()?;

        self.tombstones.insert(rid);
        Ok(())
    }

    /// Check whether a RID is live
    pub fn is_live(&self, rid: Rid) -> bool {
        self.offsets.contains_key(&rid) && !self.tombstones.contains(&rid)
    }

    /// Get a live row by RID. Returns None for RIDs that are absent,
    /// tombstoned, or whose stored record is a tombstone marker.
    pub fn get(&mut self, rid: Rid) -> Result<Option<Row>> {
        if self.tombstones.contains(&rid) {
            return Ok(None);
        }
        let offset = match self.offsets.get(&rid) {
            Some(offset) => *offset,
            None => return Ok(None),
        };
        match self.read_record_at(offset)? {
            HeapRecord::Row(row) => Ok(Some(row)),
            HeapRecord::Tombstone(_) => Ok(None),
        }
    }

    /// Scan all live rows in directory (insertion) order
    pub fn scan(&mut self) -> Result<Vec<Row>> {
        let entries: Vec<(Rid, u64)> = self
            .directory
            .iter()
            .filter(|(rid, _)| !self.tombstones.contains(rid))
            .copied()
            .collect();

        let mut rows = Vec::with_capacity(entries.len());
        for (_, offset) in entries {
            if let HeapRecord::Row(row) = self.read_record_at(offset)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Flush all three files
    pub fn sync(&mut self) -> Result<()> {
        self.data.sync_all()?;
        self.dir_file.sync_all()?;
        self.tomb_file.sync_all()?;
        Ok(())
    }

    /// Random-access read of one record given its byte offset
    fn read_record_at(&mut self, offset: u64) -> Result<HeapRecord> {
        self.data.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(&mut self.data);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        codec::decode_record(line.trim_end_matches('\n'), &self.data_path)
    }
}

/// Read the non-empty lines of a file, treating a missing file as empty
fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}
