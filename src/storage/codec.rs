//! Row codec for FernDB
//!
//! Rows are stored as self-describing JSON objects, one per LF-terminated
//! line. JSON's scalar types carry the value tags on the wire, so INTEGER 1,
//! STRING '1', TRUE and NULL all round-trip distinctly. Fields starting with
//! an underscore are reserved for the engine; unknown fields are ignored on
//! decode for forward compatibility.

use super::value::Value;
use crate::error::{Error, Result};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::Path;

/// Record identifier: monotonic per table, never reused
pub type Rid = u64;

static NULL: Value = Value::Null;

/// A row in memory: a RID plus a mapping from column name to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    rid: Rid,
    values: HashMap<String, Value>,
}

impl Row {
    /// Create an empty row with the given RID
    pub fn new(rid: Rid) -> Self {
        Self {
            rid,
            values: HashMap::new(),
        }
    }

    /// Get the row's RID
    pub fn rid(&self) -> Rid {
        self.rid
    }

    /// Assign the row's RID (done once, when the executor allocates it)
    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = rid;
    }

    /// Set a column value
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Get a column value; absent columns read as NULL
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }

    /// All stored column values
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

/// A decoded heap record: either a row or a tombstone marker
#[derive(Debug, Clone, PartialEq)]
pub enum HeapRecord {
    Row(Row),
    Tombstone(Rid),
}

/// Encode a row as a single JSON line (no trailing newline)
pub fn encode_row(row: &Row) -> String {
    let mut map = Map::new();
    map.insert("_rid".to_string(), json!(row.rid()));

    // Sort columns so the encoding is deterministic across runs
    let mut names: Vec<&String> = row.values().keys().collect();
    names.sort();
    for name in names {
        map.insert(name.clone(), value_to_json(row.get(name)));
    }

    JsonValue::Object(map).to_string()
}

/// Encode a tombstone marker for the given RID
pub fn encode_tombstone(rid: Rid) -> String {
    json!({ "_op": "DELETE", "_rid": rid }).to_string()
}

/// Decode one heap line into a row or tombstone marker
pub fn decode_record(line: &str, path: &Path) -> Result<HeapRecord> {
    let corrupt = |detail: String| Error::CorruptRecord {
        path: path.display().to_string(),
        detail,
    };

    let parsed: JsonValue =
        serde_json::from_str(line).map_err(|e| corrupt(e.to_string()))?;
    let map = parsed
        .as_object()
        .ok_or_else(|| corrupt("record is not a JSON object".to_string()))?;

    let rid = map
        .get("_rid")
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| corrupt("record has no _rid".to_string()))?;

    if map.get("_op").and_then(JsonValue::as_str) == Some("DELETE") {
        return Ok(HeapRecord::Tombstone(rid));
    }

    let mut row = Row::new(rid);
    for (name, raw) in map {
        if name.starts_with('_') {
            continue;
        }
        row.set(name.clone(), value_from_json(raw).map_err(&corrupt)?);
    }
    Ok(HeapRecord::Row(row))
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => json!(b),
        Value::Integer(i) => json!(i),
        Value::String(s) => json!(s),
    }
}

fn value_from_json(raw: &JsonValue) -> std::result::Result<Value, String> {
    match raw {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| format!("non-integer number {}", n)),
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        other => Err(format!("unsupported field value {}", other)),
    }
}
