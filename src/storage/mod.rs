//! Storage engine module
//!
//! This module contains the storage engine components:
//! - Tagged values and the line-record row codec
//! - Heap tables (append-only log + RID directory + tombstone set)
//! - Persisted equality hash indexes

pub mod codec;
pub mod heap;
pub mod index;
pub mod value;

pub use codec::{HeapRecord, Rid, Row};
pub use heap::HeapTable;
pub use index::HashIndex;
pub use value::Value;
