//! FernDB - An embedded relational database engine written in Rust
//!
//! This library provides the core components of a small SQL database:
//! - SQL parsing (lexer, parser, AST)
//! - Storage engine (append-only heap tables, RID directory, tombstones)
//! - Persisted equality hash indexes
//! - Query execution (planning, constraint enforcement, equi-joins)
//! - System catalog
//!
//! A host program opens a database directory and submits statement text:
//!
//! ```no_run
//! use ferndb::Database;
//!
//! let mut db = Database::open("my.db").unwrap();
//! db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)").unwrap();
//! db.execute("INSERT INTO t (id, name) VALUES (1, 'a')").unwrap();
//! let result = db.execute("SELECT * FROM t WHERE id = 1").unwrap();
//! ```
//!
//! The engine is not thread-safe; callers sharing a handle across threads
//! must serialize calls to `execute` themselves.

pub mod catalog;
pub mod database;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use database::Database;
pub use error::{Error, Result};
pub use executor::{Ack, AckKind, RowSet, StatementResult};
pub use storage::{Rid, Row, Value};
