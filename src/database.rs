//! Database facade for FernDB
//!
//! The single entry point an embedding program uses: open a database
//! directory, submit statement text, receive row sets or acknowledgements.
//! One handle owns all file descriptors for its directory; sharing a handle
//! across threads requires external mutual exclusion by the embedder.

use crate::error::Result;
use crate::executor::{ExecutionEngine, StatementResult};
use crate::sql::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

/// An open database
pub struct Database {
    root: PathBuf,
    engine: ExecutionEngine,
}

impl Database {
    /// Open a database directory, creating it (with an empty catalog) on
    /// first open
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let engine = ExecutionEngine::new(&root)?;
        info!(path = %root.display(), "opened database");
        Ok(Self { root, engine })
    }

    /// Execute a statement, or a script of `;`-separated statements. With a
    /// script, the last statement's result is returned.
    pub fn execute(&mut self, sql: &str) -> Result<StatementResult> {
        let mut results = self.execute_all(sql)?;
        results
            .pop()
            .ok_or_else(|| crate::error::Error::ParseError("empty input".to_string()))
    }

    /// Execute a script of `;`-separated statements, returning every
    /// statement's result in order. Empty scripts are a parse error.
    pub fn execute_all(&mut self, sql: &str) -> Result<Vec<StatementResult>> {
        let statements = Parser::new(sql)?.parse_script()?;
        let mut results = Vec::with_capacity(statements.len());
        for stmt in statements {
            results.push(self.engine.execute(stmt)?);
        }
        Ok(results)
    }

    /// Flush open files and release the handle
    pub fn close(mut self) -> Result<()> {
        self.engine.sync()?;
        info!(path = %self.root.display(), "closed database");
        Ok(())
    }
}
