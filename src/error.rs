//! Error types for FernDB
//!
//! This module defines all error types used throughout the database engine.

use crate::storage::Value;
use thiserror::Error;

/// The main error type for FernDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lex error: unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedCharacter { ch: char, line: u32, column: u32 },

    #[error("Lex error: unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: u32, column: u32 },

    #[error("Lex error: invalid integer literal at line {line}, column {column}")]
    InvalidInteger { line: u32, column: u32 },

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Catalog error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Catalog error: column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Catalog error: duplicate column '{0}' in table '{1}'")]
    DuplicateColumn(String, String),

    #[error("Catalog error: index '{0}' already exists")]
    IndexAlreadyExists(String),

    #[error("Catalog error: table '{0}' declares more than one PRIMARY KEY column")]
    MultiplePrimaryKeys(String),

    #[error("Catalog error: ambiguous column reference '{0}'")]
    AmbiguousColumn(String),

    #[error("Catalog error: JOIN ON clause must relate table '{0}' to an earlier table")]
    InvalidJoinCondition(String),

    // ========== Type Errors ==========
    #[error("Type error: column '{table}.{column}' expects {expected}, got {value}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        value: Value,
    },

    #[error("Type error: value for '{table}.{column}' exceeds VARCHAR({limit})")]
    VarcharOverflow {
        table: String,
        column: String,
        limit: usize,
    },

    // ========== Constraint Errors ==========
    #[error("Constraint violation: NOT NULL column '{table}.{column}' is NULL")]
    NotNullViolation { table: String, column: String },

    #[error("Constraint violation: duplicate PRIMARY KEY value {value} for '{table}.{column}'")]
    PrimaryKeyViolation {
        table: String,
        column: String,
        value: Value,
    },

    #[error("Constraint violation: duplicate UNIQUE value {value} for '{table}.{column}'")]
    UniqueViolation {
        table: String,
        column: String,
        value: Value,
    },

    // ========== Storage Errors ==========
    #[error("Storage error: corrupt record in '{path}': {detail}")]
    CorruptRecord { path: String, detail: String },

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ========== Unsupported Statements ==========
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for FernDB operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("users".to_string());
        assert_eq!(err.to_string(), "Catalog error: table 'users' not found");

        let err = Error::UnexpectedCharacter {
            ch: '@',
            line: 1,
            column: 5,
        };
        assert_eq!(
            err.to_string(),
            "Lex error: unexpected character '@' at line 1, column 5"
        );
    }

    #[test]
    fn test_constraint_error_carries_value() {
        let err = Error::PrimaryKeyViolation {
            table: "t".to_string(),
            column: "id".to_string(),
            value: Value::Integer(1),
        };
        assert_eq!(
            err.to_string(),
            "Constraint violation: duplicate PRIMARY KEY value 1 for 't.id'"
        );
    }
}
