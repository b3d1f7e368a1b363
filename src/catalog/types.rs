//! Data types for FernDB
//!
//! This module defines the SQL data types supported by the database.

use crate::storage::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL Data Types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer
    Integer,
    /// Variable-length character string with max length
    Varchar(usize),
    /// Unlimited text
    Text,
    /// Date, stored as an ISO string and not interpreted
    Date,
    /// Boolean type
    Boolean,
}

impl DataType {
    /// Check whether a non-NULL value matches this declared type. The engine
    /// never coerces; a mismatch is a type error at the call site.
    ///
    /// NULL matches every type here; nullability is a constraint, not a type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Integer, Value::Integer(_)) => true,
            (DataType::Varchar(_), Value::String(_)) => true,
            (DataType::Text, Value::String(_)) => true,
            (DataType::Date, Value::String(_)) => true,
            (DataType::Boolean, Value::Boolean(_)) => true,
            _ => false,
        }
    }

    /// The VARCHAR length limit, if this is a VARCHAR type
    pub fn varchar_limit(&self) -> Option<usize> {
        match self {
            DataType::Varchar(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::Text => write!(f, "TEXT"),
            DataType::Date => write!(f, "DATE"),
            DataType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_atoms() {
        assert!(DataType::Integer.accepts(&Value::Integer(1)));
        assert!(DataType::Text.accepts(&Value::String("x".into())));
        assert!(DataType::Date.accepts(&Value::String("2024-01-01".into())));
        assert!(DataType::Boolean.accepts(&Value::Boolean(true)));
        assert!(DataType::Varchar(5).accepts(&Value::String("abc".into())));
    }

    #[test]
    fn test_rejects_mismatched_atoms() {
        assert!(!DataType::Integer.accepts(&Value::String("1".into())));
        assert!(!DataType::Text.accepts(&Value::Integer(1)));
        assert!(!DataType::Boolean.accepts(&Value::Integer(1)));
    }

    #[test]
    fn test_null_is_every_type() {
        assert!(DataType::Integer.accepts(&Value::Null));
        assert!(DataType::Boolean.accepts(&Value::Null));
    }
}
