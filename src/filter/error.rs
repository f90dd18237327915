//! Failures while turning constraints and query modifiers into SQL.
//!
//! These are programmer or configuration errors (a mapping naming a bad column, a handler
//! building an impossible constraint); the repository reports them as query errors.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    /// Only `=` and `<>` have a NULL form (`IS NULL`, `IS NOT NULL`)
    #[error("Cannot compare {column} with NULL using {operator}")]
    NullComparison { column: String, operator: &'static str },

    #[error("Limit must be non-negative, got {0}")]
    NegativeLimit(i64),
}
