//! Validation failure taxonomy. Every variant names the check and the column
//! that tripped it so a failed run says exactly what was wrong with the table.

use arrow::error::ArrowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("column `{column}` is missing")]
    MissingColumn { column: String },

    #[error("column `{column}` is {actual}, expected {expected}")]
    WrongType {
        column: String,
        expected: &'static str,
        actual: String,
    },

    #[error("column `{column}` has {count} null values")]
    Nulls { column: String, count: usize },

    #[error("duplicate key {key:?} on ({columns})")]
    Duplicate { columns: String, key: Vec<String> },

    #[error("expected at least {min} rows, got {actual}")]
    TooFewRows { min: usize, actual: usize },

    #[error("column `{column}` has invalid year `{value}` (allowed {min}..={max})")]
    InvalidYear {
        column: String,
        value: String,
        min: u16,
        max: u16,
    },

    #[error("column `{column}` has values {actual:?}, expected exactly {expected:?}")]
    UnexpectedValueSet {
        column: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("column `{column}` is missing required values {missing:?}")]
    MissingValues { column: String, missing: Vec<String> },

    #[error("column `{column}` contains none of {candidates:?}")]
    NoneOf {
        column: String,
        candidates: Vec<String>,
    },

    #[error("column `{column}` is not strictly positive (min {min})")]
    NotPositive { column: String, min: i64 },

    #[error("column `{column}` has no values")]
    AllNull { column: String },

    #[error("column `{column}` has value `{value}` outside {allowed:?}")]
    NotInSet {
        column: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("`{lower}` <= `{upper}` fails (or is null) in {count} rows")]
    OrderViolated {
        lower: String,
        upper: String,
        count: usize,
    },

    #[error("column `{column}` has {actual} distinct values, expected at least {min}")]
    TooFewDistinct {
        column: String,
        min: usize,
        actual: usize,
    },

    #[error("column `{column}` value `{value}` does not match {shape}")]
    BadIdentifier {
        column: String,
        value: String,
        shape: String,
    },

    #[error("invalid identifier pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}
