//! Fail-fast gatekeeping over a finished table.
//!
//! The pipeline is fixed: schema, not-null, uniqueness, row floor, then the
//! plan's domain checks in declaration order. The first failure stops the run;
//! nothing here ever repairs data.

pub mod error;
pub mod plan;

pub use error::ValidationError;
pub use plan::{ColumnKind, DomainCheck, ValidationPlan};

use arrow::{
    array::{Array, ArrayRef, AsArray, Int64Array, StringArray},
    compute::{self, kernels::cmp::lt_eq},
    datatypes::{DataType, Int64Type},
    record_batch::RecordBatch,
    util::display::array_value_to_string,
};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, instrument};

/// Summary of a passing validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub dataset: String,
    pub rows: usize,
    /// `(column, distinct count)` when the plan asks for one.
    pub distinct: Option<(String, usize)>,
}

type Checked<T> = std::result::Result<T, ValidationError>;

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Checked<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ValidationError::MissingColumn {
            column: name.to_string(),
        })
}

fn text_column<'a>(batch: &'a RecordBatch, name: &str) -> Checked<&'a StringArray> {
    let col = column(batch, name)?;
    col.as_string_opt::<i32>()
        .ok_or_else(|| ValidationError::WrongType {
            column: name.to_string(),
            expected: ColumnKind::String.as_str(),
            actual: col.data_type().to_string(),
        })
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> Checked<&'a Int64Array> {
    let col = column(batch, name)?;
    col.as_primitive_opt::<Int64Type>()
        .ok_or_else(|| ValidationError::WrongType {
            column: name.to_string(),
            expected: ColumnKind::Int.as_str(),
            actual: col.data_type().to_string(),
        })
}

fn distinct_text(arr: &StringArray) -> BTreeSet<&str> {
    arr.iter().flatten().collect()
}

fn distinct_count(batch: &RecordBatch, name: &str) -> Checked<usize> {
    let col = column(batch, name)?;
    if let Some(arr) = col.as_string_opt::<i32>() {
        return Ok(distinct_text(arr).len());
    }
    let arr = int_column(batch, name)?;
    Ok(arr.iter().flatten().collect::<HashSet<i64>>().len())
}

fn check_schema(batch: &RecordBatch, columns: &[(String, ColumnKind)]) -> Checked<()> {
    for (name, kind) in columns {
        let dt = column(batch, name)?.data_type();
        let ok = match kind {
            ColumnKind::String => matches!(dt, DataType::Utf8 | DataType::LargeUtf8),
            ColumnKind::Int => dt.is_integer(),
        };
        if !ok {
            return Err(ValidationError::WrongType {
                column: name.clone(),
                expected: kind.as_str(),
                actual: dt.to_string(),
            });
        }
    }
    Ok(())
}

fn check_not_null(batch: &RecordBatch, columns: &[String]) -> Checked<()> {
    for name in columns {
        let count = column(batch, name)?.null_count();
        if count > 0 {
            return Err(ValidationError::Nulls {
                column: name.clone(),
                count,
            });
        }
    }
    Ok(())
}

fn check_unique(batch: &RecordBatch, columns: &[String]) -> Checked<()> {
    if columns.is_empty() {
        return Ok(());
    }
    let cols = columns
        .iter()
        .map(|c| column(batch, c))
        .collect::<Checked<Vec<_>>>()?;

    let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let key = cols
            .iter()
            .map(|c| array_value_to_string(c, row))
            .collect::<Result<Vec<_>, _>>()?;
        if seen.contains(&key) {
            return Err(ValidationError::Duplicate {
                columns: columns.join(", "),
                key,
            });
        }
        seen.insert(key);
    }
    Ok(())
}

fn is_valid_year(value: &str, min: u16, max: u16) -> bool {
    value.len() == 4
        && value.bytes().all(|b| b.is_ascii_digit())
        && value
            .parse::<u16>()
            .map(|y| (min..=max).contains(&y))
            .unwrap_or(false)
}

fn run_check(batch: &RecordBatch, check: &DomainCheck) -> Checked<()> {
    match check {
        DomainCheck::ValidYear { column, min, max } => {
            let values = distinct_text(text_column(batch, column)?);
            if let Some(bad) = values.into_iter().find(|v| !is_valid_year(v, *min, *max)) {
                return Err(ValidationError::InvalidYear {
                    column: column.clone(),
                    value: bad.to_string(),
                    min: *min,
                    max: *max,
                });
            }
        }
        DomainCheck::ExactSet { column, values } => {
            let actual = distinct_text(text_column(batch, column)?);
            let expected: BTreeSet<&str> = values.iter().map(String::as_str).collect();
            if actual != expected {
                return Err(ValidationError::UnexpectedValueSet {
                    column: column.clone(),
                    expected: expected.into_iter().map(str::to_string).collect(),
                    actual: actual.into_iter().map(str::to_string).collect(),
                });
            }
        }
        DomainCheck::ContainsAll { column, values } => {
            let actual = distinct_text(text_column(batch, column)?);
            let missing: Vec<String> = values
                .iter()
                .filter(|v| !actual.contains(v.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(ValidationError::MissingValues {
                    column: column.clone(),
                    missing,
                });
            }
        }
        DomainCheck::ContainsAny { column, values } => {
            let actual = distinct_text(text_column(batch, column)?);
            if !values.iter().any(|v| actual.contains(v.as_str())) {
                return Err(ValidationError::NoneOf {
                    column: column.clone(),
                    candidates: values.clone(),
                });
            }
        }
        DomainCheck::Positive { column } => {
            let arr = int_column(batch, column)?;
            match compute::min(arr) {
                Some(min) if min <= 0 => {
                    return Err(ValidationError::NotPositive {
                        column: column.clone(),
                        min,
                    });
                }
                Some(_) => {}
                None if arr.is_empty() => {}
                None => {
                    return Err(ValidationError::AllNull {
                        column: column.clone(),
                    })
                }
            }
        }
        DomainCheck::InTextSet { column, values } => {
            let actual = distinct_text(text_column(batch, column)?);
            if let Some(bad) = actual.into_iter().find(|v| !values.iter().any(|a| a.as_str() == *v)) {
                return Err(ValidationError::NotInSet {
                    column: column.clone(),
                    value: bad.to_string(),
                    allowed: values.clone(),
                });
            }
        }
        DomainCheck::InIntSet { column, values } => {
            let actual: BTreeSet<i64> = int_column(batch, column)?.iter().flatten().collect();
            if let Some(bad) = actual.into_iter().find(|v| !values.contains(v)) {
                return Err(ValidationError::NotInSet {
                    column: column.clone(),
                    value: bad.to_string(),
                    allowed: values.iter().map(i64::to_string).collect(),
                });
            }
        }
        DomainCheck::Ordered { columns } => {
            for pair in columns.windows(2) {
                let lower = int_column(batch, &pair[0])?;
                let upper = int_column(batch, &pair[1])?;
                let holds = lt_eq(lower, upper)?;
                // a null on either side is a violation too
                let count = holds.len() - holds.true_count();
                if count > 0 {
                    return Err(ValidationError::OrderViolated {
                        lower: pair[0].clone(),
                        upper: pair[1].clone(),
                        count,
                    });
                }
            }
        }
        DomainCheck::MinDistinct { column, min } => {
            let actual = distinct_count(batch, column)?;
            if actual < *min {
                return Err(ValidationError::TooFewDistinct {
                    column: column.clone(),
                    min: *min,
                    actual,
                });
            }
        }
        DomainCheck::IdentifierShape {
            column,
            pattern,
            min_len,
            sample,
        } => {
            let re = Regex::new(pattern).map_err(|source| ValidationError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            let arr = text_column(batch, column)?;
            for value in arr.iter().flatten().take(*sample) {
                if value.len() < *min_len || !re.is_match(value) {
                    return Err(ValidationError::BadIdentifier {
                        column: column.clone(),
                        value: value.to_string(),
                        shape: pattern.clone(),
                    });
                }
            }
        }
    }
    debug!(check = ?check, "passed");
    Ok(())
}

/// Run `plan` against `batch`, stopping at the first failing check.
#[instrument(level = "info", skip_all, fields(dataset = %plan.dataset, rows = batch.num_rows()))]
pub fn validate(batch: &RecordBatch, plan: &ValidationPlan) -> Checked<ValidationReport> {
    check_schema(batch, &plan.columns)?;
    check_not_null(batch, &plan.not_null)?;
    check_unique(batch, &plan.unique)?;
    if batch.num_rows() < plan.min_rows {
        return Err(ValidationError::TooFewRows {
            min: plan.min_rows,
            actual: batch.num_rows(),
        });
    }
    for check in &plan.checks {
        run_check(batch, check)?;
    }

    let distinct = match &plan.summarize_distinct {
        Some(c) => Some((c.clone(), distinct_count(batch, c)?)),
        None => None,
    };
    match &distinct {
        Some((c, n)) => info!(
            rows = batch.num_rows(),
            column = %c,
            distinct = n,
            "validated {} records",
            plan.dataset
        ),
        None => info!(rows = batch.num_rows(), "validated {} records", plan.dataset),
    }

    Ok(ValidationReport {
        dataset: plan.dataset.clone(),
        rows: batch.num_rows(),
        distinct,
    })
}
