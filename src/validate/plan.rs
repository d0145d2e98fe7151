use chrono::{Datelike, Utc};

use crate::schema::{FieldType, TableSchema};

/// Semantic type a column must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    String,
    Int,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::String => "string",
            ColumnKind::Int => "int",
        }
    }
}

impl From<FieldType> for ColumnKind {
    fn from(ty: FieldType) -> Self {
        if ty.is_string() {
            ColumnKind::String
        } else {
            ColumnKind::Int
        }
    }
}

/// Format-specific checks run after the structural ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainCheck {
    /// Four ASCII digits within `min..=max`.
    ValidYear { column: String, min: u16, max: u16 },
    /// Distinct values equal this set exactly.
    ExactSet { column: String, values: Vec<String> },
    /// Every listed value occurs at least once.
    ContainsAll { column: String, values: Vec<String> },
    /// At least one listed value occurs.
    ContainsAny { column: String, values: Vec<String> },
    /// Integer column with every non-null value > 0.
    Positive { column: String },
    /// String column restricted to a finite set.
    InTextSet { column: String, values: Vec<String> },
    /// Integer column restricted to a finite set.
    InIntSet { column: String, values: Vec<i64> },
    /// `columns[0] <= columns[1] <= ...` for every row.
    Ordered { columns: Vec<String> },
    /// At least `min` distinct non-null values.
    MinDistinct { column: String, min: usize },
    /// The first `sample` values are at least `min_len` long and match `pattern`.
    IdentifierShape {
        column: String,
        pattern: String,
        min_len: usize,
        sample: usize,
    },
}

fn strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl DomainCheck {
    /// Year check with the default range 1900..=(next calendar year).
    pub fn valid_year(column: &str) -> Self {
        let next = (Utc::now().year() + 1).clamp(1900, u16::MAX as i32) as u16;
        Self::valid_year_between(column, 1900, next)
    }

    pub fn valid_year_between(column: &str, min: u16, max: u16) -> Self {
        DomainCheck::ValidYear {
            column: column.to_string(),
            min,
            max,
        }
    }

    pub fn exact_set<I, S>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DomainCheck::ExactSet {
            column: column.to_string(),
            values: strings(values),
        }
    }

    pub fn contains_all<I, S>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DomainCheck::ContainsAll {
            column: column.to_string(),
            values: strings(values),
        }
    }

    pub fn contains_any<I, S>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DomainCheck::ContainsAny {
            column: column.to_string(),
            values: strings(values),
        }
    }

    pub fn positive(column: &str) -> Self {
        DomainCheck::Positive {
            column: column.to_string(),
        }
    }

    pub fn in_text_set<I, S>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DomainCheck::InTextSet {
            column: column.to_string(),
            values: strings(values),
        }
    }

    pub fn in_int_set(column: &str, values: &[i64]) -> Self {
        DomainCheck::InIntSet {
            column: column.to_string(),
            values: values.to_vec(),
        }
    }

    pub fn ordered<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DomainCheck::Ordered {
            columns: strings(columns),
        }
    }

    pub fn min_distinct(column: &str, min: usize) -> Self {
        DomainCheck::MinDistinct {
            column: column.to_string(),
            min,
        }
    }

    pub fn identifier_shape(column: &str, pattern: &str, min_len: usize, sample: usize) -> Self {
        DomainCheck::IdentifierShape {
            column: column.to_string(),
            pattern: pattern.to_string(),
            min_len,
            sample,
        }
    }
}

/// Everything a finished table must satisfy before it is published.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationPlan {
    pub dataset: String,
    pub columns: Vec<(String, ColumnKind)>,
    pub not_null: Vec<String>,
    pub unique: Vec<String>,
    pub min_rows: usize,
    pub checks: Vec<DomainCheck>,
    /// Column whose distinct count is reported in the pass summary.
    pub summarize_distinct: Option<String>,
}

impl ValidationPlan {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            ..Self::default()
        }
    }

    pub fn column(mut self, name: &str, kind: ColumnKind) -> Self {
        self.columns.push((name.to_string(), kind));
        self
    }

    /// Declare every column of `schema` with its semantic type.
    pub fn columns_from(mut self, schema: &TableSchema) -> Self {
        self.columns.extend(
            schema
                .columns()
                .iter()
                .map(|c| (c.name.clone(), ColumnKind::from(c.ty))),
        );
        self
    }

    pub fn not_null(mut self, columns: &[&str]) -> Self {
        self.not_null = strings(columns.iter().copied());
        self
    }

    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique = strings(columns.iter().copied());
        self
    }

    pub fn min_rows(mut self, min: usize) -> Self {
        self.min_rows = min;
        self
    }

    pub fn check(mut self, check: DomainCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn summarize_distinct(mut self, column: &str) -> Self {
        self.summarize_distinct = Some(column.to_string());
        self
    }
}
