// src/schema/types.rs

/// Semantic type of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    /// Fixed-width identifier (FIPS and friends). Stored as text, left zero-padded.
    Code { width: usize },
}

impl FieldType {
    /// `true` for every type that lands in a Utf8 column.
    pub fn is_string(&self) -> bool {
        !matches!(self, FieldType::Integer)
    }

    pub fn as_str(&self) -> &'static str {
        if self.is_string() {
            "string"
        } else {
            "int"
        }
    }
}

/// One way of locating a source column among a sheet's headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Case-normalized exact header name.
    Exact(String),
    /// Ordered alternate exact names; the first present wins.
    Variant(Vec<String>),
    /// Ordered substrings; the first header containing one wins.
    /// Headers containing any of `exclude` are never matched.
    Pattern {
        candidates: Vec<String>,
        exclude: Vec<String>,
    },
}

/// Ordered list of strategies evaluated until one resolves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRule {
    strategies: Vec<Strategy>,
}

impl ColumnRule {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::default().then_exact(name)
    }

    pub fn variants<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().then_variants(names)
    }

    pub fn pattern<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().then_pattern(candidates)
    }

    pub fn then_exact(mut self, name: impl Into<String>) -> Self {
        self.strategies.push(Strategy::Exact(name.into()));
        self
    }

    pub fn then_variants<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategies
            .push(Strategy::Variant(names.into_iter().map(Into::into).collect()));
        self
    }

    pub fn then_pattern<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategies.push(Strategy::Pattern {
            candidates: candidates.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        });
        self
    }

    /// Attach exclusions to the most recently added pattern strategy.
    pub fn excluding<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(Strategy::Pattern { exclude, .. }) = self.strategies.last_mut() {
            exclude.extend(words.into_iter().map(Into::into));
        }
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }
}

/// Where a column's values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    Sheet(ColumnRule),
    /// Stamped by the merger: fiscal year / count year.
    Year,
    /// Stamped by the merger: sheltered / unsheltered / overall, etc.
    Category,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: FieldType,
    pub source: ColumnSource,
    /// Rows with an empty value here are dropped, not nulled.
    pub identifier: bool,
    /// Rows where this resolves to null are dropped.
    pub skip_if_null: bool,
    /// Text emitted instead of null.
    pub fallback: Option<String>,
}

impl ColumnDef {
    fn new(name: &str, ty: FieldType, source: ColumnSource) -> Self {
        Self {
            name: name.to_string(),
            ty,
            source,
            identifier: false,
            skip_if_null: false,
            fallback: None,
        }
    }

    pub fn text(name: &str, rule: ColumnRule) -> Self {
        Self::new(name, FieldType::Text, ColumnSource::Sheet(rule))
    }

    pub fn integer(name: &str, rule: ColumnRule) -> Self {
        Self::new(name, FieldType::Integer, ColumnSource::Sheet(rule))
    }

    pub fn code(name: &str, width: usize, rule: ColumnRule) -> Self {
        Self::new(name, FieldType::Code { width }, ColumnSource::Sheet(rule))
    }

    pub fn year(name: &str) -> Self {
        Self::new(name, FieldType::Text, ColumnSource::Year)
    }

    pub fn category(name: &str) -> Self {
        Self::new(name, FieldType::Text, ColumnSource::Category)
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn skip_if_null(mut self) -> Self {
        self.skip_if_null = true;
        self
    }

    pub fn or_text(mut self, fallback: &str) -> Self {
        self.fallback = Some(fallback.to_string());
        self
    }

    pub fn rule(&self) -> Option<&ColumnRule> {
        match &self.source {
            ColumnSource::Sheet(rule) => Some(rule),
            _ => None,
        }
    }
}

/// Canonical, ordered output schema of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn year_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.source == ColumnSource::Year)
    }

    pub fn category_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.source == ColumnSource::Category)
    }

    /// Two schemas produce interchangeable records when names and types line up,
    /// even if their resolution rules differ (e.g. per-category patterns).
    pub fn same_shape(&self, other: &TableSchema) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.ty == b.ty)
    }
}
