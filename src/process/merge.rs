//! Stitch per-vintage record sets into one dataset.

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;

use crate::process::dataset::{Dataset, NormalizedRecord, Value};
use crate::schema::TableSchema;

struct Part {
    year: String,
    category: Option<String>,
    records: Vec<NormalizedRecord>,
}

/// Collects one record set per (year, category) and emits them years ascending,
/// categories in declared order. Duplicates are kept; catching them is validation's job.
pub struct CrossYearMerger {
    schema: Arc<TableSchema>,
    categories: Vec<String>,
    parts: Vec<Part>,
}

impl CrossYearMerger {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            categories: Vec::new(),
            parts: Vec::new(),
        }
    }

    /// Declare the category labels and their emit order within a year.
    pub fn with_categories<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Queue `records`, produced under `shape`, as the `(year, category)` vintage.
    pub fn push(
        &mut self,
        year: impl Into<String>,
        category: Option<&str>,
        shape: &TableSchema,
        records: Vec<NormalizedRecord>,
    ) -> Result<()> {
        let year = year.into();
        if !self.schema.same_shape(shape) {
            bail!(
                "vintage {} has columns {:?}, expected {:?}",
                year,
                shape.names(),
                self.schema.names()
            );
        }
        match (self.schema.category_index(), category) {
            (Some(_), None) => bail!("vintage {} is missing its category label", year),
            (None, Some(c)) => bail!("schema has no category column for label {}", c),
            (Some(_), Some(c)) if !self.categories.iter().any(|k| k == c) => {
                bail!("unknown category {} (declared: {:?})", c, self.categories)
            }
            _ => {}
        }

        info!(year = %year, category = ?category, rows = records.len(), "queued vintage");
        self.parts.push(Part {
            year,
            category: category.map(str::to_string),
            records,
        });
        Ok(())
    }

    fn category_rank(&self, category: &Option<String>) -> usize {
        category
            .as_ref()
            .and_then(|c| self.categories.iter().position(|k| k == c))
            .unwrap_or(0)
    }

    /// Concatenate all vintages, stamping year and category into every record.
    pub fn finish(mut self) -> Dataset {
        let parts = std::mem::take(&mut self.parts);
        let mut keyed: Vec<(i64, String, usize, Part)> = parts
            .into_iter()
            .map(|p| {
                let numeric = p.year.parse::<i64>().unwrap_or(i64::MAX);
                let rank = self.category_rank(&p.category);
                (numeric, p.year.clone(), rank, p)
            })
            .collect();
        keyed.sort_by(|a, b| (a.0, &a.1, a.2).cmp(&(b.0, &b.1, b.2)));

        let year_idx = self.schema.year_index();
        let category_idx = self.schema.category_index();
        let total: usize = keyed.iter().map(|k| k.3.records.len()).sum();
        let mut records = Vec::with_capacity(total);

        for (_, _, _, part) in keyed {
            for mut record in part.records {
                if let Some(i) = year_idx {
                    record.set(i, Value::Text(part.year.clone()));
                }
                if let (Some(i), Some(c)) = (category_idx, &part.category) {
                    record.set(i, Value::Text(c.clone()));
                }
                records.push(record);
            }
        }

        info!(rows = records.len(), "combined vintages");
        Dataset::new(self.schema, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnRule};

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            ColumnDef::text("coc_number", ColumnRule::exact("CoC Number")),
            ColumnDef::year("year"),
            ColumnDef::category("count_type"),
        ])
    }

    fn rec(coc: &str) -> NormalizedRecord {
        NormalizedRecord::new(vec![Value::Text(coc.into()), Value::Null, Value::Null])
    }

    #[test]
    fn orders_years_then_declared_categories() -> Result<()> {
        let s = schema();
        let mut m = CrossYearMerger::new(s.clone())
            .with_categories(["Overall", "Sheltered", "Unsheltered"]);
        m.push("2008", Some("Unsheltered"), &s, vec![rec("a")])?;
        m.push("2007", Some("Sheltered"), &s, vec![rec("b")])?;
        m.push("2008", Some("Overall"), &s, vec![rec("c")])?;
        m.push("2007", Some("Overall"), &s, vec![rec("d"), rec("d")])?;

        let ds = m.finish();
        let order: Vec<(String, String, String)> = ds
            .records()
            .iter()
            .map(|r| {
                (
                    r.get(0).as_text().unwrap_or_default().to_string(),
                    r.get(1).as_text().unwrap_or_default().to_string(),
                    r.get(2).as_text().unwrap_or_default().to_string(),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("d".into(), "2007".into(), "Overall".into()),
                ("d".into(), "2007".into(), "Overall".into()),
                ("b".into(), "2007".into(), "Sheltered".into()),
                ("c".into(), "2008".into(), "Overall".into()),
                ("a".into(), "2008".into(), "Unsheltered".into()),
            ]
        );
        Ok(())
    }

    #[test]
    fn rejects_mismatched_shape_and_unknown_category() {
        let s = schema();
        let mut m = CrossYearMerger::new(s.clone()).with_categories(["Overall"]);
        let other = TableSchema::new(vec![ColumnDef::year("year")]);
        assert!(m.push("2007", Some("Overall"), &other, vec![]).is_err());
        assert!(m.push("2007", Some("Hidden"), &s, vec![]).is_err());
        assert!(m.push("2007", None, &s, vec![]).is_err());
    }

    #[test]
    fn year_only_schema_stamps_fiscal_year() -> Result<()> {
        let s = TableSchema::new(vec![
            ColumnDef::text("fips", ColumnRule::exact("fips")),
            ColumnDef::year("fiscal_year"),
        ]);
        let mut m = CrossYearMerger::new(s.clone());
        let r = NormalizedRecord::new(vec![Value::Text("x".into()), Value::Null]);
        m.push("2025", None, &s, vec![r.clone()])?;
        m.push("2024", None, &s, vec![r])?;
        let ds = m.finish();
        let years: Vec<_> = ds
            .column("fiscal_year")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_text())
            .collect();
        assert_eq!(years, vec!["2024", "2025"]);
        Ok(())
    }
}
