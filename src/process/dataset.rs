use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Int64Builder, StringBuilder},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::schema::{build_arrow_schema, TableSchema};

/// A typed output value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// One output row, positionally aligned with its `TableSchema`.
/// Fields without a source value hold `Value::Null`; none is ever missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    values: Vec<Value>,
}

impl NormalizedRecord {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, idx: usize) -> &Value {
        &self.values[idx]
    }

    pub fn set(&mut self, idx: usize, value: Value) {
        self.values[idx] = value;
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Final artifact of a transform: one schema, ordered records.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<TableSchema>,
    records: Vec<NormalizedRecord>,
}

impl Dataset {
    pub fn new(schema: Arc<TableSchema>, records: Vec<NormalizedRecord>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of column `name`, in record order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.records.iter().map(|r| r.get(idx)).collect())
    }

    /// Columnar view for validation and publication.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.schema.len());

        for (idx, col) in self.schema.columns().iter().enumerate() {
            if col.ty.is_string() {
                let mut b = StringBuilder::with_capacity(self.records.len(), self.records.len() * 8);
                for r in &self.records {
                    b.append_option(r.get(idx).as_text());
                }
                arrays.push(Arc::new(b.finish()));
            } else {
                let mut b = Int64Builder::with_capacity(self.records.len());
                for r in &self.records {
                    b.append_option(r.get(idx).as_int());
                }
                arrays.push(Arc::new(b.finish()));
            }
        }

        RecordBatch::try_new(build_arrow_schema(&self.schema), arrays)
            .context("building record batch from dataset")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnRule};
    use arrow::array::{Array, Int64Array, StringArray};

    #[test]
    fn record_batch_keeps_types_and_nulls() -> Result<()> {
        let schema = Arc::new(TableSchema::new(vec![
            ColumnDef::code("fips", 9, ColumnRule::exact("fips")),
            ColumnDef::integer("population", ColumnRule::exact("pop2020")),
        ]));
        let ds = Dataset::new(
            schema,
            vec![
                NormalizedRecord::new(vec![Value::Text("000060001".into()), Value::Int(10)]),
                NormalizedRecord::new(vec![Value::Text("100199999".into()), Value::Null]),
            ],
        );

        let batch = ds.to_record_batch()?;
        assert_eq!(batch.num_rows(), 2);
        let fips = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("fips is utf8");
        assert_eq!(fips.value(0), "000060001");
        let pop = batch
            .column(1)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("population is int64");
        assert_eq!(pop.value(0), 10);
        assert!(pop.is_null(1));
        Ok(())
    }
}
