//! Sheet → canonical records.

use tracing::{debug, instrument};

use crate::process::dataset::{NormalizedRecord, Value};
use crate::process::raw_table::{Cell, RawSheet};
use crate::process::utils::{cell_text, coerce_int, zero_pad};
use crate::schema::{resolve_columns, FieldType, Resolution, TableSchema};

/// Output of normalizing one sheet under one schema.
#[derive(Debug, Clone)]
pub struct NormalizedSheet {
    pub sheet: String,
    pub records: Vec<NormalizedRecord>,
    /// How each sheet-sourced field was located, in schema order.
    pub resolutions: Vec<Resolution>,
    /// Rows dropped for a missing identifier, a null required count, or no content.
    pub skipped_rows: usize,
}

impl NormalizedSheet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn coerce(cell: &Cell, ty: FieldType) -> Value {
    match ty {
        FieldType::Integer => coerce_int(cell).map_or(Value::Null, Value::Int),
        FieldType::Text => cell_text(cell).map_or(Value::Null, Value::Text),
        FieldType::Code { width } => {
            cell_text(cell).map_or(Value::Null, |s| Value::Text(zero_pad(&s, width)))
        }
    }
}

/// Normalize every data row of `sheet`. Provenance columns are left null for the merger.
#[instrument(level = "debug", skip(sheet, schema), fields(sheet = %sheet.name, rows = sheet.rows.len()))]
pub fn normalize_sheet(sheet: &RawSheet, schema: &TableSchema) -> NormalizedSheet {
    let resolved = resolve_columns(schema, &sheet.name, &sheet.headers);
    let mut records = Vec::with_capacity(sheet.rows.len());
    let mut skipped_rows = 0;

    'rows: for row in &sheet.rows {
        if row.iter().all(|c| cell_text(c).is_none()) {
            skipped_rows += 1;
            continue;
        }

        let mut values = Vec::with_capacity(schema.len());
        for (col, res) in schema.columns().iter().zip(&resolved) {
            let mut value = match res.as_ref().and_then(|r| r.index) {
                Some(i) => coerce(row.get(i).unwrap_or(&Cell::Empty), col.ty),
                None => Value::Null,
            };
            if value.is_null() {
                if let Some(text) = &col.fallback {
                    value = Value::Text(text.clone());
                }
            }
            if value.is_null() && res.is_some() && (col.identifier || col.skip_if_null) {
                skipped_rows += 1;
                continue 'rows;
            }
            values.push(value);
        }
        records.push(NormalizedRecord::new(values));
    }

    debug!(emitted = records.len(), skipped = skipped_rows, "normalized sheet");

    NormalizedSheet {
        sheet: sheet.name.clone(),
        records,
        resolutions: resolved.into_iter().flatten().collect(),
        skipped_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnRule, Resolved};

    fn fmr_schema() -> TableSchema {
        TableSchema::new(vec![
            ColumnDef::code("state_fips", 2, ColumnRule::exact("state")),
            ColumnDef::code("fips", 9, ColumnRule::exact("fips")).identifier(),
            ColumnDef::year("fiscal_year"),
            ColumnDef::integer(
                "population",
                ColumnRule::exact("pop2020").then_variants(["pop2022"]),
            ),
        ])
    }

    #[test]
    fn pads_codes_and_leaves_provenance_null() {
        let sheet = RawSheet::new(
            "FY25",
            vec!["state".into(), "fips".into(), "pop2020".into()],
            vec![vec![Cell::Int(6), Cell::Float(60001.0), Cell::Float(1520.0)]],
        );
        let out = normalize_sheet(&sheet, &fmr_schema());
        assert_eq!(out.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.get(0), &Value::Text("06".into()));
        assert_eq!(r.get(1), &Value::Text("000060001".into()));
        assert_eq!(r.get(2), &Value::Null);
        assert_eq!(r.get(3), &Value::Int(1520));
    }

    #[test]
    fn alternate_population_column_resolves() {
        let sheet = RawSheet::new(
            "FY24",
            vec!["state".into(), "fips".into(), "pop2022".into()],
            vec![vec![Cell::Int(1), Cell::Int(100199999), Cell::Int(58805)]],
        );
        let out = normalize_sheet(&sheet, &fmr_schema());
        assert_eq!(out.records[0].get(3), &Value::Int(58805));
        let pop = out
            .resolutions
            .iter()
            .find(|r| r.field == "population")
            .expect("population resolution recorded");
        assert_eq!(pop.how, Resolved::Variant("pop2022".into()));
    }

    #[test]
    fn missing_population_is_null_but_row_kept() {
        let sheet = RawSheet::new(
            "FY24",
            vec!["state".into(), "fips".into()],
            vec![vec![Cell::Int(1), Cell::Int(100199999)]],
        );
        let out = normalize_sheet(&sheet, &fmr_schema());
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].get(3), &Value::Null);
        assert_eq!(out.records[0].values().len(), 4);
    }

    #[test]
    fn rows_without_identifier_are_skipped() {
        let sheet = RawSheet::new(
            "FY24",
            vec!["state".into(), "fips".into(), "pop2020".into()],
            vec![
                vec![Cell::Int(1), Cell::Empty, Cell::Int(5)],
                vec![Cell::Int(1), Cell::Text("nan".into()), Cell::Int(5)],
                vec![Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::Int(1), Cell::Int(100199999), Cell::Int(5)],
            ],
        );
        let out = normalize_sheet(&sheet, &fmr_schema());
        assert_eq!(out.len(), 1);
        assert_eq!(out.skipped_rows, 3);
    }

    #[test]
    fn skip_if_null_drops_rows_without_count() {
        let schema = TableSchema::new(vec![
            ColumnDef::text("coc_number", ColumnRule::exact("CoC Number")).identifier(),
            ColumnDef::integer("total", ColumnRule::pattern(["Overall Homeless"])).skip_if_null(),
            ColumnDef::integer("veterans", ColumnRule::pattern(["Overall Homeless Veterans"])),
        ]);
        let sheet = RawSheet::new(
            "2007",
            vec!["CoC Number".into(), "Overall Homeless, 2007".into()],
            vec![
                vec![Cell::from("AK-500"), Cell::Int(1000)],
                vec![Cell::from("AK-501"), Cell::Empty],
            ],
        );
        let out = normalize_sheet(&sheet, &schema);
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].get(2), &Value::Null);
    }

    #[test]
    fn fallback_text_replaces_missing_name() {
        let schema = TableSchema::new(vec![
            ColumnDef::text("coc_number", ColumnRule::exact("CoC Number")).identifier(),
            ColumnDef::text("coc_name", ColumnRule::exact("CoC Name")).or_text(""),
        ]);
        let sheet = RawSheet::new(
            "2008",
            vec!["CoC Number".into()],
            vec![vec![Cell::from("AL-500")]],
        );
        let out = normalize_sheet(&sheet, &schema);
        assert_eq!(out.records[0].get(1), &Value::Text(String::new()));
    }
}
