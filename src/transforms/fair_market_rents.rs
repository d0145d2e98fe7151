use anyhow::Result;
use tracing::info;

use super::{describe, first_sheet, Transform, HUD_PDR};
use crate::fetch::{Format, RawStore};
use crate::process::{normalize_sheet, CrossYearMerger, Dataset, RawSheet};
use crate::publish::DatasetMetadata;
use crate::schema::{ColumnDef, ColumnRule, TableSchema};
use crate::validate::{DomainCheck, ValidationPlan};

pub const DATASET_ID: &str = "hud_fair_market_rents";

/// (raw asset, fiscal year) per FMR workbook.
const VINTAGES: &[(&str, &str)] = &[("hud_fmr_2024", "2024"), ("hud_fmr_2025", "2025")];

const FMR_COLUMNS: [&str; 5] = ["fmr_0br", "fmr_1br", "fmr_2br", "fmr_3br", "fmr_4br"];

pub fn schema() -> TableSchema {
    let mut columns = vec![
        ColumnDef::text("state_code", ColumnRule::exact("stusps")),
        ColumnDef::code("state_fips", 2, ColumnRule::exact("state")),
        ColumnDef::text("county_name", ColumnRule::exact("countyname")),
        ColumnDef::code("fips", 9, ColumnRule::exact("fips")).identifier(),
        ColumnDef::text("hud_area_code", ColumnRule::exact("hud_area_code")),
        ColumnDef::text("hud_area_name", ColumnRule::exact("hud_area_name")),
        ColumnDef::integer("metro", ColumnRule::exact("metro")),
        ColumnDef::year("fiscal_year"),
        // the census vintage moves between releases
        ColumnDef::integer(
            "population",
            ColumnRule::exact("pop2020").then_variants(["pop2022"]),
        ),
    ];
    for (bedrooms, name) in FMR_COLUMNS.iter().enumerate() {
        columns.push(ColumnDef::integer(
            name,
            ColumnRule::exact(format!("fmr_{}", bedrooms)),
        ));
    }
    TableSchema::new(columns)
}

/// Merge one first-sheet per fiscal year into the combined table.
pub fn combine(vintages: Vec<(String, RawSheet)>) -> Result<Dataset> {
    let schema = schema();
    let mut merger = CrossYearMerger::new(schema.clone());
    for (fiscal_year, sheet) in vintages {
        let normalized = normalize_sheet(&sheet, &schema);
        info!(fiscal_year = %fiscal_year, rows = normalized.len(), "loaded FY{}", fiscal_year);
        merger.push(fiscal_year, None, &schema, normalized.records)?;
    }
    Ok(merger.finish())
}

pub struct FairMarketRents;

impl Transform for FairMarketRents {
    fn name(&self) -> &'static str {
        "fair_market_rents"
    }

    fn dataset_id(&self) -> &'static str {
        DATASET_ID
    }

    fn metadata(&self) -> DatasetMetadata {
        describe(
            DATASET_ID,
            "HUD Fair Market Rents",
            "Fair Market Rents (FMRs) by county from HUD. FMRs are used to determine payment standards for Housing Choice Voucher programs.",
            HUD_PDR,
            "https://www.huduser.gov/portal/datasets/fmr.html",
            &[
                ("state_code", "2-letter state code (e.g., AL, AK)"),
                ("state_fips", "State FIPS code"),
                ("county_name", "County name"),
                ("fips", "Full FIPS code (state + county)"),
                ("hud_area_code", "HUD metropolitan area code"),
                ("hud_area_name", "HUD metropolitan area name"),
                ("metro", "1 if metropolitan area, 0 if non-metropolitan"),
                ("fiscal_year", "Federal fiscal year (October-September)"),
                ("population", "Population from census"),
                ("fmr_0br", "Fair Market Rent for efficiency/0-bedroom unit ($/month)"),
                ("fmr_1br", "Fair Market Rent for 1-bedroom unit ($/month)"),
                ("fmr_2br", "Fair Market Rent for 2-bedroom unit ($/month)"),
                ("fmr_3br", "Fair Market Rent for 3-bedroom unit ($/month)"),
                ("fmr_4br", "Fair Market Rent for 4-bedroom unit ($/month)"),
            ],
        )
    }

    fn plan(&self) -> ValidationPlan {
        let mut plan = ValidationPlan::new(DATASET_ID)
            .columns_from(&schema())
            .not_null(&["state_code", "county_name", "fips", "fiscal_year", "fmr_2br"])
            .unique(&["fips", "fiscal_year"])
            .min_rows(9000)
            .check(DomainCheck::valid_year("fiscal_year"))
            .check(DomainCheck::exact_set("fiscal_year", ["2024", "2025"]));
        for col in FMR_COLUMNS {
            plan = plan.check(DomainCheck::positive(col));
        }
        plan.check(DomainCheck::in_int_set("metro", &[0, 1]))
            .check(DomainCheck::min_distinct("state_code", 50))
            .summarize_distinct("state_code")
    }

    fn build(&self, raw: &RawStore) -> Result<Dataset> {
        let mut vintages = Vec::with_capacity(VINTAGES.len());
        for (asset_id, fiscal_year) in VINTAGES {
            let sheet = first_sheet(raw, asset_id, Format::Xlsx)?;
            vintages.push((fiscal_year.to_string(), sheet));
        }
        let dataset = combine(vintages)?;
        info!(rows = dataset.len(), "combined fair market rents");
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Cell, Value};
    use crate::transforms::testing::{letters, sheet};
    use crate::validate::{validate, ValidationError};

    const HEADERS: [&str; 14] = [
        "stusps", "state", "countyname", "fips", "hud_area_code", "hud_area_name", "metro",
        "pop2020", "fmr_0", "fmr_1", "fmr_2", "fmr_3", "fmr_4", "unused",
    ];

    fn row(i: usize, pop: i64) -> Vec<Cell> {
        let state = i % 52 + 1;
        vec![
            Cell::from(letters(i % 52).as_str()),
            Cell::Int(state as i64),
            Cell::from(format!("County {}", i).as_str()),
            Cell::Float((state * 10_000_000 + i) as f64),
            Cell::from("METRO10180M10180"),
            Cell::from("Abilene, TX MSA"),
            Cell::Int((i % 2) as i64),
            Cell::Int(pop),
            Cell::Float(850.0),
            Cell::Int(900),
            Cell::Int(1100),
            Cell::Int(1500),
            Cell::Int(1700),
            Cell::Empty,
        ]
    }

    fn fy(name: &str, headers: &[&str], rows: usize) -> RawSheet {
        sheet(name, headers, (0..rows).map(|i| row(i, 1000 + i as i64)).collect())
    }

    #[test]
    fn population_falls_back_to_pop2022() -> Result<()> {
        let mut headers = HEADERS;
        headers[7] = "POP2022";
        let ds = combine(vec![
            ("2024".into(), fy("FY24", &HEADERS, 3)),
            ("2025".into(), fy("FY25", &headers, 3)),
        ])?;
        assert_eq!(ds.len(), 6);
        let pops = ds.column("population").unwrap();
        assert!(pops.iter().all(|v| !v.is_null()));
        let fips = ds.column("fips").unwrap();
        assert_eq!(fips[0], &Value::Text("010000000".into()));
        let years: Vec<_> = ds.column("fiscal_year").unwrap();
        assert_eq!(years[0], &Value::Text("2024".into()));
        assert_eq!(years[5], &Value::Text("2025".into()));
        Ok(())
    }

    #[test]
    fn full_size_table_passes_plan() -> Result<()> {
        let ds = combine(vec![
            ("2024".into(), fy("FY24", &HEADERS, 4600)),
            ("2025".into(), fy("FY25", &HEADERS, 4600)),
        ])?;
        let report = validate(&ds.to_record_batch()?, &FairMarketRents.plan())?;
        assert_eq!(report.rows, 9200);
        assert_eq!(report.distinct, Some(("state_code".into(), 52)));
        Ok(())
    }

    #[test]
    fn truncated_download_fails_floor() -> Result<()> {
        let ds = combine(vec![
            ("2024".into(), fy("FY24", &HEADERS, 5)),
            ("2025".into(), fy("FY25", &HEADERS, 5)),
        ])?;
        let err = validate(&ds.to_record_batch()?, &FairMarketRents.plan()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::TooFewRows { min: 9000, actual: 10 }
        ));
        Ok(())
    }

    #[test]
    fn single_fiscal_year_is_rejected() -> Result<()> {
        let ds = combine(vec![("2024".into(), fy("FY24", &HEADERS, 9100))])?;
        let err = validate(&ds.to_record_batch()?, &FairMarketRents.plan()).unwrap_err();
        assert!(matches!(err, ValidationError::UnexpectedValueSet { .. }));
        Ok(())
    }
}
