//! Section 8 income limits. Source headers `ELI_n`, `l50_n` and `l80_n` are the
//! 30%, 50% and 80% of area median income tiers for household size `n`.

use anyhow::Result;
use tracing::info;

use super::{describe, first_sheet, Transform, HUD_PDR};
use crate::fetch::{Format, RawStore};
use crate::process::{normalize_sheet, CrossYearMerger, Dataset, RawSheet};
use crate::publish::DatasetMetadata;
use crate::schema::{ColumnDef, ColumnRule, TableSchema};
use crate::validate::{DomainCheck, ValidationPlan};

pub const DATASET_ID: &str = "hud_income_limits";
const ASSET_ID: &str = "hud_income_limits_2024";
const FISCAL_YEAR: &str = "2024";
const HOUSEHOLD_SIZES: std::ops::RangeInclusive<usize> = 1..=8;

/// (output prefix, source prefix), lowest tier first.
const TIERS: [(&str, &str); 3] = [("eli", "ELI"), ("vli", "l50"), ("li", "l80")];

pub fn schema() -> TableSchema {
    let mut columns = vec![
        ColumnDef::code("fips", 9, ColumnRule::exact("fips")).identifier(),
        ColumnDef::text("state_code", ColumnRule::exact("stusps")),
        ColumnDef::code("state_fips", 2, ColumnRule::exact("state")),
        ColumnDef::text("state_name", ColumnRule::exact("state_name")),
        ColumnDef::text("hud_area_code", ColumnRule::exact("hud_area_code")),
        ColumnDef::text("hud_area_name", ColumnRule::exact("hud_area_name")),
        ColumnDef::code("county_fips", 3, ColumnRule::exact("county")),
        ColumnDef::text("county_name", ColumnRule::exact("County_Name")),
        ColumnDef::integer("metro", ColumnRule::exact("metro")),
        ColumnDef::year("fiscal_year"),
        ColumnDef::integer(
            "median_income",
            ColumnRule::exact(format!("median{}", FISCAL_YEAR)),
        ),
    ];
    for (out, src) in TIERS {
        for n in HOUSEHOLD_SIZES {
            columns.push(ColumnDef::integer(
                &format!("{}_{}", out, n),
                ColumnRule::exact(format!("{}_{}", src, n)),
            ));
        }
    }
    TableSchema::new(columns)
}

pub fn from_sheet(sheet: &RawSheet) -> Result<Dataset> {
    let schema = schema();
    let normalized = normalize_sheet(sheet, &schema);
    info!(rows = normalized.len(), skipped = normalized.skipped_rows, "loaded income limits");
    let mut merger = CrossYearMerger::new(schema.clone());
    merger.push(FISCAL_YEAR, None, &schema, normalized.records)?;
    Ok(merger.finish())
}

pub struct IncomeLimits;

impl Transform for IncomeLimits {
    fn name(&self) -> &'static str {
        "income_limits"
    }

    fn dataset_id(&self) -> &'static str {
        DATASET_ID
    }

    fn metadata(&self) -> DatasetMetadata {
        describe(
            DATASET_ID,
            "HUD Income Limits",
            "Section 8 income limits by area, defining eligibility thresholds for housing assistance programs. Includes Very Low (50% AMI), Extremely Low (30% AMI), and Low (80% AMI) income limits.",
            HUD_PDR,
            "https://www.huduser.gov/portal/datasets/il.html",
            &[
                ("fips", "Full FIPS code (state + county)"),
                ("state_code", "2-letter state code"),
                ("state_fips", "State FIPS code"),
                ("state_name", "Full state name"),
                ("hud_area_code", "HUD area code"),
                ("hud_area_name", "HUD area name"),
                ("county_fips", "County FIPS code"),
                ("county_name", "County name"),
                ("metro", "1 if metropolitan area, 0 if non-metropolitan"),
                ("fiscal_year", "Federal fiscal year"),
                ("median_income", "Area median income for 4-person household"),
                ("eli_1", "Extremely Low Income limit (30% AMI) for 1 person"),
                ("eli_2", "Extremely Low Income limit for 2 persons"),
                ("eli_3", "Extremely Low Income limit for 3 persons"),
                ("eli_4", "Extremely Low Income limit for 4 persons"),
                ("eli_5", "Extremely Low Income limit for 5 persons"),
                ("eli_6", "Extremely Low Income limit for 6 persons"),
                ("eli_7", "Extremely Low Income limit for 7 persons"),
                ("eli_8", "Extremely Low Income limit for 8 persons"),
                ("vli_1", "Very Low Income limit (50% AMI) for 1 person"),
                ("vli_2", "Very Low Income limit for 2 persons"),
                ("vli_3", "Very Low Income limit for 3 persons"),
                ("vli_4", "Very Low Income limit for 4 persons"),
                ("vli_5", "Very Low Income limit for 5 persons"),
                ("vli_6", "Very Low Income limit for 6 persons"),
                ("vli_7", "Very Low Income limit for 7 persons"),
                ("vli_8", "Very Low Income limit for 8 persons"),
                ("li_1", "Low Income limit (80% AMI) for 1 person"),
                ("li_2", "Low Income limit for 2 persons"),
                ("li_3", "Low Income limit for 3 persons"),
                ("li_4", "Low Income limit for 4 persons"),
                ("li_5", "Low Income limit for 5 persons"),
                ("li_6", "Low Income limit for 6 persons"),
                ("li_7", "Low Income limit for 7 persons"),
                ("li_8", "Low Income limit for 8 persons"),
            ],
        )
    }

    fn plan(&self) -> ValidationPlan {
        let mut plan = ValidationPlan::new(DATASET_ID)
            .columns_from(&schema())
            .not_null(&["fips", "state_code", "county_name", "fiscal_year", "median_income"])
            .unique(&["fips"])
            .min_rows(4500)
            .check(DomainCheck::valid_year("fiscal_year"))
            .check(DomainCheck::exact_set("fiscal_year", [FISCAL_YEAR]));
        for col in ["median_income", "eli_4", "vli_4", "li_4"] {
            plan = plan.check(DomainCheck::positive(col));
        }
        for n in HOUSEHOLD_SIZES {
            plan = plan.check(DomainCheck::ordered(
                TIERS.iter().map(|(out, _)| format!("{}_{}", out, n)),
            ));
        }
        plan.check(DomainCheck::in_int_set("metro", &[0, 1]))
            .check(DomainCheck::min_distinct("state_code", 50))
            .summarize_distinct("state_code")
    }

    fn build(&self, raw: &RawStore) -> Result<Dataset> {
        let sheet = first_sheet(raw, ASSET_ID, Format::Xlsx)?;
        from_sheet(&sheet)
    }
}
