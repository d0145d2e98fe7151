//! Point-in-Time counts by Continuum of Care, one workbook sheet per year.
//!
//! Column headers drift between years (`Overall Homeless, 2007` vs
//! `Overall Homeless - Under 18, 2023`), so every count is located by pattern.
//! A single sheet yields three record sets: overall, sheltered and unsheltered.

use anyhow::Result;
use std::ops::RangeInclusive;
use tracing::{info, warn};

use super::{describe, open_workbook, Transform};
use crate::fetch::{Format, RawStore};
use crate::process::{normalize_sheet, CrossYearMerger, Dataset, RawSheet};
use crate::publish::DatasetMetadata;
use crate::schema::{ColumnDef, ColumnRule, TableSchema};
use crate::validate::{DomainCheck, ValidationPlan};

pub const DATASET_ID: &str = "hud_homeless_counts";
const ASSET_ID: &str = "hud_pit_2024";
pub const YEARS: RangeInclusive<u16> = 2007..=2024;
pub const COUNT_TYPES: [&str; 3] = ["Overall", "Sheltered", "Unsheltered"];

/// Header prefixes to try, most specific first. Sheltered counts are split by
/// shelter kind (`Sheltered ES`, `Sheltered TH`, ...) with `Sheltered Total`
/// carrying the sum; older vintages only have the plain `Sheltered` form.
fn header_prefixes(count_type: &str) -> &'static [&'static str] {
    match count_type {
        "Overall" => &["Overall Homeless"],
        "Sheltered" => &["Sheltered Total Homeless", "Sheltered"],
        _ => &["Unsheltered"],
    }
}

/// Canonical layout with the count columns tuned to `count_type`.
pub fn schema_for(count_type: &str) -> TableSchema {
    let prefixes = header_prefixes(count_type);
    let count = |name: &str, patterns: fn(&str) -> [String; 2]| {
        let rule = ColumnRule::pattern(prefixes.iter().flat_map(|p| patterns(p)));
        // "Sheltered" is a substring of "Unsheltered"
        let rule = if count_type == "Sheltered" {
            rule.excluding(["Unsheltered"])
        } else {
            rule
        };
        ColumnDef::integer(name, rule)
    };

    TableSchema::new(vec![
        ColumnDef::text("coc_number", ColumnRule::exact("CoC Number")).identifier(),
        ColumnDef::text("coc_name", ColumnRule::exact("CoC Name")).or_text(""),
        ColumnDef::year("year"),
        ColumnDef::category("count_type"),
        count("total", |p| [format!("{} Homeless", p), p.to_string()]).skip_if_null(),
        count("under_18", |p| {
            [format!("{} Homeless - Under 18", p), format!("{} - Under 18", p)]
        }),
        count("age_18_to_24", |p| {
            [format!("{} Homeless - Age 18 to 24", p), format!("{} - 18 to 24", p)]
        }),
        count("over_24", |p| {
            [format!("{} Homeless - Over 24", p), format!("{} - Over 24", p)]
        }),
        count("individuals", |p| {
            [
                format!("{} Homeless - Homeless Individuals", p),
                format!("{} - Individuals", p),
            ]
        }),
        count("people_in_families", |p| {
            [
                format!("{} Homeless - Homeless People in Families", p),
                format!("{} - Families", p),
            ]
        }),
        count("veterans", |p| {
            [format!("{} Homeless - Veterans", p), format!("{} Veterans", p)]
        }),
        count("chronically_homeless", |p| {
            [
                format!("{} Homeless - Chronically Homeless", p),
                format!("{} Chronically", p),
            ]
        }),
    ])
}

/// Merge year sheets (named by year) into the long-format table. Sheets outside
/// the covered years are ignored.
pub fn combine(sheets: impl IntoIterator<Item = RawSheet>) -> Result<Dataset> {
    let layouts: Vec<(&str, TableSchema)> =
        COUNT_TYPES.iter().map(|c| (*c, schema_for(c))).collect();
    let mut merger =
        CrossYearMerger::new(layouts[0].1.clone()).with_categories(COUNT_TYPES);

    for sheet in sheets {
        let in_range = sheet
            .name
            .trim()
            .parse::<u16>()
            .map(|y| YEARS.contains(&y))
            .unwrap_or(false);
        if !in_range {
            warn!(sheet = %sheet.name, "not a count year, ignoring");
            continue;
        }
        let mut year_rows = 0;
        for (count_type, schema) in &layouts {
            let normalized = normalize_sheet(&sheet, schema);
            year_rows += normalized.len();
            merger.push(sheet.name.trim(), Some(*count_type), schema, normalized.records)?;
        }
        info!(year = %sheet.name, records = year_rows, "extracted year");
    }
    Ok(merger.finish())
}

pub struct HomelessCounts;

impl Transform for HomelessCounts {
    fn name(&self) -> &'static str {
        "homeless_counts"
    }

    fn dataset_id(&self) -> &'static str {
        DATASET_ID
    }

    fn metadata(&self) -> DatasetMetadata {
        describe(
            DATASET_ID,
            "HUD Point-in-Time Homeless Counts",
            "Annual Point-in-Time (PIT) homeless counts by Continuum of Care (CoC) from 2007-2024. PIT counts are conducted on a single night in January each year.",
            "HUD Office of Community Planning and Development",
            "https://www.hudexchange.info/resource/3031/pit-and-hic-data-since-2007/",
            &[
                ("coc_number", "Continuum of Care identifier (e.g., AK-500)"),
                ("coc_name", "Full name of the Continuum of Care region"),
                ("year", "Year of the Point-in-Time count"),
                ("count_type", "Type of count: 'Sheltered', 'Unsheltered', or 'Overall'"),
                ("total", "Total homeless count"),
                ("under_18", "Count of homeless under 18 years old"),
                ("age_18_to_24", "Count of homeless aged 18-24 years"),
                ("over_24", "Count of homeless over 24 years old"),
                ("individuals", "Individual homeless (not part of family units)"),
                ("people_in_families", "People who are homeless as part of family units"),
                ("veterans", "Homeless veterans"),
                ("chronically_homeless", "Chronically homeless individuals"),
            ],
        )
    }

    fn plan(&self) -> ValidationPlan {
        ValidationPlan::new(DATASET_ID)
            .columns_from(&schema_for("Overall"))
            .not_null(&["coc_number", "year", "count_type", "total"])
            .unique(&["coc_number", "year", "count_type"])
            .min_rows(10_000)
            .check(DomainCheck::valid_year_between("year", *YEARS.start(), *YEARS.end()))
            .check(DomainCheck::contains_all("year", ["2024"]))
            .check(DomainCheck::contains_any("year", ["2007", "2008"]))
            .check(DomainCheck::in_text_set("count_type", COUNT_TYPES))
            .check(DomainCheck::identifier_shape(
                "coc_number",
                r"^[A-Za-z]+-\d+$",
                6,
                10,
            ))
            .check(DomainCheck::min_distinct("coc_number", 300))
            .summarize_distinct("coc_number")
    }

    fn build(&self, raw: &RawStore) -> Result<Dataset> {
        let mut workbook = open_workbook(raw, ASSET_ID, Format::Xlsb)?;
        let mut sheets = Vec::new();
        for year in YEARS {
            let name = year.to_string();
            if !workbook.has_sheet(&name) {
                warn!(year, "sheet missing, skipping year");
                continue;
            }
            match workbook.sheet(&name) {
                Ok(sheet) => sheets.push(sheet),
                Err(e) => warn!(year, error = %format!("{:#}", e), "could not read year, skipping"),
            }
        }
        let dataset = combine(sheets)?;
        info!(rows = dataset.len(), "combined homeless counts");
        Ok(dataset)
    }
}
