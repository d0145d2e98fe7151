// src/transforms/mod.rs
pub mod fair_market_rents;
pub mod homeless_counts;
pub mod income_limits;

use anyhow::Result;

use crate::fetch::{Format, RawStore};
use crate::process::{Dataset, RawSheet, Workbook};
use crate::publish::DatasetMetadata;
use crate::validate::ValidationPlan;

pub use fair_market_rents::FairMarketRents;
pub use homeless_counts::HomelessCounts;
pub use income_limits::IncomeLimits;

/// CLI names, in the order a full run executes them.
pub const NAMES: [&str; 3] = ["fair_market_rents", "income_limits", "homeless_counts"];

pub const HUD_PDR: &str = "HUD Office of Policy Development and Research";

/// One published dataset: where it comes from, what it must satisfy, how it is described.
pub trait Transform {
    fn name(&self) -> &'static str;
    fn dataset_id(&self) -> &'static str;
    fn metadata(&self) -> DatasetMetadata;
    fn plan(&self) -> ValidationPlan;
    fn build(&self, raw: &RawStore) -> Result<Dataset>;
}

pub fn all() -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(FairMarketRents),
        Box::new(IncomeLimits),
        Box::new(HomelessCounts),
    ]
}

pub fn by_name(name: &str) -> Option<Box<dyn Transform>> {
    all().into_iter().find(|t| t.name() == name)
}

fn describe(
    id: &str,
    title: &str,
    description: &str,
    source: &str,
    source_url: &str,
    columns: &[(&str, &str)],
) -> DatasetMetadata {
    DatasetMetadata {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        source: source.to_string(),
        source_url: source_url.to_string(),
        column_descriptions: columns
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn open_workbook(raw: &RawStore, asset_id: &str, format: Format) -> Result<Workbook> {
    let bytes = raw.load(asset_id, format)?;
    Workbook::from_bytes(bytes, asset_id)
}

fn first_sheet(raw: &RawStore, asset_id: &str, format: Format) -> Result<RawSheet> {
    open_workbook(raw, asset_id, format)?.first_sheet()
}
