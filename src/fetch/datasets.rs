// src/fetch/datasets.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Spreadsheet container of a fetched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Xlsx,
    Xlsb,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Xlsx => "xlsx",
            Format::Xlsb => "xlsb",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A downloadable source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub key: String,
    pub url: Url,
    pub name: String,
    pub description: String,
    pub format: Format,
}

impl DatasetSpec {
    pub fn new(key: &str, url: &str, name: &str, description: &str, format: Format) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("parsing URL for dataset {}", key))?;
        Ok(Self {
            key: key.to_string(),
            url,
            name: name.to_string(),
            description: description.to_string(),
            format,
        })
    }

    /// Name the raw store files this dataset under, e.g. `hud_fmr_2024`.
    pub fn asset_id(&self) -> String {
        format!("hud_{}", self.key)
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.asset_id(), self.format)
    }
}

/// HUD USER files this job ingests, in fetch order.
static HUD_DATASETS: &[(&str, &str, &str, &str, Format)] = &[
    (
        "fmr_2024",
        "https://www.huduser.gov/portal/datasets/fmr/fmr2024/FY24_FMRs.xlsx",
        "Fair Market Rents FY2024",
        "Fair market rents by county for FY2024",
        Format::Xlsx,
    ),
    (
        "fmr_2025",
        "https://www.huduser.gov/portal/datasets/fmr/fmr2025/FY25_FMRs.xlsx",
        "Fair Market Rents FY2025",
        "Fair market rents by county for FY2025",
        Format::Xlsx,
    ),
    (
        "income_limits_2024",
        "https://www.huduser.gov/portal/datasets/il/il24/Section8-FY24.xlsx",
        "Income Limits FY2024",
        "Section 8 income limits by area",
        Format::Xlsx,
    ),
    (
        "pit_2024",
        "https://www.huduser.gov/portal/sites/default/files/xls/2007-2024-PIT-Counts-by-CoC.xlsb",
        "Point-in-Time Homeless Counts",
        "Annual homeless counts by Continuum of Care (2007-2024)",
        Format::Xlsb,
    ),
];

pub fn hud_datasets() -> Result<Vec<DatasetSpec>> {
    HUD_DATASETS
        .iter()
        .map(|(key, url, name, desc, format)| DatasetSpec::new(key, url, name, desc, *format))
        .collect()
}
