use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto_from_rs, Reader, Sheets};
use std::io::Cursor;
use tracing::debug;

use crate::process::raw_table::RawSheet;

/// An in-memory spreadsheet (xlsx or xlsb; the container is sniffed from the bytes).
pub struct Workbook {
    label: String,
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    pub fn from_bytes(bytes: Vec<u8>, label: &str) -> Result<Self> {
        let size = bytes.len();
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))
            .with_context(|| format!("opening workbook {}", label))?;
        debug!(workbook = label, size, "opened workbook");
        Ok(Self {
            label: label.to_string(),
            sheets,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|n| n == name)
    }

    pub fn sheet(&mut self, name: &str) -> Result<RawSheet> {
        let range = self
            .sheets
            .worksheet_range(name)
            .with_context(|| format!("reading sheet {} of {}", name, self.label))?;
        Ok(RawSheet::from_range(name, &range))
    }

    pub fn first_sheet(&mut self) -> Result<RawSheet> {
        let name = self
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("workbook {} has no sheets", self.label))?;
        self.sheet(&name)
    }
}
