// src/process/mod.rs
pub mod dataset;
pub mod merge;
pub mod normalize;
pub mod raw_table;
pub mod utils;
pub mod workbook;

pub use dataset::{Dataset, NormalizedRecord, Value};
pub use merge::CrossYearMerger;
pub use normalize::{normalize_sheet, NormalizedSheet};
pub use raw_table::{Cell, RawSheet};
pub use workbook::Workbook;
