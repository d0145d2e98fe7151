use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::datasets::Format;

/// Fetched spreadsheets on local disk, one file per `<asset_id>.<format>`.
pub struct RawStore {
    dir: PathBuf,
}

impl RawStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("creating raw directory {:?}", &dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, asset_id: &str, format: Format) -> PathBuf {
        self.dir.join(format!("{}.{}", asset_id, format))
    }

    pub fn exists(&self, asset_id: &str, format: Format) -> bool {
        self.path(asset_id, format).is_file()
    }

    /// Write via a `.tmp` sibling so a killed run never leaves a half file in place.
    pub fn save(&self, bytes: &[u8], asset_id: &str, format: Format) -> Result<PathBuf> {
        let final_path = self.path(asset_id, format);
        let tmp_path = self.dir.join(format!("{}.{}.tmp", asset_id, format));
        fs::write(&tmp_path, bytes).with_context(|| format!("writing {:?}", tmp_path))?;
        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, final_path))?;
        Ok(final_path)
    }

    pub fn load(&self, asset_id: &str, format: Format) -> Result<Vec<u8>> {
        let path = self.path(asset_id, format);
        fs::read(&path).with_context(|| format!("reading raw file {:?} (run ingest first?)", path))
    }
}
