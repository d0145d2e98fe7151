use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Dataset keys an ingestion job has finished fetching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    #[serde(default)]
    pub completed: BTreeSet<String>,
}

impl CheckpointState {
    pub fn contains(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    /// Returns `false` if `key` was already recorded.
    pub fn mark(&mut self, key: &str) -> bool {
        self.completed.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

/// Where checkpoint state lives between runs.
pub trait CheckpointStore {
    fn load(&self, job: &str) -> Result<CheckpointState>;
    fn save(&self, job: &str, state: &CheckpointState) -> Result<()>;
}

/// One `<job>.json` file per job under `dir`.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Construct a store at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating checkpoint directory {:?}", &dir))?;
        Ok(Self { dir })
    }

    pub fn path(&self, job: &str) -> PathBuf {
        self.dir.join(format!("{}.json", job))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, job: &str) -> Result<CheckpointState> {
        let path = self.path(job);
        if !path.exists() {
            debug!(job, "no checkpoint yet");
            return Ok(CheckpointState::default());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {:?}", path))
    }

    /// Write atomically: to a tmp file, then rename over the original.
    fn save(&self, job: &str, state: &CheckpointState) -> Result<()> {
        let path = self.path(job);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", job));

        let mut tmp = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {:?}", tmp_path))?;
        serde_json::to_writer_pretty(&mut tmp, state).context("serializing checkpoint")?;
        tmp.write_all(b"\n")?;
        tmp.sync_all()
            .with_context(|| format!("flushing {:?}", tmp_path))?;
        drop(tmp);

        fs::rename(&tmp_path, &path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
        debug!(job, completed = state.len(), "checkpoint saved");
        Ok(())
    }
}
