// src/fetch/mod.rs
pub mod datasets;
pub mod raw;

pub use datasets::{hud_datasets, DatasetSpec, Format};
pub use raw::RawStore;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::{path::PathBuf, time::Duration};
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::history::CheckpointStore;

/// Anything that can turn a URL into bytes.
pub trait Fetch {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher. Non-2xx responses are errors.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .with_context(|| format!("GET {}", url))?
            .error_for_status()
            .with_context(|| format!("bad status from {}", url))?;
        let bytes = resp
            .bytes()
            .with_context(|| format!("reading body of {}", url))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Already recorded in the checkpoint.
    Skipped,
    Fetched { bytes: usize, path: PathBuf },
    Failed { reason: String },
}

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub outcomes: Vec<(String, FetchOutcome)>,
}

impl IngestSummary {
    fn count(&self, pred: impl Fn(&FetchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn fetched(&self) -> usize {
        self.count(|o| matches!(o, FetchOutcome::Fetched { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FetchOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FetchOutcome::Failed { .. }))
    }

    pub fn outcome(&self, key: &str) -> Option<&FetchOutcome> {
        self.outcomes.iter().find(|(k, _)| k == key).map(|(_, o)| o)
    }
}

/// Downloads every dataset the checkpoint for `job` does not yet list.
pub struct Ingestor<'a> {
    pub fetcher: &'a dyn Fetch,
    pub raw: &'a RawStore,
    pub checkpoints: &'a dyn CheckpointStore,
    pub job: &'a str,
    pub timeout: Duration,
}

impl<'a> Ingestor<'a> {
    /// Per-dataset failures are logged and recorded in the summary; only
    /// checkpoint I/O errors abort the run.
    #[instrument(level = "info", skip_all, fields(job = self.job))]
    pub fn run(&self, datasets: &[DatasetSpec]) -> Result<IngestSummary> {
        let mut state = self.checkpoints.load(self.job)?;
        let mut summary = IngestSummary::default();

        let pending: Vec<&DatasetSpec> = datasets
            .iter()
            .filter(|d| !state.contains(&d.key))
            .collect();
        for d in datasets.iter().filter(|d| state.contains(&d.key)) {
            summary.outcomes.push((d.key.clone(), FetchOutcome::Skipped));
        }

        if pending.is_empty() {
            info!(datasets = datasets.len(), "All datasets up to date");
            return Ok(summary);
        }
        info!(pending = pending.len(), completed = state.len(), "starting ingest");

        for spec in pending {
            info!(key = %spec.key, url = %spec.url, "fetching {}", spec.name);
            let outcome = match self.fetch_one(spec) {
                Ok((bytes, path)) => {
                    state.mark(&spec.key);
                    self.checkpoints
                        .save(self.job, &state)
                        .with_context(|| format!("saving checkpoint after {}", spec.key))?;
                    info!(key = %spec.key, bytes, path = %path.display(), "saved");
                    FetchOutcome::Fetched { bytes, path }
                }
                Err(e) => {
                    error!(key = %spec.key, error = %format!("{:#}", e), "fetch failed, skipping");
                    FetchOutcome::Failed {
                        reason: format!("{:#}", e),
                    }
                }
            };
            summary.outcomes.push((spec.key.clone(), outcome));
        }

        if summary.failed() > 0 {
            warn!(
                failed = summary.failed(),
                fetched = summary.fetched(),
                "ingest finished with failures; rerun to retry"
            );
        } else {
            info!(fetched = summary.fetched(), "ingest finished");
        }
        Ok(summary)
    }

    fn fetch_one(&self, spec: &DatasetSpec) -> Result<(usize, PathBuf)> {
        let bytes = self.fetcher.fetch(&spec.url, self.timeout)?;
        let path = self.raw.save(&bytes, &spec.asset_id(), spec.format)?;
        Ok((bytes.len(), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::FileCheckpointStore;
    use anyhow::bail;
    use std::{cell::RefCell, collections::HashSet};
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeFetcher {
        calls: RefCell<Vec<String>>,
        failing: HashSet<String>,
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, url: &Url, _timeout: Duration) -> Result<Vec<u8>> {
            self.calls.borrow_mut().push(url.to_string());
            if self.failing.contains(url.as_str()) {
                bail!("503 Service Unavailable");
            }
            Ok(url.as_str().as_bytes().to_vec())
        }
    }

    fn specs() -> Vec<DatasetSpec> {
        ["a", "b", "c"]
            .iter()
            .map(|k| {
                DatasetSpec::new(
                    k,
                    &format!("https://example.test/{}.xlsx", k),
                    k,
                    "",
                    Format::Xlsx,
                )
                .unwrap()
            })
            .collect()
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        raw: RawStore,
        checkpoints: FileCheckpointStore,
    }

    fn fixture() -> Fixture {
        let tmp = tempdir().unwrap();
        let raw = RawStore::new(tmp.path().join("raw")).unwrap();
        let checkpoints = FileCheckpointStore::new(tmp.path().join("state")).unwrap();
        Fixture {
            _tmp: tmp,
            raw,
            checkpoints,
        }
    }

    fn ingest(fx: &Fixture, fetcher: &FakeFetcher) -> IngestSummary {
        Ingestor {
            fetcher,
            raw: &fx.raw,
            checkpoints: &fx.checkpoints,
            job: "hud_housing",
            timeout: Duration::from_secs(120),
        }
        .run(&specs())
        .unwrap()
    }

    #[test]
    fn fresh_run_fetches_everything_and_checkpoints() {
        let fx = fixture();
        let fetcher = FakeFetcher::default();
        let summary = ingest(&fx, &fetcher);
        assert_eq!(summary.fetched(), 3);
        assert_eq!(fetcher.calls.borrow().len(), 3);
        let state = fx.checkpoints.load("hud_housing").unwrap();
        assert_eq!(state.len(), 3);
        assert!(fx.raw.exists("hud_b", Format::Xlsx));
    }

    #[test]
    fn complete_checkpoint_fetches_nothing() {
        let fx = fixture();
        ingest(&fx, &FakeFetcher::default());

        let second = FakeFetcher::default();
        let summary = ingest(&fx, &second);
        assert!(second.calls.borrow().is_empty());
        assert_eq!(summary.skipped(), 3);
        assert_eq!(summary.fetched(), 0);
    }

    #[test]
    fn partial_checkpoint_fetches_only_missing() {
        let fx = fixture();
        let mut state = fx.checkpoints.load("hud_housing").unwrap();
        state.mark("a");
        state.mark("c");
        fx.checkpoints.save("hud_housing", &state).unwrap();

        let fetcher = FakeFetcher::default();
        let summary = ingest(&fx, &fetcher);
        assert_eq!(
            *fetcher.calls.borrow(),
            vec!["https://example.test/b.xlsx".to_string()]
        );
        assert_eq!(summary.outcome("a"), Some(&FetchOutcome::Skipped));
    }

    #[test]
    fn raw_file_without_checkpoint_entry_is_refetched() {
        // Simulates a crash between writing the file and saving the checkpoint.
        let fx = fixture();
        fx.raw.save(b"stale", "hud_a", Format::Xlsx).unwrap();

        let fetcher = FakeFetcher::default();
        ingest(&fx, &fetcher);
        assert!(fetcher
            .calls
            .borrow()
            .contains(&"https://example.test/a.xlsx".to_string()));
        assert_eq!(
            fx.raw.load("hud_a", Format::Xlsx).unwrap(),
            b"https://example.test/a.xlsx"
        );
    }

    #[test]
    fn failure_is_logged_and_run_continues() {
        let fx = fixture();
        let fetcher = FakeFetcher {
            failing: ["https://example.test/b.xlsx".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let summary = ingest(&fx, &fetcher);
        assert_eq!(summary.fetched(), 2);
        assert!(matches!(summary.outcome("b"), Some(FetchOutcome::Failed { .. })));
        let state = fx.checkpoints.load("hud_housing").unwrap();
        assert!(!state.contains("b"));
        assert!(state.contains("c"));

        let retry = FakeFetcher::default();
        ingest(&fx, &retry);
        assert_eq!(
            *retry.calls.borrow(),
            vec!["https://example.test/b.xlsx".to_string()]
        );
    }
}
