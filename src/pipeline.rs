use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::Config;
use crate::fetch::{hud_datasets, HttpFetcher, IngestSummary, Ingestor, RawStore};
use crate::history::FileCheckpointStore;
use crate::publish::{LocalPublisher, PublishMode, Publisher};
use crate::transforms::{self, Transform};
use crate::validate::{validate, ValidationReport};

/// Which phases to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub ingest_only: bool,
    pub transform_only: bool,
    /// Run just this transform (and skip ingest).
    pub transform: Option<String>,
}

impl RunOptions {
    pub fn should_ingest(&self) -> bool {
        !self.transform_only && self.transform.is_none()
    }

    pub fn should_transform(&self) -> bool {
        !self.ingest_only
    }
}

pub fn ingest(config: &Config) -> Result<IngestSummary> {
    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let raw = RawStore::new(config.raw_dir())?;
    let checkpoints = FileCheckpointStore::new(&config.state_dir)?;
    Ingestor {
        fetcher: &fetcher,
        raw: &raw,
        checkpoints: &checkpoints,
        job: &config.job_name,
        timeout: config.fetch_timeout,
    }
    .run(&hud_datasets()?)
}

/// Build, validate, then publish. Nothing is written if validation fails.
#[instrument(level = "info", skip_all, fields(transform = transform.name()))]
pub fn run_transform(
    transform: &dyn Transform,
    raw: &RawStore,
    publisher: &dyn Publisher,
) -> Result<ValidationReport> {
    let dataset = transform.build(raw)?;
    let batch = dataset
        .to_record_batch()
        .with_context(|| format!("converting {} to Arrow", transform.dataset_id()))?;
    let report = validate(&batch, &transform.plan())
        .with_context(|| format!("validating {}", transform.dataset_id()))?;
    publisher.publish(&batch, transform.dataset_id(), PublishMode::Overwrite)?;
    publisher.publish_metadata(transform.dataset_id(), &transform.metadata())?;
    Ok(report)
}

pub fn run(config: &Config, options: &RunOptions) -> Result<()> {
    info!(run_id = %config.run_id, "starting");

    if options.should_ingest() {
        info!("=== Phase 1: Ingest ===");
        let summary = ingest(config)?;
        info!(
            fetched = summary.fetched(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "ingest done"
        );
    }

    if options.should_transform() {
        info!("=== Phase 2: Transform ===");
        let raw = RawStore::new(config.raw_dir())?;
        let publisher = LocalPublisher::new(&config.output_dir, &config.run_id)?;
        let selected: Vec<Box<dyn Transform>> = match &options.transform {
            Some(name) => vec![transforms::by_name(name)
                .with_context(|| format!("unknown transform {}", name))?],
            None => transforms::all(),
        };
        for t in selected {
            info!("--- {} ---", t.name());
            let report = run_transform(t.as_ref(), &raw, &publisher)?;
            info!(dataset = %report.dataset, rows = report.rows, "published");
        }
    }
    Ok(())
}
