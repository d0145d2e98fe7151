use anyhow::Result;
use clap::{builder::PossibleValuesParser, Parser};
use hudscraper::{
    config::Config,
    pipeline::{self, RunOptions},
    transforms,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Fetch HUD housing spreadsheets and publish rents, income limits and homeless counts.
#[derive(Parser, Debug)]
#[command(name = "hudscraper", version, about)]
struct Cli {
    /// Only fetch raw files
    #[arg(long, conflicts_with = "transform_only")]
    ingest_only: bool,

    /// Only transform previously fetched files
    #[arg(long)]
    transform_only: bool,

    /// Run a single transform (implies no ingest)
    #[arg(value_parser = PossibleValuesParser::new(transforms::NAMES))]
    transform: Option<String>,

    /// YAML config file; HUD_* environment variables override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();

    // ─── 2) resolve config ───────────────────────────────────────────
    let config = Config::load(cli.config.as_deref())?;
    info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        job = %config.job_name,
        "startup"
    );

    // ─── 3) ingest, then transform ───────────────────────────────────
    let options = RunOptions {
        ingest_only: cli.ingest_only,
        transform_only: cli.transform_only,
        transform: cli.transform,
    };
    if let Err(e) = pipeline::run(&config, &options) {
        error!(error = %format!("{:#}", e), "run failed");
        return Err(e);
    }
    info!("done");
    Ok(())
}
