//! job-harvest: fetch postings from configured career sites, filter them,
//! and write one JSON or CSV artifact per run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use job_harvest::ingest::config::{load_config_default, load_config_from};
use job_harvest::ingest::fetcher::{Fetcher, HttpFetcher};
use job_harvest::ingest::providers::build_sources;
use job_harvest::notify::EmailReporter;
use job_harvest::{run_and_write, FileWriter, OutputFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "job-harvest")]
#[command(about = "Collect, filter and export job postings")]
struct Cli {
    /// Config file (TOML or JSON). Defaults to $JOB_HARVEST_CONFIG, then config/jobs.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the results.
    #[arg(long)]
    output: PathBuf,

    /// Overrides `output_format` from the config.
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Extra include keyword for this run (repeatable).
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Email the run summary (SMTP settings from env).
    #[arg(long)]
    email: bool,

    /// JSON log lines instead of compact text.
    #[arg(long)]
    log_json: bool,
}

fn parse_format(s: &str) -> std::result::Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_harvest=info,ingest=info,storage=info,notify=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env when present (SMTP settings, RUST_LOG, JOB_HARVEST_CONFIG).
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let cfg = match &cli.config {
        Some(p) => load_config_from(p)?,
        None => load_config_default()?,
    };
    let format = cli.format.unwrap_or(cfg.output_format);
    let rules = cfg.resolve_rules(&cli.keywords);

    let fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpFetcher::new(cfg.fetcher_settings()).context("building http client")?);
    let sources = build_sources(&cfg, fetcher);
    tracing::info!(
        sources = sources.len(),
        %format,
        output = %cli.output.display(),
        extra_keywords = cli.keywords.len(),
        "starting run"
    );

    let now = chrono::Utc::now();
    let report = run_and_write(&sources, &rules, now, &FileWriter, format, &cli.output)
        .await
        .context("writing output")?;

    for failure in &report.source_failures {
        tracing::warn!(source = %failure.source, error = %failure.error, "source contributed no records");
    }
    tracing::info!(
        fetched = report.fetched,
        kept = report.kept(),
        filtered_out = report.filtered_out,
        duplicates = report.duplicates,
        enrichment_failures = report.enrichment_failures,
        "done"
    );

    if cli.email {
        let sent = match EmailReporter::from_env() {
            Ok(reporter) => {
                reporter
                    .send_report(&report, now.date_naive(), Some((cli.output.as_path(), format)))
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            tracing::warn!(target: "notify", error = ?e, "email report not sent");
        }
    }

    Ok(())
}
