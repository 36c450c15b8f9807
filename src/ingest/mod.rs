// src/ingest/mod.rs
pub mod config;
pub mod dates;
pub mod dedup;
pub mod enrich;
pub mod fetcher;
pub mod filter;
pub mod location;
pub mod providers;
pub mod types;

use std::path::Path;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::error::WriteError;
use crate::ingest::filter::{filter_records, FilterRules};
use crate::ingest::location::LocationFilter;
use crate::ingest::types::{Enricher, JobRecord, SourceProvider};
use crate::storage::{OutputFormat, RecordWriter};

const MAX_TEXT_CHARS: usize = 5000;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_records_total", "Records parsed from sources.");
        describe_counter!("ingest_kept_total", "Records written after filter + dedupe.");
        describe_counter!(
            "ingest_filtered_total",
            "Records rejected by location or filter rules."
        );
        describe_counter!("ingest_dedup_total", "Records removed as duplicate URLs.");
        describe_counter!("ingest_source_errors_total", "Sources that failed a run.");
        describe_counter!(
            "ingest_enrich_errors_total",
            "Detail page fetches that yielded no description."
        );
        describe_histogram!("ingest_parse_ms", "Source page parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
    });
}

/// Plain text from scraped markup: decode entities, drop tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| {
        regex::Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>|</?[a-z!/][^>]*>")
            .expect("tag regex")
    });
    out = re_tags.replace_all(&out, " ").to_string();

    // “ ” ‘ ’ to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// A configured source plus its optional per-source stages.
pub struct SourceHandle {
    pub provider: Box<dyn SourceProvider>,
    pub enricher: Option<Box<dyn Enricher>>,
    pub location: Option<LocationFilter>,
}

impl SourceHandle {
    pub fn new(provider: Box<dyn SourceProvider>) -> Self {
        Self {
            provider,
            enricher: None,
            location: None,
        }
    }

    pub fn with_enricher(mut self, enricher: Box<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_location_filter(mut self, filter: LocationFilter) -> Self {
        self.location = Some(filter);
        self
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Outcome of one run. `fetched - filtered_out - duplicates == records.len()`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records: Vec<JobRecord>,
    pub fetched: usize,
    pub filtered_out: usize,
    pub duplicates: usize,
    pub source_failures: Vec<SourceFailure>,
    pub enrichment_failures: usize,
}

impl RunReport {
    pub fn kept(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Default)]
struct Gathered {
    records: Vec<JobRecord>,
    fetched: usize,
    location_dropped: usize,
    failures: Vec<SourceFailure>,
    enrichment_failures: usize,
}

/// Fetch every source in order. A failing source contributes nothing.
async fn gather(sources: &[SourceHandle]) -> Gathered {
    let mut g = Gathered::default();

    for src in sources {
        let batch = match src.provider.fetch_latest().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, source = src.name(), "source failed");
                counter!("ingest_source_errors_total").increment(1);
                g.failures.push(SourceFailure {
                    source: src.name().to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        g.fetched += batch.len();
        let fetched = batch.len();

        let batch: Vec<JobRecord> = match &src.location {
            Some(f) => batch.into_iter().filter(|r| f.accepts(r)).collect(),
            None => batch,
        };
        g.location_dropped += fetched - batch.len();

        for mut rec in batch {
            if let Some(enricher) = src.enricher.as_deref() {
                if !rec.has_description() {
                    match enricher.describe(&rec).await {
                        Ok(text) => rec.description = Some(text),
                        Err(e) => {
                            tracing::warn!(target: "ingest", error = %e, url = %rec.url, "enrichment failed");
                            counter!("ingest_enrich_errors_total").increment(1);
                            g.enrichment_failures += 1;
                        }
                    }
                }
            }
            g.records.push(rec);
        }

        tracing::info!(
            target: "ingest",
            source = src.name(),
            fetched,
            gathered = g.records.len(),
            "source done"
        );
    }

    g
}

/// Filter then dedupe + sort. Returns (kept, filtered_out, duplicates).
pub fn filter_dedup_sort(
    raw: Vec<JobRecord>,
    rules: &FilterRules,
    now: DateTime<Utc>,
) -> (Vec<JobRecord>, usize, usize) {
    let total = raw.len();
    let passed = filter_records(&raw, rules, now);
    let filtered_out = total - passed.len();

    let (mut kept, duplicates) = dedup::dedupe(passed);
    dedup::sort_by_recency(&mut kept);
    (kept, filtered_out, duplicates)
}

/// Run the pipeline once over `sources` with resolved `rules`.
pub async fn run_once(sources: &[SourceHandle], rules: &FilterRules, now: DateTime<Utc>) -> RunReport {
    ensure_metrics_described();

    let g = gather(sources).await;
    let (records, filtered, duplicates) = filter_dedup_sort(g.records, rules, now);
    let filtered_out = filtered + g.location_dropped;

    counter!("ingest_kept_total").increment(records.len() as u64);
    counter!("ingest_filtered_total").increment(filtered_out as u64);
    counter!("ingest_dedup_total").increment(duplicates as u64);
    gauge!("ingest_pipeline_last_run_ts").set(now.timestamp().max(0) as f64);

    tracing::info!(
        target: "ingest",
        fetched = g.fetched,
        kept = records.len(),
        filtered_out,
        duplicates,
        failed_sources = g.failures.len(),
        "run complete"
    );

    RunReport {
        records,
        fetched: g.fetched,
        filtered_out,
        duplicates,
        source_failures: g.failures,
        enrichment_failures: g.enrichment_failures,
    }
}

/// [`run_once`] then hand the records to `writer`. A write failure is the only fatal outcome.
pub async fn run_and_write(
    sources: &[SourceHandle],
    rules: &FilterRules,
    now: DateTime<Utc>,
    writer: &dyn RecordWriter,
    format: OutputFormat,
    destination: &Path,
) -> Result<RunReport, WriteError> {
    let report = run_once(sources, rules, now).await;
    writer.write(&report.records, format, destination)?;
    tracing::info!(
        target: "storage",
        path = %destination.display(),
        %format,
        records = report.records.len(),
        "output written"
    );
    Ok(report)
}
