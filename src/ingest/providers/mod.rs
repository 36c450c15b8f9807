// src/ingest/providers/mod.rs
pub mod aggregator;
pub mod generic;
pub mod workday;

use std::sync::Arc;

use crate::error::{FetchError, SourceError};
use crate::ingest::config::{AppConfig, SiteConfig, SiteKind};
use crate::ingest::enrich::DetailPageEnricher;
use crate::ingest::fetcher::Fetcher;
use crate::ingest::location::LocationFilter;
use crate::ingest::types::SourceProvider;
use crate::ingest::SourceHandle;

pub use aggregator::AggregatorProvider;
pub use generic::GenericSiteProvider;
pub use workday::WorkdayProvider;

/// Build one handle per enabled site, in config order.
pub fn build_sources(cfg: &AppConfig, fetcher: Arc<dyn Fetcher>) -> Vec<SourceHandle> {
    cfg.enabled_sites()
        .map(|site| build_source(site, fetcher.clone()))
        .collect()
}

pub fn build_source(site: &SiteConfig, fetcher: Arc<dyn Fetcher>) -> SourceHandle {
    let provider: Box<dyn SourceProvider> = match &site.kind {
        SiteKind::Generic(g) => Box::new(GenericSiteProvider::new(
            site.name.clone(),
            g.clone(),
            fetcher.clone(),
        )),
        SiteKind::Workday(w) => Box::new(WorkdayProvider::new(
            site.name.clone(),
            w.clone(),
            fetcher.clone(),
        )),
        SiteKind::Aggregator(a) => Box::new(AggregatorProvider::new(
            site.name.clone(),
            a.clone(),
            fetcher.clone(),
        )),
    };

    let mut handle = SourceHandle::new(provider);
    if let Some(sel) = site.detail_selector() {
        handle = handle.with_enricher(Box::new(DetailPageEnricher::new(fetcher, sel)));
    }
    if let Some(filter) = LocationFilter::new(&site.target_states) {
        handle = handle.with_location_filter(filter);
    }
    tracing::debug!(
        target: "ingest",
        source = %site.name,
        kind = site.kind.label(),
        enrich = handle.enricher.is_some(),
        "source configured"
    );
    handle
}

/// Outcome for a source whose every request failed.
pub(crate) fn all_failed(attempts: usize, last: FetchError) -> SourceError {
    if attempts <= 1 {
        SourceError::Fetch(last)
    } else {
        SourceError::AllRequestsFailed { attempts }
    }
}

/// Parse wall time + raw record count, once per page.
pub(crate) fn record_parse_metrics(started: std::time::Instant, records: usize) {
    let ms = started.elapsed().as_secs_f64() * 1_000.0;
    metrics::histogram!("ingest_parse_ms").record(ms);
    metrics::counter!("ingest_records_total").increment(records as u64);
}
