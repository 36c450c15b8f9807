// src/ingest/enrich.rs
use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::EnrichmentError;
use crate::ingest::fetcher::Fetcher;
use crate::ingest::normalize_text;
use crate::ingest::types::{Enricher, JobRecord};

/// Fills a missing description from the posting's own page.
pub struct DetailPageEnricher {
    fetcher: Arc<dyn Fetcher>,
    selector: String,
}

impl DetailPageEnricher {
    pub fn new(fetcher: Arc<dyn Fetcher>, selector: impl Into<String>) -> Self {
        Self {
            fetcher,
            selector: selector.into(),
        }
    }

    fn no_match(&self, url: &str) -> EnrichmentError {
        EnrichmentError::NoMatch {
            selector: self.selector.clone(),
            url: url.to_string(),
        }
    }

    /// First element matching the selector, flattened to normalized text.
    pub fn extract(&self, html: &str, url: &str) -> Result<String, EnrichmentError> {
        let sel = Selector::parse(&self.selector).map_err(|_| self.no_match(url))?;
        let doc = Html::parse_document(html);
        let text = doc
            .select(&sel)
            .next()
            .map(|el| normalize_text(&el.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();
        if text.is_empty() {
            return Err(self.no_match(url));
        }
        Ok(text)
    }
}

#[async_trait]
impl Enricher for DetailPageEnricher {
    async fn describe(&self, record: &JobRecord) -> Result<String, EnrichmentError> {
        let html = self.fetcher.get(&record.url).await?;
        self.extract(&html, &record.url)
    }
}
