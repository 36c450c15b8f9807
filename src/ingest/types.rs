// src/ingest/types.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{EnrichmentError, SourceError};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct JobRecord {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: String, // identity key
    pub description: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub source: String, // configured site name
}

impl JobRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: None,
            location: None,
            url: url.into(),
            description: None,
            posted_date: None,
            source: source.into(),
        }
    }

    /// A description that is present and not just whitespace.
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// A configured origin of records (site parser or aggregator integration).
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<JobRecord>, SourceError>;
    fn name(&self) -> &str;
}

/// Second fetch that fills in a missing description.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn describe(&self, record: &JobRecord) -> Result<String, EnrichmentError>;
}
