//! Typed errors for the harvesting pipeline.
//!
//! Per-source and per-record failures (`SourceError`, `EnrichmentError`) are
//! absorbed by the orchestrator; only `WriteError` aborts a run.

use std::path::PathBuf;
use thiserror::Error;

/// A single HTTP request failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid request url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A source contributed no records this run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("fetch failed: every request failed ({attempts} attempted)")]
    AllRequestsFailed { attempts: usize },

    #[error("parse failed: {0}")]
    Parse(String),
}

impl SourceError {
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// Best-effort detail fetch failed; the record is kept as-is.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("no element matched `{selector}` on {url}")]
    NoMatch { selector: String, url: String },
}

/// The output artifact could not be produced.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Config file was readable but not usable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config must include at least one site")]
    NoSites,

    #[error("site #{index} has an empty name")]
    EmptySiteName { index: usize },

    #[error("site `{site}`: {reason}")]
    InvalidSite { site: String, reason: String },

    #[error("unsupported output format `{0}` (expected json or csv)")]
    UnknownFormat(String),
}
