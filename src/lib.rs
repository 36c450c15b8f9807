// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod error;
pub mod ingest;
pub mod notify;
pub mod storage;

pub use crate::error::{ConfigError, EnrichmentError, FetchError, SourceError, WriteError};
pub use crate::ingest::filter::FilterRules;
pub use crate::ingest::types::{Enricher, JobRecord, SourceProvider};
pub use crate::ingest::{run_and_write, run_once, RunReport, SourceFailure, SourceHandle};
pub use crate::storage::{FileWriter, OutputFormat, RecordWriter};
