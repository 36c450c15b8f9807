// src/storage.rs
//! Output artifact: JSON array or CSV with a header row, one record per row.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, WriteError};
use crate::ingest::types::JobRecord;

/// Column order of the CSV artifact; matches the JSON field order.
pub const CSV_HEADER: [&str; 7] = [
    "title",
    "company",
    "location",
    "url",
    "description",
    "posted_date",
    "source",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

pub trait RecordWriter: Send + Sync {
    fn write(
        &self,
        records: &[JobRecord],
        format: OutputFormat,
        destination: &Path,
    ) -> Result<(), WriteError>;
}

/// Writes to the local filesystem, creating parent directories as needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriter;

impl FileWriter {
    fn create(destination: &Path) -> Result<BufWriter<File>, WriteError> {
        let io_err = |source| WriteError::Io {
            path: destination.to_path_buf(),
            source,
        };
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        File::create(destination).map(BufWriter::new).map_err(io_err)
    }
}

impl RecordWriter for FileWriter {
    fn write(
        &self,
        records: &[JobRecord],
        format: OutputFormat,
        destination: &Path,
    ) -> Result<(), WriteError> {
        let out = Self::create(destination)?;
        match format {
            OutputFormat::Json => write_json(records, out),
            OutputFormat::Csv => write_csv(records, out),
        }
        .map_err(|source| WriteError::Io {
            path: destination.to_path_buf(),
            source,
        })
    }
}

/// Encoding failures surface as `io::Error` so callers attach their own destination.
pub fn write_json<W: Write>(records: &[JobRecord], mut out: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, records)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Header is written even for an empty run.
pub fn write_csv<W: Write>(records: &[JobRecord], out: W) -> io::Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for r in records {
        writer.serialize(r)?;
    }
    writer.flush()
}
