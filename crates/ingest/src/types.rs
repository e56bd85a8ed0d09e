use std::io;

use serde::Serialize;

use crate::remote::TransportError;
use crate::totals::LineCounts;

/// Summary of one extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractStats {
    pub hosts: usize,
    pub locations: usize,
    pub locations_skipped: usize,
    pub files_fetched: usize,
    pub bytes_fetched: u64,
    pub lines: LineCounts,
    pub buckets: usize,
    pub rows_inserted: usize,
    pub rows_updated: usize,
    pub issues: Vec<IngestIssue>,
}

/// Non-fatal issues encountered during a run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestIssue {
    pub location: String,
    pub message: String,
}

/// Errors that abort an extraction run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("unexpected stderr listing {location}: {stderr}")]
    ListingAnomaly { location: String, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("db error: {0}")]
    Db(#[from] webextract_db::DbError),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("{0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
