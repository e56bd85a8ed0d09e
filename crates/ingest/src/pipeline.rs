use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use webextract_core::{ReconcileStats, Target, UsageAggregate};
use webextract_db::Db;

use crate::collect::{StderrPolicy, clear_working_file, fetch_into, list_log_files};
use crate::files::DEFAULT_LOG_PREFIX;
use crate::parser::{DEFAULT_SERVICE_PATH, RecordExtractor};
use crate::remote::RemoteExecutor;
use crate::retry::RetryPolicy;
use crate::totals::aggregate_from_reader;
use crate::types::{ExtractStats, IngestError, IngestIssue, Result};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;
pub const DEFAULT_WORKING_FILE: &str = "data/access.log";

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub interval_minutes: u32,
    /// Scratch file reused for every location. Runs sharing one path must not overlap.
    pub working_file: PathBuf,
    pub log_prefix: String,
    pub service_path: String,
    pub benign_stderr: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            working_file: PathBuf::from(DEFAULT_WORKING_FILE),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            benign_stderr: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(IngestError::Config(
                "interval must be greater than zero minutes".to_string(),
            ));
        }
        if self.log_prefix.trim().is_empty() {
            return Err(IngestError::Config("log prefix must not be empty".to_string()));
        }
        if self.service_path.trim().is_empty() {
            return Err(IngestError::Config(
                "service path must not be empty".to_string(),
            ));
        }
        if self.working_file.as_os_str().is_empty() {
            return Err(IngestError::Config(
                "working file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Collects and aggregates every location of every target, in order.
///
/// The first fatal error aborts the whole collection; nothing partial is returned.
pub fn collect_usage<E: RemoteExecutor + ?Sized>(
    targets: &[Target],
    executor: &E,
    options: &ExtractOptions,
) -> Result<(UsageAggregate, ExtractStats)> {
    options.validate()?;
    let extractor = RecordExtractor::new(&options.service_path)?;
    let policy = StderrPolicy::with_benign(options.benign_stderr.as_slice())?;

    let mut aggregate = UsageAggregate::new();
    let mut stats = ExtractStats::default();
    for target in targets {
        stats.hosts += 1;
        if target.directories.is_empty() {
            tracing::info!(host = %target.label(), "no log locations registered");
        }
        for directory in &target.directories {
            stats.locations += 1;
            let location = target.location_label(directory);
            clear_working_file(&options.working_file)?;

            let files = list_log_files(
                executor,
                target,
                directory,
                &options.log_prefix,
                &policy,
                &options.retry,
            )?;
            let fetched = fetch_into(
                executor,
                target,
                &files,
                &options.working_file,
                &options.retry,
            )?;
            stats.files_fetched += fetched.files;
            stats.bytes_fetched += fetched.bytes;

            let file = match File::open(&options.working_file) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(location = %location, "no log files fetched, skipping");
                    stats.locations_skipped += 1;
                    stats.issues.push(IngestIssue {
                        location,
                        message: "no log files fetched".to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let mut location_usage = UsageAggregate::new();
            let counts = aggregate_from_reader(
                BufReader::new(file),
                &extractor,
                options.interval_minutes,
                &mut location_usage,
            )?;
            tracing::info!(
                location = %location,
                files = fetched.files,
                bytes = fetched.bytes,
                lines = counts.lines_read,
                records = counts.records_matched,
                buckets = location_usage.len(),
                "collected location"
            );
            stats.lines.add(counts);
            aggregate.merge(location_usage);
        }
    }
    stats.buckets = aggregate.len();
    Ok((aggregate, stats))
}

pub fn store_usage(
    db: &mut Db,
    aggregate: UsageAggregate,
    retry: &RetryPolicy,
) -> Result<ReconcileStats> {
    let stats = retry.run("reconcile usage", || db.reconcile_usage(&aggregate))?;
    Ok(stats)
}

pub fn extract_targets<E: RemoteExecutor + ?Sized>(
    db: &mut Db,
    targets: &[Target],
    executor: &E,
    options: &ExtractOptions,
) -> Result<ExtractStats> {
    let (aggregate, mut stats) = collect_usage(targets, executor, options)?;
    let reconciled = store_usage(db, aggregate, &options.retry)?;
    stats.rows_inserted = reconciled.inserted;
    stats.rows_updated = reconciled.updated;
    tracing::info!(
        hosts = stats.hosts,
        locations = stats.locations,
        skipped = stats.locations_skipped,
        records = stats.lines.records_matched,
        buckets = stats.buckets,
        inserted = stats.rows_inserted,
        updated = stats.rows_updated,
        "extract finished"
    );
    Ok(stats)
}

pub fn run_extract<E: RemoteExecutor + ?Sized>(
    db: &mut Db,
    executor: &E,
    options: &ExtractOptions,
) -> Result<ExtractStats> {
    let targets = db.list_targets()?;
    tracing::info!(targets = targets.len(), "starting extract");
    extract_targets(db, &targets, executor, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        ExtractOptions::default().validate().expect("valid");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let options = ExtractOptions {
            interval_minutes: 0,
            ..ExtractOptions::default()
        };
        assert!(matches!(options.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let options = ExtractOptions {
            log_prefix: " ".to_string(),
            ..ExtractOptions::default()
        };
        assert!(matches!(options.validate(), Err(IngestError::Config(_))));
    }
}
