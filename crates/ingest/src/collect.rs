use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use regex::Regex;
use webextract_core::Target;

use crate::files::{listing_command, order_oldest_first, parse_listing};
use crate::remote::{RemoteExecutor, TransportError};
use crate::retry::RetryPolicy;
use crate::types::{IngestError, Result};

/// With no patterns configured every non-empty stderr is an anomaly.
#[derive(Debug, Clone, Default)]
pub struct StderrPolicy {
    benign: Vec<Regex>,
}

impl StderrPolicy {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn with_benign<S: AsRef<str>>(patterns: &[S]) -> std::result::Result<Self, regex::Error> {
        let benign = patterns
            .iter()
            .map(|pattern| Regex::new(pattern.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { benign })
    }

    pub fn is_strict(&self) -> bool {
        self.benign.is_empty()
    }

    /// True when every non-blank line of `stderr` matches a benign pattern.
    pub fn tolerates(&self, stderr: &str) -> bool {
        if self.is_strict() {
            return false;
        }
        stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .all(|line| self.benign.iter().any(|pattern| pattern.is_match(line)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub files: usize,
    pub bytes: u64,
}

pub fn list_log_files<E: RemoteExecutor + ?Sized>(
    executor: &E,
    target: &Target,
    directory: &str,
    prefix: &str,
    policy: &StderrPolicy,
    retry: &RetryPolicy,
) -> Result<Vec<String>> {
    let command = listing_command(directory, prefix);
    let output = retry.run("list log files", || executor.execute(target, &command))?;
    if !output.stderr.is_empty() {
        let location = target.location_label(directory);
        let stderr = output.stderr_text();
        let stderr = stderr.trim();
        if !policy.tolerates(stderr) {
            return Err(IngestError::ListingAnomaly {
                location,
                stderr: stderr.to_string(),
            });
        }
        tracing::warn!(location = %location, stderr, "tolerating listing stderr");
    } else if !output.success() {
        return Err(TransportError::Exit {
            host: target.label(),
            command,
            status: output.status_label(),
            stderr: String::new(),
        }
        .into());
    }
    Ok(order_oldest_first(parse_listing(&output.stdout_text())))
}

pub fn clear_working_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Nothing is written when `files` is empty.
pub fn fetch_into<E: RemoteExecutor + ?Sized>(
    executor: &E,
    target: &Target,
    files: &[String],
    working_file: &Path,
    retry: &RetryPolicy,
) -> Result<FetchSummary> {
    let mut summary = FetchSummary::default();
    if files.is_empty() {
        return Ok(summary);
    }
    if let Some(parent) = working_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(working_file)?);
    let mut needs_newline = false;
    for remote_path in files {
        let contents = retry.run("fetch log file", || executor.fetch_file(target, remote_path))?;
        tracing::debug!(
            host = %target.host,
            file = %remote_path,
            bytes = contents.len(),
            "fetched log file"
        );
        if needs_newline {
            writer.write_all(b"\n")?;
        }
        writer.write_all(&contents)?;
        needs_newline = contents.last().is_some_and(|byte| *byte != b'\n');
        summary.files += 1;
        summary.bytes += contents.len() as u64;
    }
    writer.flush()?;
    Ok(summary)
}
