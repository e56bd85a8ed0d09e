use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ingest::{
    DEFAULT_INTERVAL_MINUTES, DEFAULT_LOG_PREFIX, DEFAULT_SERVICE_PATH, DEFAULT_WORKING_FILE,
    ExtractOptions, RetryPolicy, SshOptions,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "webextract.toml";
const DEFAULT_DATABASE: &str = "data/webextract.sqlite";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub interval_minutes: u32,
    pub database: PathBuf,
    pub working_file: PathBuf,
    pub log_prefix: String,
    pub service_path: String,
    pub ssh: SshConfig,
    pub retry: RetryConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            database: PathBuf::from(DEFAULT_DATABASE),
            working_file: PathBuf::from(DEFAULT_WORKING_FILE),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            ssh: SshConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub program: String,
    pub password_program: String,
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
    /// Listing stderr lines matching any of these are tolerated.
    pub benign_stderr: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        let defaults = SshOptions::default();
        Self {
            program: defaults.program,
            password_program: defaults.password_program,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            command_timeout_secs: defaults.command_timeout.as_secs(),
            benign_stderr: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            attempts: defaults.attempts,
            backoff_ms: defaults.backoff.as_millis() as u64,
        }
    }
}

impl CliConfig {
    pub fn apply_overrides(
        &mut self,
        interval: Option<u32>,
        database: Option<PathBuf>,
        working_file: Option<PathBuf>,
    ) {
        if let Some(interval) = interval {
            self.interval_minutes = interval;
        }
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(working_file) = working_file {
            self.working_file = working_file;
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            interval_minutes: self.interval_minutes,
            working_file: self.working_file.clone(),
            log_prefix: self.log_prefix.clone(),
            service_path: self.service_path.clone(),
            benign_stderr: self.ssh.benign_stderr.clone(),
            retry: RetryPolicy {
                attempts: self.retry.attempts,
                backoff: Duration::from_millis(self.retry.backoff_ms),
            },
        }
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            program: self.ssh.program.clone(),
            password_program: self.ssh.password_program.clone(),
            connect_timeout: Duration::from_secs(self.ssh.connect_timeout_secs),
            command_timeout: Duration::from_secs(self.ssh.command_timeout_secs),
        }
    }
}

/// Reads the config file. Without an explicit path a missing default file yields defaults.
pub fn load(explicit: Option<&Path>) -> Result<CliConfig, String> {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
            return Ok(CliConfig::default());
        }
        Err(err) => return Err(format!("read config {}: {}", path.display(), err)),
    };
    toml::from_str(&contents).map_err(|err| format!("parse config {}: {}", path.display(), err))
}
