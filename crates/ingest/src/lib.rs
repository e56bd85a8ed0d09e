mod collect;
mod files;
mod parser;
mod pipeline;
mod remote;
mod retry;
mod totals;
mod types;

pub use collect::{FetchSummary, StderrPolicy, clear_working_file, fetch_into, list_log_files};
pub use files::{
    DEFAULT_LOG_PREFIX, RotationSuffix, listing_command, order_oldest_first, parse_listing,
    rotation_suffix,
};
pub use parser::{
    DEFAULT_SERVICE_PATH, LineOutcome, LineSkip, RawTokens, RecordExtractor,
    parse_access_log_timestamp,
};
pub use pipeline::{
    DEFAULT_INTERVAL_MINUTES, DEFAULT_WORKING_FILE, ExtractOptions, collect_usage,
    extract_targets, run_extract, store_usage,
};
pub use remote::{
    CommandOutput, RemoteExecutor, SshExecutor, SshOptions, TransportError, shell_quote,
};
pub use retry::RetryPolicy;
pub use totals::{LineCounts, aggregate_from_reader};
pub use types::{ExtractStats, IngestError, IngestIssue, Result};
