use chrono::{DateTime, FixedOffset};
use regex::{Captures, Regex};
use webextract_core::{NO_TENANT, UsageRecord};

pub const DEFAULT_SERVICE_PATH: &str = "/networking/Service";

const ACCESS_LOG_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSkip {
    Unmatched,
    BadTimestamp,
    BadBytes,
    BadTenant,
    NoTenant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Record(UsageRecord),
    Skipped(LineSkip),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTokens<'a> {
    pub client: &'a str,
    pub timestamp: &'a str,
    pub bytes: &'a str,
    pub tenant: &'a str,
}

/// Matches access-log lines that carry a tenant id for the service endpoint.
///
/// The request pattern is tried first: the tenant id is a query parameter of the request
/// itself. Otherwise the referrer pattern looks for it in the referring page's URL.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    request: Regex,
    referrer: Regex,
}

impl RecordExtractor {
    pub fn new(service_path: &str) -> Result<Self, regex::Error> {
        let service = regex::escape(service_path);
        let request = Regex::new(&format!(
            r#"^(?P<client>\S+) \S+ \S+ (?P<ts>\[[^\]]*\]) "GET {service}\?(?:[^"]*?[&?])?id=(?P<tenant>[^&"\s]*)[^"]*" \S+ (?P<bytes>\S+)"#
        ))?;
        let referrer = Regex::new(&format!(
            r#"^(?P<client>\S+) \S+ \S+ (?P<ts>\[[^\]]*\]) "[^"]*" \S+ (?P<bytes>\S+) "https?://[^"]*?{service}\?(?:[^"]*?[&?])?id=(?P<tenant>[^&"\s]*)"#
        ))?;
        Ok(Self { request, referrer })
    }

    pub fn tokens<'a>(&self, line: &'a str) -> Option<RawTokens<'a>> {
        self.request
            .captures(line)
            .or_else(|| self.referrer.captures(line))
            .and_then(|caps| raw_tokens(&caps))
    }

    pub fn classify(&self, line: &str) -> LineOutcome {
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        let Some(tokens) = self.tokens(line) else {
            return LineOutcome::Skipped(LineSkip::Unmatched);
        };
        let Some(timestamp) = parse_access_log_timestamp(tokens.timestamp) else {
            return LineOutcome::Skipped(LineSkip::BadTimestamp);
        };
        let Ok(bytes) = tokens.bytes.parse::<u64>() else {
            return LineOutcome::Skipped(LineSkip::BadBytes);
        };
        let Ok(tenant_id) = tokens.tenant.parse::<i64>() else {
            return LineOutcome::Skipped(LineSkip::BadTenant);
        };
        if tenant_id == NO_TENANT {
            return LineOutcome::Skipped(LineSkip::NoTenant);
        }
        LineOutcome::Record(UsageRecord {
            tenant_id,
            timestamp,
            bytes,
        })
    }

    pub fn extract(&self, line: &str) -> Option<UsageRecord> {
        match self.classify(line) {
            LineOutcome::Record(record) => Some(record),
            LineOutcome::Skipped(_) => None,
        }
    }
}

fn raw_tokens<'a>(caps: &Captures<'a>) -> Option<RawTokens<'a>> {
    let span = |name: &str| caps.name(name).map(|m| m.as_str());
    Some(RawTokens {
        client: span("client")?,
        timestamp: span("ts")?,
        bytes: span("bytes")?,
        tenant: span("tenant")?,
    })
}

/// Parses `[10/Oct/2000:13:55:36 -0700]`, keeping the log's own offset.
pub fn parse_access_log_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    DateTime::parse_from_str(trimmed, ACCESS_LOG_TIME_FORMAT).ok()
}
