use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Tenant id written by the web tier when a request has no tenant.
pub const NO_TENANT: i64 = -1;

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub host: String,
    pub username: String,
    pub credentials: Credentials,
    pub directories: Vec<String>,
}

impl Target {
    pub fn label(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    pub fn location_label(&self, directory: &str) -> String {
        format!("{}@{}:{}", self.username, self.host, directory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub tenant_id: i64,
    pub timestamp: DateTime<FixedOffset>,
    pub bytes: u64,
}

/// Start of the fixed-width bucket containing `ts`.
///
/// Buckets are aligned to the Unix epoch, not to calendar days: two instants share a bucket
/// iff their epoch milliseconds floor-divide to the same quotient. Returns `None` for a zero
/// width.
pub fn bucket_start<Tz: TimeZone>(ts: &DateTime<Tz>, interval_minutes: u32) -> Option<DateTime<Utc>> {
    if interval_minutes == 0 {
        return None;
    }
    let width_ms = i64::from(interval_minutes) * MILLIS_PER_MINUTE;
    let start_ms = ts.timestamp_millis().div_euclid(width_ms) * width_ms;
    DateTime::<Utc>::from_timestamp_millis(start_ms)
}

/// Identity of one aggregate bucket. Ordered by tenant, then start, then width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub tenant_id: i64,
    pub interval_start: DateTime<Utc>,
    pub interval_minutes: u32,
}

impl BucketKey {
    pub fn for_record(record: &UsageRecord, interval_minutes: u32) -> Option<Self> {
        Some(Self {
            tenant_id: record.tenant_id,
            interval_start: bucket_start(&record.timestamp, interval_minutes)?,
            interval_minutes,
        })
    }
}

/// Bytes per bucket for one run, iterated in `BucketKey` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageAggregate {
    buckets: BTreeMap<BucketKey, u64>,
}

impl UsageAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: BucketKey, bytes: u64) {
        let total = self.buckets.entry(key).or_insert(0);
        *total = total.saturating_add(bytes);
    }

    pub fn add_record(&mut self, record: &UsageRecord, interval_minutes: u32) -> Option<BucketKey> {
        let key = BucketKey::for_record(record, interval_minutes)?;
        self.add(key, record.bytes);
        Some(key)
    }

    pub fn merge(&mut self, other: UsageAggregate) {
        for (key, bytes) in other {
            self.add(key, bytes);
        }
    }

    pub fn get(&self, key: &BucketKey) -> Option<u64> {
        self.buckets.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, BucketKey, u64> {
        self.buckets.iter()
    }

    pub fn total_bytes(&self) -> u64 {
        self.buckets
            .values()
            .fold(0u64, |acc, bytes| acc.saturating_add(*bytes))
    }
}

impl IntoIterator for UsageAggregate {
    type Item = (BucketKey, u64);
    type IntoIter = btree_map::IntoIter<BucketKey, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

impl<'a> IntoIterator for &'a UsageAggregate {
    type Item = (&'a BucketKey, &'a u64);
    type IntoIter = btree_map::Iter<'a, BucketKey, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

/// Persisted usage row. At most one exists per (tenant, start, width).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUsage {
    pub id: i64,
    pub tenant_id: i64,
    pub interval_start: DateTime<Utc>,
    pub interval_minutes: u32,
    pub bytes: u64,
}

impl DataUsage {
    pub fn key(&self) -> BucketKey {
        BucketKey {
            tenant_id: self.tenant_id,
            interval_start: self.interval_start,
            interval_minutes: self.interval_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub updated: usize,
}
