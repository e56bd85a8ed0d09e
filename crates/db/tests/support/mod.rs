#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use webextract_core::{BucketKey, UsageAggregate};
use webextract_db::Db;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("timestamp")
        .with_timezone(&Utc)
}

pub fn key(tenant_id: i64, start: &str, interval_minutes: u32) -> BucketKey {
    BucketKey {
        tenant_id,
        interval_start: utc(start),
        interval_minutes,
    }
}

pub fn aggregate_of(entries: &[(BucketKey, u64)]) -> UsageAggregate {
    let mut aggregate = UsageAggregate::new();
    for (key, bytes) in entries {
        aggregate.add(*key, *bytes);
    }
    aggregate
}
