use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use webextract_core::{Credentials, DataUsage};

use crate::error::{DbError, Result};

/// Canonical text form of a bucket start. Lookups compare this string exactly.
pub fn format_interval_start(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_interval_start(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

pub(crate) fn bytes_to_sql(bytes: u64) -> Result<i64> {
    i64::try_from(bytes)
        .map_err(|_| DbError::InvalidInput(format!("byte count {} does not fit the store", bytes)))
}

pub(crate) struct RawDataUsage {
    pub id: i64,
    pub tenant_id: i64,
    pub interval_start: String,
    pub interval_minutes: i64,
    pub bytes: i64,
}

pub(crate) fn row_to_raw_data_usage(
    row: &Row<'_>,
) -> std::result::Result<RawDataUsage, rusqlite::Error> {
    Ok(RawDataUsage {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        interval_start: row.get(2)?,
        interval_minutes: row.get(3)?,
        bytes: row.get(4)?,
    })
}

impl RawDataUsage {
    pub(crate) fn into_data_usage(self) -> Result<DataUsage> {
        Ok(DataUsage {
            id: self.id,
            tenant_id: self.tenant_id,
            interval_start: parse_interval_start(&self.interval_start)?,
            interval_minutes: self.interval_minutes.max(0) as u32,
            bytes: self.bytes.max(0) as u64,
        })
    }
}

pub(crate) fn credentials_from_columns(
    password: Option<String>,
    key_file: Option<String>,
) -> Credentials {
    Credentials {
        password: password.filter(|value| !value.is_empty()),
        key_file: key_file
            .filter(|value| !value.is_empty())
            .map(PathBuf::from),
    }
}
