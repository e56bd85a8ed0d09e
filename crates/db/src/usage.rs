use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use webextract_core::{BucketKey, DataUsage, ReconcileStats, UsageAggregate};

use crate::Db;
use crate::error::Result;
use crate::helpers::{bytes_to_sql, format_interval_start, row_to_raw_data_usage};

impl Db {
    /// Writes every bucket of `aggregate` in one transaction.
    ///
    /// A bucket that already has a row gets its byte count replaced, never incremented, so
    /// re-running over the same logs leaves the store unchanged. Any failure rolls the whole
    /// pass back.
    pub fn reconcile_usage(&mut self, aggregate: &UsageAggregate) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats::default();
        let updated_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for (key, bytes) in aggregate {
            match find_data_usage_in(&tx, key)? {
                Some(existing) => {
                    update_data_usage_in(&tx, existing.id, *bytes, &updated_at)?;
                    stats.updated += 1;
                }
                None => {
                    insert_data_usage_in(&tx, key, *bytes, &updated_at)?;
                    stats.inserted += 1;
                }
            }
        }
        tx.commit()?;
        tracing::info!(
            inserted = stats.inserted,
            updated = stats.updated,
            "usage buckets reconciled"
        );
        Ok(stats)
    }

    pub fn find_data_usage(&self, key: &BucketKey) -> Result<Option<DataUsage>> {
        find_data_usage_in(&self.conn, key)
    }

    pub fn list_data_usage(&self, tenant_id: Option<i64>) -> Result<Vec<DataUsage>> {
        let mut sql = String::from(
            r#"
            SELECT id, tenant_id, interval_start, interval_duration, number_of_bytes
            FROM data_usage
            "#,
        );
        if tenant_id.is_some() {
            sql.push_str(" WHERE tenant_id = ?1 ");
        }
        sql.push_str(" ORDER BY tenant_id ASC, interval_start ASC, interval_duration ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(tenant_id) = tenant_id {
            stmt.query_map(params![tenant_id], row_to_raw_data_usage)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map([], row_to_raw_data_usage)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        rows.into_iter().map(|raw| raw.into_data_usage()).collect()
    }

    pub fn count_data_usage(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM data_usage", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn find_data_usage_in(conn: &Connection, key: &BucketKey) -> Result<Option<DataUsage>> {
    let raw = conn
        .query_row(
            r#"
            SELECT id, tenant_id, interval_start, interval_duration, number_of_bytes
            FROM data_usage
            WHERE tenant_id = ?1 AND interval_start = ?2 AND interval_duration = ?3
            ORDER BY id ASC
            LIMIT 1
            "#,
            params![
                key.tenant_id,
                format_interval_start(&key.interval_start),
                key.interval_minutes
            ],
            row_to_raw_data_usage,
        )
        .optional()?;
    raw.map(|raw| raw.into_data_usage()).transpose()
}

fn insert_data_usage_in(
    conn: &Connection,
    key: &BucketKey,
    bytes: u64,
    updated_at: &str,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO data_usage (
          tenant_id, interval_start, interval_duration, number_of_bytes, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            key.tenant_id,
            format_interval_start(&key.interval_start),
            key.interval_minutes,
            bytes_to_sql(bytes)?,
            updated_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_data_usage_in(conn: &Connection, id: i64, bytes: u64, updated_at: &str) -> Result<()> {
    conn.execute(
        "UPDATE data_usage SET number_of_bytes = ?1, updated_at = ?2 WHERE id = ?3",
        params![bytes_to_sql(bytes)?, updated_at, id],
    )?;
    Ok(())
}
