use rusqlite::params;
use webextract_core::Target;

use crate::Db;
use crate::error::{DbError, Result};
use crate::helpers::credentials_from_columns;
use crate::types::NewTarget;

impl Db {
    /// Every registered host with its log directories, in registration order.
    pub fn list_targets(&self) -> Result<Vec<Target>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, host, username, password, key_file
            FROM host_connection
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let password: Option<String> = row.get(3)?;
            let key_file: Option<String> = row.get(4)?;
            Ok(Target {
                id: row.get(0)?,
                host: row.get(1)?,
                username: row.get(2)?,
                credentials: credentials_from_columns(password, key_file),
                directories: Vec::new(),
            })
        })?;
        let mut targets = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        for target in &mut targets {
            target.directories = self.list_log_locations(target.id)?;
        }
        Ok(targets)
    }

    fn list_log_locations(&self, host_connection_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT directory
            FROM log_location
            WHERE host_connection_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![host_connection_id], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
    }

    pub fn add_target(&mut self, input: &NewTarget) -> Result<Target> {
        let host = input.host.trim();
        let username = input.username.trim();
        if host.is_empty() || username.is_empty() {
            return Err(DbError::InvalidInput(
                "host and username are required".to_string(),
            ));
        }
        let directories = input
            .directories
            .iter()
            .map(|dir| dir.trim().trim_end_matches('/').to_string())
            .filter(|dir| !dir.is_empty())
            .collect::<Vec<_>>();
        let key_file = input
            .credentials
            .key_file
            .as_ref()
            .map(|path| path.to_string_lossy().to_string());

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO host_connection (host, username, password, key_file)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![host, username, input.credentials.password, key_file],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO log_location (host_connection_id, directory) VALUES (?1, ?2)",
            )?;
            for directory in &directories {
                stmt.execute(params![id, directory])?;
            }
        }
        tx.commit()?;

        Ok(Target {
            id,
            host: host.to_string(),
            username: username.to_string(),
            credentials: credentials_from_columns(input.credentials.password.clone(), key_file),
            directories,
        })
    }
}
