//! Migration service - manages database schema migrations
//!
//! Migrations are SQL files embedded at compile time. Each migration is
//! tracked in the sys_migrations table to ensure idempotent execution.
//! The same service runs the house ledger set and the event log set.

use anyhow::Result;
use duckdb::Connection;

use crate::log_migrations::LOG_MIGRATIONS;
use crate::migrations::MIGRATIONS;

const BOOTSTRAP: &str = "000_migrations.sql";

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Service for managing database migrations
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'static [(&'static str, &'static str)],
}

impl<'a> MigrationService<'a> {
    /// Migrations for house.duckdb
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            migrations: MIGRATIONS,
        }
    }

    /// Migrations for logs.duckdb
    pub fn for_logs(conn: &'a Connection) -> Self {
        Self {
            conn,
            migrations: LOG_MIGRATIONS,
        }
    }

    /// Run all pending migrations
    ///
    /// 1. Ensures the sys_migrations table exists (bootstrap)
    /// 2. Applies any pending migrations in order, recording each one
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut newly_applied = Vec::new();

        let bootstrap_ran = if !self.migrations_table_exists()? {
            match self.migrations.iter().find(|(n, _)| *n == BOOTSTRAP) {
                Some((name, sql)) => {
                    self.conn.execute_batch(sql)?;
                    self.record_migration(name)?;
                    newly_applied.push(name.to_string());
                    true
                }
                None => false,
            }
        } else {
            false
        };

        let applied_set = self.get_applied()?;
        let already_applied = if bootstrap_ran {
            applied_set.len().saturating_sub(1)
        } else {
            applied_set.len()
        };

        for (name, sql) in self.migrations.iter() {
            if *name == BOOTSTRAP || applied_set.iter().any(|a| a.as_str() == *name) {
                continue;
            }
            self.conn.execute_batch(sql)?;
            self.record_migration(name)?;
            newly_applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied: newly_applied,
            already_applied,
        })
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let result: std::result::Result<i64, _> = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        );
        Ok(matches!(result, Ok(count) if count > 0))
    }

    /// Get list of already applied migration names
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = Vec::new();
        for name in names {
            result.push(name?);
        }
        Ok(result)
    }

    /// Get list of pending migration names
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.migrations_table_exists()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .migrations
            .iter()
            .filter(|(name, _)| !applied.iter().any(|a| a.as_str() == *name))
            .map(|(name, _)| name.to_string())
            .collect())
    }

    fn record_migration(&self, name: &str) -> Result<()> {
        self.conn
            .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        Ok(())
    }
}
