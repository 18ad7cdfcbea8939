//! Logging service - structured event logging to DuckDB
//!
//! Stores client events in logs.duckdb. Credentials and tokens are never
//! logged: an event carries its name, the command, the game slug and, for
//! failures, the HTTP status and error message.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::services::MigrationService;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Timestamp in the high bits, a per-process counter in the low 16
fn generate_id() -> u64 {
    let timestamp = now_ms() as u64;
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Which part of the client recorded the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    /// The background balance watcher
    Watch,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Watch => "watch",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            game: None,
            status_code: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Game slug, e.g. "coin"
    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game = Some(game.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }

    /// Attach the message and status of a core error
    pub fn with_core_error(self, error: &Error) -> Self {
        let mut event = self.with_error(error.to_string());
        if let Some(details) = error.details() {
            event = event.with_error_details(details);
        }
        match error.status_code() {
            Some(status) => event.with_status(status),
            None => event,
        }
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub game: Option<String>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

const SELECT_ENTRY: &str = "SELECT id, timestamp, entry_point, app_version, platform, \
     event, command, game, status_code, error_message, error_details FROM sys_logs";

fn row_to_entry(row: &duckdb::Row<'_>) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        command: row.get(6)?,
        game: row.get(7)?,
        status_code: row.get::<_, Option<i32>>(8)?.map(|s| s as u16),
        error_message: row.get(9)?,
        error_details: row.get(10)?,
    })
}

/// Service for structured event logging
///
/// This service manages the logs.duckdb database and provides methods
/// for logging events and querying the log history.
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in `dir` and run pending log migrations
    pub fn new(dir: &Path, entry_point: EntryPoint, app_version: impl Into<String>) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::for_logs(&conn).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    /// Log an event
    ///
    /// The entry point, app version and platform come from the service.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, command, game, status_code, error_message, error_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.game,
                event.status_code.map(i32::from),
                &event.error_message,
                &event.error_details,
            ],
        )?;

        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new("command_executed").with_command(command))
    }

    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut log_event = LogEvent::new(event).with_error(message);
        if let Some(d) = details {
            log_event = log_event.with_error_details(d);
        }
        self.log(log_event)
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&format!("{} ORDER BY timestamp DESC, id DESC LIMIT ?", SELECT_ENTRY), limit)
    }

    /// Most recent entries that carry an error
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(
            &format!(
                "{} WHERE error_message IS NOT NULL ORDER BY timestamp DESC, id DESC LIMIT ?",
                SELECT_ENTRY
            ),
            limit,
        )
    }

    fn query(&self, sql: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map([limit as i64], row_to_entry)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete logs older than the given unix timestamp in milliseconds
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Copy the log database to `output_path` for troubleshooting
    pub fn export(&self, output_path: &Path) -> Result<PathBuf> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        conn.execute("CHECKPOINT", [])?;
        std::fs::copy(&self.db_path, output_path)?;
        Ok(output_path.to_path_buf())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
