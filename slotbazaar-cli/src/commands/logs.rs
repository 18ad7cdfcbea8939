//! Logs command - view and manage application logs

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_dir;
use crate::output;
use slotbazaar_core::services::logging::now_ms;
use slotbazaar_core::services::{EntryPoint, LoggingService};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let dir = get_dir()?;
    std::fs::create_dir_all(&dir)?;
    LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Event", "Command", "Game", "Status", "Error"]);

            for entry in entries {
                let error_indicator = if entry.error_message.is_some() {
                    "!".red().to_string()
                } else {
                    String::new()
                };

                table.add_row(vec![
                    output::format_timestamp(entry.timestamp),
                    entry.event,
                    entry.command.unwrap_or_default(),
                    entry.game.unwrap_or_default(),
                    entry.status_code.map(|s| s.to_string()).unwrap_or_default(),
                    error_indicator,
                ]);
            }

            println!("{}", table);

            if !errors {
                let recent_errors = service.get_errors(3)?;
                if !recent_errors.is_empty() {
                    println!();
                    println!("{}", "Recent Errors:".red().bold());
                    for err in &recent_errors {
                        println!(
                            "  {} [{}]: {}",
                            output::format_timestamp(err.timestamp).dimmed(),
                            err.event,
                            err.error_message.as_deref().unwrap_or("Unknown error")
                        );
                    }
                }
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff_ms = now_ms() - older_than_days as i64 * DAY_MS;

            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete logs older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count()?;
            let errors = service.get_errors(1000)?.len();
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": total,
                        "error_count": errors,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
            } else {
                println!("{}", "Log Statistics".bold());
                println!("  Total entries: {}", total);
                println!("  Errors: {}", errors);
                println!("  Database: {}", db_path.display());
                println!("  Size: {} bytes", size_bytes);
            }
        }
    }

    Ok(())
}
