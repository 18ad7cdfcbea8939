//! Output formatting utilities

use std::time::Duration;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use slotbazaar_core::domain::wire::format_money;
use slotbazaar_core::{Notice, NoticeLevel};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print a notice in its level's colour
pub fn notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => success(&notice.message),
        NoticeLevel::Info => info(&notice.message),
        NoticeLevel::Warning => warning(&notice.message),
        NoticeLevel::Error => error(&notice.message),
    }
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn money(amount: Decimal) -> String {
    format_money(amount)
}

/// Signed amount, green for gains and red for losses
pub fn signed_money(amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        format!("+{}", format_money(amount)).green().to_string()
    } else if amount < Decimal::ZERO {
        format_money(amount).red().to_string()
    } else {
        format_money(amount)
    }
}

/// Spinner shown while a request is in flight; hidden when stdout is not a terminal
pub fn spinner(message: &str) -> ProgressBar {
    if atty::isnt(atty::Stream::Stdout) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}
