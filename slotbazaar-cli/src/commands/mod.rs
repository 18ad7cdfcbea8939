//! CLI command implementations

pub mod auth;
pub mod demo;
pub mod games;
pub mod logs;
pub mod status;
pub mod wallet;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use dialoguer::{Input, Password};
use serde::Serialize;
use slotbazaar_core::services::{EntryPoint, LogEvent, LoggingService};
use slotbazaar_core::{OperationResult, SlotBazaarContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let dir = get_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;
    LoggingService::new(&dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the SlotBazaar directory from environment or default
pub fn get_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SLOTBAZAAR_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".slotbazaar"))
        .ok_or_else(|| anyhow!("Could not find home directory. Set SLOTBAZAAR_DIR."))
}

/// Get or create the SlotBazaar context
pub fn get_context() -> Result<SlotBazaarContext> {
    let dir = get_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create SlotBazaar directory: {:?}", dir))?;
    SlotBazaarContext::new(&dir).context("Failed to initialize SlotBazaar")
}

/// Print a `--json` success envelope
pub fn print_json<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Use the flag value, or prompt for it on a terminal
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None if is_interactive() => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
        None => Err(anyhow!("{} is required when not running interactively", prompt)),
    }
}

/// Password from the flag, `SLOTBAZAAR_PASSWORD`, or a hidden prompt
pub fn password_or_prompt(value: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("SLOTBAZAAR_PASSWORD") {
        return Ok(p);
    }
    if !is_interactive() {
        return Err(anyhow!(
            "Password is required when not running interactively (use --password or SLOTBAZAAR_PASSWORD)"
        ));
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords don't match");
    }
    Ok(prompt.interact()?)
}
