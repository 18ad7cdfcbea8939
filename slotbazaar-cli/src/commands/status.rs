//! Status command - show backend, session and balance

use anyhow::Result;
use colored::Colorize;

use super::{get_context, print_json};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        return print_json(&status);
    }

    println!("{}", "SlotBazaar Status".bold());
    println!();

    let mut table = output::create_table();
    let backend = if status.demo_mode {
        format!("{} (demo)", status.backend)
    } else {
        status.backend.clone()
    };
    table.add_row(vec!["Backend".to_string(), backend]);
    table.add_row(vec!["Endpoint".to_string(), status.endpoint.clone()]);
    table.add_row(vec![
        "Player".to_string(),
        status.username.clone().unwrap_or_else(|| "not logged in".to_string()),
    ]);
    if let Some(balance) = status.balance {
        table.add_row(vec!["Balance".to_string(), output::money(balance)]);
    }
    println!("{}", table);

    if let Some(error) = &status.error {
        println!();
        output::warning(error);
    } else if !status.logged_in {
        println!();
        println!("Run 'sb login' or 'sb register' to start playing.");
    }

    Ok(())
}
