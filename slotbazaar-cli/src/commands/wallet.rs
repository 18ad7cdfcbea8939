//! Wallet commands - balance, deposit, withdraw, transactions

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use dialoguer::Confirm;
use slotbazaar_core::services::{BalanceUpdate, EntryPoint, LogEvent, LoggingService};

use super::{get_context, is_interactive, log_event, print_json};
use crate::output;

pub fn balance(watch: bool, interval: Option<u64>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if !watch {
        let balance = ctx.wallet_service.balance()?;
        if json {
            return print_json(serde_json::json!({ "balance": balance }));
        }
        println!("Balance: {}", output::money(balance).bold());
        return Ok(());
    }

    let watcher = ctx.balance_watcher(interval.map(Duration::from_secs));
    let watch_logger = LoggingService::new(&ctx.dir, EntryPoint::Watch, env!("CARGO_PKG_VERSION")).ok();
    // Releases the demo house ledger for other processes
    drop(ctx);
    if !json {
        output::info(&format!(
            "Watching balance every {}s. Press Ctrl-C to stop.",
            watcher.interval().as_secs()
        ));
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let summary = runtime.block_on(watcher.run(
        |update: BalanceUpdate| {
            if json {
                if let Ok(line) = serde_json::to_string(&update) {
                    println!("{}", line);
                }
                return;
            }
            let time = Local::now().format("%H:%M:%S");
            match update.change() {
                Some(change) => println!(
                    "[{}] {} ({})",
                    time,
                    output::money(update.balance).bold(),
                    output::signed_money(change)
                ),
                None => println!("[{}] {}", time, output::money(update.balance).bold()),
            }
        },
        |err| {
            log_event(
                &watch_logger,
                LogEvent::new("balance_poll_failed")
                    .with_command("balance")
                    .with_core_error(err),
            );
            if !json {
                output::warning(&format!("Balance check failed: {}", err));
            }
        },
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
    ))?;

    if !json {
        println!();
        println!(
            "Stopped after {} polls ({} changes, {} failures).",
            summary.polls, summary.updates, summary.failures
        );
    }
    Ok(())
}

pub fn deposit(amount: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let receipt = ctx.wallet_service.deposit(amount)?;

    if json {
        return print_json(&receipt);
    }
    output::success(receipt.message.as_deref().unwrap_or("Deposit successful"));
    println!("New balance: {}", output::money(receipt.balance).bold());
    Ok(())
}

pub fn withdraw(amount: &str, yes: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if !yes && !json && is_interactive() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Withdraw ${}?", amount.trim()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let receipt = ctx.wallet_service.withdraw(amount)?;

    if json {
        return print_json(&receipt);
    }
    output::success(receipt.message.as_deref().unwrap_or("Withdrawal successful"));
    println!("New balance: {}", output::money(receipt.balance).bold());
    Ok(())
}

pub fn transactions(page: u32, per_page: u32, csv: Option<PathBuf>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    if let Some(path) = csv {
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let rows = ctx.wallet_service.export_csv(BufWriter::new(file))?;
        if json {
            return print_json(serde_json::json!({ "rows": rows, "path": path }));
        }
        output::success(&format!("Exported {} transactions to {}", rows, path.display()));
        return Ok(());
    }

    let page = ctx.wallet_service.transactions(page, per_page)?;

    if json {
        return print_json(&page);
    }

    if page.transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Date", "Type", "Amount", "Balance", "Description"]);
    for tx in &page.transactions {
        table.add_row(vec![
            tx.id.to_string(),
            tx.created_at.format("%Y-%m-%d %H:%M").to_string(),
            tx.transaction_type.to_string(),
            output::signed_money(tx.signed_amount()),
            output::money(tx.balance_after),
            tx.description.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    println!(
        "Page {} of {} ({} transactions)",
        page.page,
        page.total_pages().max(1),
        page.total_count
    );
    Ok(())
}
