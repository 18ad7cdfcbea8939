//! Game commands - catalog, play, history, stats

use std::time::{Duration, Instant};

use anyhow::Result;
use colored::Colorize;
use slotbazaar_core::domain::{page_count, Outcome};
use slotbazaar_core::services::LogEvent;
use slotbazaar_core::GameKind;

use super::{get_context, get_logger, log_event, print_json};
use crate::output;

/// Shortest time the spinner stays up
const MIN_SPIN: Duration = Duration::from_millis(700);

pub fn catalog(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let games = ctx.play_service.catalog();

    if json {
        return print_json(&games);
    }

    let limits = ctx.play_service.limits();
    let mut table = output::create_table();
    table.set_header(vec!["Game", "Name", "RTP", "Pick", "Description"]);
    for game in &games {
        let pick = match game.fixed_price {
            Some(price) => format!("fixed price {}", output::money(price)),
            None if game.choices.is_empty() => "-".to_string(),
            None => game.choices.to_string(),
        };
        table.add_row(vec![
            game.slug.to_string(),
            game.title.to_string(),
            format!("{:.1}%", game.rtp),
            pick,
            game.description.to_string(),
        ]);
    }
    println!("{}", table);
    println!(
        "Bets from {} to {}. Example: sb play coin-flip heads --bet 5",
        output::money(limits.min),
        output::money(limits.max)
    );
    Ok(())
}

pub fn play(game: &str, choice: Option<&str>, bet: Option<&str>, no_animation: bool, json: bool) -> Result<()> {
    let kind: GameKind = game.parse()?;
    let ctx = get_context()?;

    let spinner = if no_animation || json {
        None
    } else {
        Some(output::spinner(&format!("Playing {}...", kind.title())))
    };
    let started = Instant::now();
    let played = ctx.play_service.play(kind, choice, bet);
    if let Some(bar) = spinner {
        if let Some(rest) = MIN_SPIN.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
        bar.finish_and_clear();
    }

    let outcome = match played {
        Ok(outcome) => outcome,
        Err(e) => {
            log_event(
                &get_logger(),
                LogEvent::new("play_failed")
                    .with_command("play")
                    .with_game(kind.slug())
                    .with_core_error(&e),
            );
            return Err(e.into());
        }
    };

    if json {
        return print_json(&outcome);
    }

    let result = &outcome.result;
    println!("{}", kind.title().bold());
    let details = result.detail_summary();
    if !details.is_empty() {
        println!("  {}", details.dimmed());
    }
    let outcome_label = match result.outcome {
        Outcome::Win => "WIN".green().bold(),
        Outcome::Loss => "LOSS".red().bold(),
        Outcome::Push => "PUSH".yellow().bold(),
    };
    println!(
        "  {}  bet {}  won {}  net {}",
        outcome_label,
        output::money(result.bet),
        output::money(result.winnings),
        output::signed_money(result.net_win_loss)
    );
    output::notice(&outcome.notice);
    println!("Balance: {}", output::money(result.new_balance).bold());
    Ok(())
}

pub fn history(page: u32, per_page: u32, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let history = ctx.play_service.history(page, per_page)?;

    if json {
        return print_json(&history);
    }

    if history.sessions.is_empty() {
        println!("No games played yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Date", "Game", "Bet", "Won", "Net"]);
    for round in &history.sessions {
        table.add_row(vec![
            round.id.to_string(),
            round.created_at.format("%Y-%m-%d %H:%M").to_string(),
            round.display_name(),
            output::money(round.bet_amount),
            output::money(round.win_amount),
            output::signed_money(round.net_result),
        ]);
    }
    println!("{}", table);
    let pages = page_count(history.total_count, history.per_page).max(1);
    println!("Page {} of {} ({} rounds)", history.page, pages, history.total_count);
    Ok(())
}

pub fn stats(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let report = ctx.play_service.stats()?;

    if json {
        return print_json(&report);
    }

    println!("{}", format!("Statistics for {}", report.username).bold());
    let mut table = output::create_table();
    table.add_row(vec!["Games played".to_string(), report.stats.total_games.to_string()]);
    table.add_row(vec!["Total bet".to_string(), output::money(report.stats.total_bet)]);
    table.add_row(vec!["Total won".to_string(), output::money(report.stats.total_won)]);
    table.add_row(vec!["Net result".to_string(), output::signed_money(report.stats.net_result)]);
    table.add_row(vec!["Balance".to_string(), output::money(report.current_balance)]);
    println!("{}", table);
    Ok(())
}
