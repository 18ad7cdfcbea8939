//! SlotBazaar CLI - casino games in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use slotbazaar_core::services::LogEvent;
use slotbazaar_core::Notice;

mod commands;
mod output;

use commands::{auth, demo, games, logs, status, wallet};

/// SlotBazaar - casino games in your terminal
#[derive(Parser)]
#[command(name = "sb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend, session and balance
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an account and log in
    Register {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget the saved session
    Logout,

    /// Exchange the refresh token for a new session
    Refresh,

    /// Show the logged-in player
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current balance
    Balance {
        /// Keep polling and print every change until Ctrl-C
        #[arg(long, short)]
        watch: bool,
        /// Seconds between polls (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add funds to the wallet
    Deposit {
        /// Amount, e.g. 25 or 12.50
        amount: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take funds out of the wallet
    Withdraw {
        /// Amount, e.g. 25 or 12.50
        amount: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List wallet transactions
    Transactions {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "20")]
        per_page: u32,
        /// Write the whole ledger to a CSV file instead
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the games
    Games {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play one round
    Play {
        /// Game name, e.g. coin-flip or roulette
        game: String,
        /// Your pick, e.g. heads, 7, red or rock
        choice: Option<String>,
        /// Stake; Scratch Card has a fixed price
        #[arg(long, short)]
        bet: Option<String>,
        /// Skip the spinner
        #[arg(long)]
        no_animation: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent rounds
    History {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "20")]
        per_page: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show lifetime game statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Status { .. } => "status",
            Commands::Register { .. } => "register",
            Commands::Login { .. } => "login",
            Commands::Logout => "logout",
            Commands::Refresh => "refresh",
            Commands::Whoami { .. } => "whoami",
            Commands::Balance { .. } => "balance",
            Commands::Deposit { .. } => "deposit",
            Commands::Withdraw { .. } => "withdraw",
            Commands::Transactions { .. } => "transactions",
            Commands::Games { .. } => "games",
            Commands::Play { .. } => "play",
            Commands::History { .. } => "history",
            Commands::Stats { .. } => "stats",
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = cli.command.name();

    let result = run(cli);
    // Opened after the command so `sb logs` has the file to itself
    let logger = commands::get_logger();

    match result {
        Ok(()) => {
            commands::log_event(&logger, LogEvent::new("command_completed").with_command(command));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let mut event = LogEvent::new("command_failed").with_command(command);
            match e.downcast_ref::<slotbazaar_core::Error>() {
                Some(core) => {
                    event = event.with_core_error(core);
                    output::notice(&Notice::for_error(core));
                }
                None => {
                    event = event.with_error(format!("{:#}", e));
                    output::error(&format!("{:#}", e));
                }
            }
            commands::log_event(&logger, event);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Register { username, email, password, json } => auth::register(username, email, password, json),
        Commands::Login { username, password, json } => auth::login(username, password, json),
        Commands::Logout => auth::logout(),
        Commands::Refresh => auth::refresh(),
        Commands::Whoami { json } => auth::whoami(json),
        Commands::Balance { watch, interval, json } => wallet::balance(watch, interval, json),
        Commands::Deposit { amount, json } => wallet::deposit(&amount, json),
        Commands::Withdraw { amount, yes, json } => wallet::withdraw(&amount, yes, json),
        Commands::Transactions { page, per_page, csv, json } => wallet::transactions(page, per_page, csv, json),
        Commands::Games { json } => games::catalog(json),
        Commands::Play { game, choice, bet, no_animation, json } => {
            games::play(&game, choice.as_deref(), bet.as_deref(), no_animation, json)
        }
        Commands::History { page, per_page, json } => games::history(page, per_page, json),
        Commands::Stats { json } => games::stats(json),
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
