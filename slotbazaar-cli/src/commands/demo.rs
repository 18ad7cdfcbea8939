//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{get_dir, print_json};
use crate::output;
use slotbazaar_core::services::DemoService;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode against a local house
    #[command(name = "on")]
    On {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Disable demo mode
    #[command(name = "off")]
    Off {
        /// Also delete the house ledger and demo session
        #[arg(long)]
        clean: bool,
    },
    /// Show demo mode status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let dir = get_dir()?;
    std::fs::create_dir_all(&dir)?;
    let demo_service = DemoService::new(&dir);

    match command {
        Some(DemoCommands::On { json }) => {
            let seed = demo_service.enable()?;
            if json {
                return print_json(&seed);
            }
            println!("{}", "Demo mode enabled".green());
            println!(
                "Log in with 'sb login -u {} -p {}'. The demo player has {} and {} rounds of history.",
                seed.username,
                seed.password,
                output::money(seed.balance),
                seed.rounds
            );
            Ok(())
        }
        Some(DemoCommands::Off { clean }) => {
            demo_service.disable(clean)?;
            println!("{}", "Demo mode disabled".yellow());
            if clean {
                println!("House ledger removed.");
            }
            Ok(())
        }
        Some(DemoCommands::Status { json }) => status(&demo_service, json),
        None => status(&demo_service, false),
    }
}

fn status(demo_service: &DemoService, json: bool) -> Result<()> {
    let status = demo_service.status()?;
    if json {
        return print_json(&status);
    }
    if status.enabled {
        println!("Demo mode is {}", "ON".green());
    } else {
        println!("Demo mode is {}", "OFF".yellow());
    }
    if status.ledger_exists {
        print!("House ledger: {}", status.ledger_path.display());
        match status.players {
            Some(n) => println!(" ({} players)", n),
            None => println!(),
        }
    }
    Ok(())
}
