//! Demo service - manage demo mode
//!
//! Demo mode runs the casino in-process against `house.duckdb`, so the
//! client works with no server. Enabling it starts a fresh house with a
//! seeded player.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::house::HouseBackend;
use crate::adapters::ledger::{HouseLedger, HOUSE_DB_FILE};
use crate::adapters::session_file::DEMO_SESSION_FILE;
use crate::config::Config;
use crate::domain::{Bet, Choice, CoinSide, Color, Credentials, GameKind, Registration};
use crate::ports::CasinoBackend;

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo-pass";
pub const DEMO_EMAIL: &str = "demo@slotbazaar.local";

const DEMO_SEED: u64 = 2024;

/// What `enable` left behind
#[derive(Debug, Clone, Serialize)]
pub struct DemoSeed {
    pub username: String,
    pub password: String,
    pub rounds: usize,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoStatus {
    pub enabled: bool,
    pub ledger_path: PathBuf,
    pub ledger_exists: bool,
    pub players: Option<i64>,
}

/// Demo service for managing demo mode
pub struct DemoService {
    dir: PathBuf,
}

impl DemoService {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(HOUSE_DB_FILE)
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(Config::load(&self.dir)?.demo_mode)
    }

    /// Enable demo mode
    ///
    /// This will:
    /// 1. Delete any existing house ledger and demo session
    /// 2. Enable demo mode in config
    /// 3. Create the house and seed the demo player with some history
    pub fn enable(&self) -> Result<DemoSeed> {
        self.remove_house_files()?;

        let mut config = Config::load(&self.dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.dir)?;

        let ledger = HouseLedger::open(&self.ledger_path())?;
        ledger.run_migrations()?;
        let house = HouseBackend::seeded(ledger, DEMO_SEED)?;
        seed_player(&house)
    }

    /// Disable demo mode
    ///
    /// With `clean`, the house ledger and the demo session are deleted too.
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.dir)?;

        if clean {
            self.remove_house_files()?;
        }
        Ok(())
    }

    pub fn status(&self) -> Result<DemoStatus> {
        let enabled = self.is_enabled()?;
        let ledger_path = self.ledger_path();
        let ledger_exists = ledger_path.exists();
        let players = if ledger_exists {
            // The CLI may hold the file open in another process
            HouseLedger::open(&ledger_path)
                .and_then(|ledger| ledger.user_count())
                .ok()
        } else {
            None
        };
        Ok(DemoStatus {
            enabled,
            ledger_path,
            ledger_exists,
            players,
        })
    }

    fn remove_house_files(&self) -> Result<()> {
        let db = self.ledger_path();
        let wal = self.dir.join(format!("{}.wal", HOUSE_DB_FILE));
        let session = self.dir.join(DEMO_SESSION_FILE);
        for path in [db, wal, session] {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Register the demo player, top up, and play a few rounds
fn seed_player(house: &HouseBackend) -> Result<DemoSeed> {
    house.register(&Registration::new(DEMO_USERNAME, DEMO_EMAIL, DEMO_PASSWORD))?;
    let tokens = house.login(&Credentials {
        username: DEMO_USERNAME.to_string(),
        password: DEMO_PASSWORD.to_string(),
    })?;
    let token = tokens.access_token.as_str();

    house.deposit(token, Decimal::new(50, 0))?;

    let rounds = [
        Bet {
            game: GameKind::CoinFlip,
            amount: Decimal::new(5, 0),
            choice: Some(Choice::Coin(CoinSide::Heads)),
        },
        Bet {
            game: GameKind::Roulette,
            amount: Decimal::new(10, 0),
            choice: Some(Choice::Color(Color::Red)),
        },
        Bet {
            game: GameKind::Slot,
            amount: Decimal::new(2, 0),
            choice: None,
        },
        Bet {
            game: GameKind::DiceRoll,
            amount: Decimal::new(3, 0),
            choice: Some(Choice::Face(4)),
        },
        Bet {
            game: GameKind::ScratchCard,
            amount: Decimal::ONE,
            choice: None,
        },
        Bet {
            game: GameKind::Wheel,
            amount: Decimal::new(4, 0),
            choice: None,
        },
    ];
    for bet in &rounds {
        house.play(token, bet)?;
    }

    Ok(DemoSeed {
        username: DEMO_USERNAME.to_string(),
        password: DEMO_PASSWORD.to_string(),
        rounds: rounds.len(),
        balance: house.balance(token)?,
    })
}
