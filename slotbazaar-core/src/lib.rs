//! SlotBazaar Core - client logic for the SlotBazaar casino
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities, bet validation and the house rules
//! - **ports**: Trait definitions for external dependencies (CasinoBackend, SessionStore)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (HTTP API, DuckDB house, session file)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use adapters::house::{HouseBackend, PerCallHouse};
use adapters::http::HttpBackend;
use adapters::ledger::{HouseLedger, HOUSE_DB_FILE};
use adapters::session_file::{FileSessionStore, DEMO_SESSION_FILE, SESSION_FILE};
use config::Config;
use ports::{CasinoBackend, SessionStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{Bet, GameKind, Notice, NoticeLevel, PlayResult, Session, Transaction, User};

/// Main context for SlotBazaar operations
///
/// Holds the configuration, the chosen backend (remote API, or the
/// in-process house in demo mode), the session store, and all services.
pub struct SlotBazaarContext {
    pub config: Config,
    pub dir: PathBuf,
    pub backend: Arc<dyn CasinoBackend>,
    pub sessions: Arc<dyn SessionStore>,
    pub auth_service: AuthService,
    pub wallet_service: WalletService,
    pub play_service: PlayService,
    pub status_service: StatusService,
}

impl SlotBazaarContext {
    /// Create a context for the SlotBazaar directory
    pub fn new(dir: &Path) -> Result<Self> {
        let config = Config::load(dir)?;

        let (backend, session_file): (Arc<dyn CasinoBackend>, &str) = if config.demo_mode {
            std::fs::create_dir_all(dir)?;
            let ledger = HouseLedger::open(&dir.join(HOUSE_DB_FILE))?;
            ledger.run_migrations()?;
            (Arc::new(HouseBackend::new(ledger)), DEMO_SESSION_FILE)
        } else {
            (
                Arc::new(HttpBackend::new(&config.api_url, config.request_timeout_seconds)?),
                SESSION_FILE,
            )
        };
        let sessions: Arc<dyn SessionStore> = Arc::new(FileSessionStore::with_file(dir, session_file));

        Ok(Self::with_parts(config, dir, backend, sessions))
    }

    /// Assemble a context from explicit parts
    pub fn with_parts(
        config: Config,
        dir: &Path,
        backend: Arc<dyn CasinoBackend>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let auth_service = AuthService::new(Arc::clone(&backend), Arc::clone(&sessions));
        let wallet_service = WalletService::new(Arc::clone(&backend), Arc::clone(&sessions));
        let play_service = PlayService::new(Arc::clone(&backend), Arc::clone(&sessions), config.bet_limits);
        let status_service = StatusService::new(Arc::clone(&backend), Arc::clone(&sessions), config.demo_mode);

        Self {
            config,
            dir: dir.to_path_buf(),
            backend,
            sessions,
            auth_service,
            wallet_service,
            play_service,
            status_service,
        }
    }

    /// Watcher polling at `interval`, or the configured interval
    ///
    /// In demo mode the watcher opens the house ledger only while it polls.
    /// Drop the context afterwards so the ledger is not held for the watch.
    pub fn balance_watcher(&self, interval: Option<Duration>) -> BalanceWatcher {
        let backend: Arc<dyn CasinoBackend> = if self.config.demo_mode {
            Arc::new(PerCallHouse::new(&self.dir.join(HOUSE_DB_FILE)))
        } else {
            Arc::clone(&self.backend)
        };
        BalanceWatcher::new(
            backend,
            Arc::clone(&self.sessions),
            interval.unwrap_or_else(|| Duration::from_secs(self.config.balance_poll_seconds)),
        )
    }
}
