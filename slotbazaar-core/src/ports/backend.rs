//! Casino backend port
//!
//! Everything the client needs from the server side of SlotBazaar: accounts,
//! the cashier, the ledger and the games. The HTTP adapter talks to a remote
//! API; the house adapter runs the same contract in-process for demo mode.

use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::{
    AuthTokens, BalanceReceipt, Bet, Credentials, GameHistoryPage, PlayResult, Registration, StatsReport,
    TransactionPage, User,
};

/// Casino backend trait
///
/// Calls that act for a player take the bearer token from the current
/// session. An expired or unknown token yields `Error::Unauthorized`.
pub trait CasinoBackend: Send + Sync {
    /// Backend name (e.g., "http", "house")
    fn name(&self) -> &str;

    /// Where requests go, for status output
    fn endpoint(&self) -> String;

    /// Create an account. Does not log in.
    fn register(&self, registration: &Registration) -> Result<User>;

    /// Exchange credentials for a token pair
    fn login(&self, credentials: &Credentials) -> Result<AuthTokens>;

    /// Exchange a refresh token for a new token pair
    fn refresh(&self, refresh_token: &str) -> Result<AuthTokens>;

    fn me(&self, token: &str) -> Result<User>;

    fn balance(&self, token: &str) -> Result<Decimal>;

    fn deposit(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt>;

    fn withdraw(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt>;

    /// One page of the ledger, newest first
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `per_page` - Page size (1..=100)
    fn transactions(&self, token: &str, page: u32, per_page: u32) -> Result<TransactionPage>;

    /// Place a wager and settle the round
    fn play(&self, token: &str, bet: &Bet) -> Result<PlayResult>;

    /// One page of recorded rounds, newest first
    fn game_history(&self, token: &str, page: u32, per_page: u32) -> Result<GameHistoryPage>;

    fn stats(&self, token: &str) -> Result<StatsReport>;
}
