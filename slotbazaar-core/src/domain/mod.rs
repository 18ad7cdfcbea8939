//! Core domain entities
//!
//! Pure data structures, input validation and the house rules. No I/O.

pub mod bet;
mod game;
mod notice;
pub mod result;
pub mod rules;
mod transaction;
mod user;
pub mod wire;

pub use bet::BetLimits;
pub use game::{
    Bet, Choice, ChoiceKind, CoinSide, Color, GameHistoryPage, GameKind, GameSession, GameStats, Hand,
    HighLowCall, Outcome, PlayResult, StatsReport,
};
pub use notice::{Notice, NoticeLevel};
pub use result::{Error, OperationResult, Result};
pub use transaction::{page_count, BalanceReceipt, Transaction, TransactionPage, TransactionStatus, TransactionType};
pub use user::{AuthTokens, Credentials, Registration, Session, User};
