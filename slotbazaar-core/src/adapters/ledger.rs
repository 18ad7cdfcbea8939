//! DuckDB house ledger
//!
//! Storage for the in-process casino used in demo mode. Money is kept as
//! integer cents and every balance change is written together with its
//! transaction rows inside one DuckDB transaction.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::types::Type;
use duckdb::{params, Connection, OptionalExt, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::wire::parse_timestamp;
use crate::domain::{
    GameHistoryPage, GameKind, GameSession, GameStats, Transaction, TransactionPage,
    TransactionStatus, TransactionType, User,
};
use crate::services::{MigrationResult, MigrationService};

pub const HOUSE_DB_FILE: &str = "house.duckdb";

pub const AMOUNT_OUT_OF_RANGE: &str = "Amount is out of range";

/// Maximum number of retries when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Convert a two-decimal amount to cents
pub fn to_cents(amount: Decimal) -> Result<i64> {
    (amount.round_dp(2) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| Error::validation("Amount is out of range"))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn read_timestamp(raw: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(Utc::now)
}

/// A stored account with its password hash
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

/// Row for a new account
#[derive(Debug, Clone)]
pub struct NewPlayer<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub bonus_cents: i64,
}

/// A hashed bearer token
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub token_hash: String,
    pub session_id: String,
    pub user_id: i64,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Owner of a live token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOwner {
    pub user_id: i64,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A cashier movement: deposit, withdrawal, bonus or refund
#[derive(Debug, Clone)]
pub struct Movement {
    pub transaction_type: TransactionType,
    pub cents: i64,
    pub description: String,
    pub reference_id: Option<String>,
}

/// A settled round ready to book
#[derive(Debug, Clone)]
pub struct RoundEntry {
    pub game: GameKind,
    pub bet_cents: i64,
    pub win_cents: i64,
    pub game_data: JsonValue,
}

/// What booking a round left behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedRound {
    pub game_session_id: i64,
    pub balance_cents: i64,
}

const USER_COLUMNS: &str =
    "id, username, email, balance_cents, is_active, is_verified, created_at, last_login, password_hash";

const TRANSACTION_COLUMNS: &str = "id, transaction_type, status, amount_cents, balance_before_cents, \
     balance_after_cents, description, game_session_id, reference_id, created_at";

/// DuckDB-backed house ledger
pub struct HouseLedger {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl HouseLedger {
    /// Open (or create) the ledger file
    ///
    /// Retries with exponential backoff while another process holds the file.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[slotbazaar] House ledger busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open house ledger after {} retries", MAX_RETRIES))
        }))
    }

    /// Throwaway ledger for tests
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Autoloading would pull cached extensions from ~/.duckdb
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("House ledger lock poisoned: {}", e)))
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(e.to_string()))
    }

    // === Accounts ===

    /// Insert a player and credit the welcome bonus
    pub fn create_user(&self, player: &NewPlayer<'_>, now: DateTime<Utc>) -> Result<User> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let taken: i64 = tx.query_row(
            "SELECT COUNT(*) FROM house_users WHERE lower(username) = lower(?)",
            params![player.username],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::validation("Username already exists"));
        }
        let taken: i64 = tx.query_row(
            "SELECT COUNT(*) FROM house_users WHERE lower(email) = lower(?)",
            params![player.email],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::validation("Email already exists"));
        }

        let created_at = timestamp(now);
        let user_id: i64 = tx.query_row(
            "INSERT INTO house_users (username, email, password_hash, balance_cents, created_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
            params![player.username, player.email, player.password_hash, player.bonus_cents, created_at],
            |row| row.get(0),
        )?;

        if player.bonus_cents > 0 {
            tx.execute(
                "INSERT INTO house_transactions
                    (user_id, transaction_type, status, amount_cents, balance_before_cents,
                     balance_after_cents, description, created_at)
                 VALUES (?, ?, ?, ?, 0, ?, 'Welcome bonus', ?)",
                params![
                    user_id,
                    TransactionType::Bonus.as_str(),
                    TransactionStatus::Completed.as_str(),
                    player.bonus_cents,
                    player.bonus_cents,
                    created_at
                ],
            )?;
        }

        let record = tx
            .query_row(
                &format!("SELECT {} FROM house_users WHERE id = ?", USER_COLUMNS),
                params![user_id],
                row_to_user_record,
            )
            .optional()?
            .ok_or_else(|| Error::database("New player row missing after insert"))?;
        tx.commit()?;
        Ok(record.user)
    }

    pub fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM house_users WHERE username = ?", USER_COLUMNS),
                params![username],
                row_to_user_record,
            )
            .optional()?)
    }

    pub fn user_by_id(&self, user_id: i64) -> Result<Option<UserRecord>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM house_users WHERE id = ?", USER_COLUMNS),
                params![user_id],
                row_to_user_record,
            )
            .optional()?)
    }

    pub fn user_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM house_users", [], |row| row.get(0))?)
    }

    pub fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE house_users SET last_login = ? WHERE id = ?",
            params![timestamp(at), user_id],
        )?;
        Ok(())
    }

    pub fn set_active(&self, user_id: i64, active: bool) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE house_users SET is_active = ? WHERE id = ?",
            params![active, user_id],
        )?;
        if updated == 0 {
            return Err(Error::not_found("User not found"));
        }
        Ok(())
    }

    // === Tokens ===

    pub fn insert_token(&self, token: &StoredToken, now: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO house_sessions (token_hash, session_id, user_id, kind, expires_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                token.token_hash,
                token.session_id,
                token.user_id,
                token.kind.as_str(),
                timestamp(token.expires_at),
                timestamp(now)
            ],
        )?;
        Ok(())
    }

    /// Who holds `token_hash`, if it exists with that kind
    ///
    /// Expiry is the caller's decision.
    pub fn token_owner(&self, token_hash: &str, kind: TokenKind) -> Result<Option<TokenOwner>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT user_id, session_id, expires_at FROM house_sessions
                 WHERE token_hash = ? AND kind = ?",
                params![token_hash, kind.as_str()],
                |row| {
                    let expires_at: String = row.get(2)?;
                    Ok(TokenOwner {
                        user_id: row.get(0)?,
                        session_id: row.get(1)?,
                        expires_at: read_timestamp(&expires_at),
                    })
                },
            )
            .optional()?)
    }

    /// Drop every token issued with `session_id`
    pub fn revoke_session(&self, session_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM house_sessions WHERE session_id = ?", params![session_id])?)
    }

    pub fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT token_hash, expires_at FROM house_sessions")?;
        let expired: Vec<String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .filter_map(|r| r.ok())
            .filter(|(_, expires_at)| read_timestamp(expires_at) <= now)
            .map(|(hash, _)| hash)
            .collect();
        for hash in &expired {
            conn.execute("DELETE FROM house_sessions WHERE token_hash = ?", params![hash])?;
        }
        Ok(expired.len())
    }

    // === Money ===

    /// Apply a cashier movement and return the booked transaction
    pub fn post_movement(&self, user_id: i64, movement: &Movement, now: DateTime<Utc>) -> Result<Transaction> {
        if movement.cents <= 0 {
            return Err(Error::validation("Amount must be greater than zero"));
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let before = balance_in(&tx, user_id)?;
        let delta = if movement.transaction_type.is_credit() {
            movement.cents
        } else {
            -movement.cents
        };
        let after = before.checked_add(delta).ok_or_else(out_of_range)?;
        if after < 0 {
            return Err(Error::validation("Insufficient balance"));
        }

        let created_at = timestamp(now);
        let id: i64 = tx.query_row(
            "INSERT INTO house_transactions
                (user_id, transaction_type, status, amount_cents, balance_before_cents,
                 balance_after_cents, description, reference_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
            params![
                user_id,
                movement.transaction_type.as_str(),
                TransactionStatus::Completed.as_str(),
                movement.cents,
                before,
                after,
                movement.description,
                movement.reference_id,
                created_at
            ],
            |row| row.get(0),
        )?;
        tx.execute(
            "UPDATE house_users SET balance_cents = ? WHERE id = ?",
            params![after, user_id],
        )?;
        tx.commit()?;

        Ok(Transaction {
            id,
            transaction_type: movement.transaction_type,
            status: TransactionStatus::Completed,
            amount: from_cents(movement.cents),
            balance_before: from_cents(before),
            balance_after: from_cents(after),
            description: Some(movement.description.clone()),
            game_session_id: None,
            reference_id: movement.reference_id.clone(),
            created_at: now,
        })
    }

    /// Book a round: the bet debit, the win credit and the session row
    ///
    /// Nothing is written when the balance cannot cover the bet.
    pub fn record_round(&self, user_id: i64, entry: &RoundEntry, now: DateTime<Utc>) -> Result<BookedRound> {
        if entry.bet_cents <= 0 {
            return Err(Error::validation("Bet amount must be greater than zero"));
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let before = balance_in(&tx, user_id)?;
        if before < entry.bet_cents {
            return Err(Error::validation("Insufficient balance"));
        }
        let after_bet = before - entry.bet_cents;
        let after = after_bet.checked_add(entry.win_cents).ok_or_else(out_of_range)?;
        let net_cents = entry.win_cents.checked_sub(entry.bet_cents).ok_or_else(out_of_range)?;
        let created_at = timestamp(now);
        let title = entry.game.title();

        let game_session_id: i64 = tx.query_row(
            "INSERT INTO house_game_sessions
                (user_id, game_type, bet_cents, win_cents, net_cents, game_data, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
            params![
                user_id,
                entry.game.slug(),
                entry.bet_cents,
                entry.win_cents,
                net_cents,
                entry.game_data.to_string(),
                created_at
            ],
            |row| row.get(0),
        )?;

        let insert = "INSERT INTO house_transactions
                (user_id, transaction_type, status, amount_cents, balance_before_cents,
                 balance_after_cents, description, game_session_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";
        tx.execute(
            insert,
            params![
                user_id,
                TransactionType::Bet.as_str(),
                TransactionStatus::Completed.as_str(),
                entry.bet_cents,
                before,
                after_bet,
                format!("Bet for {}", title),
                game_session_id,
                created_at
            ],
        )?;
        if entry.win_cents > 0 {
            tx.execute(
                insert,
                params![
                    user_id,
                    TransactionType::Win.as_str(),
                    TransactionStatus::Completed.as_str(),
                    entry.win_cents,
                    after_bet,
                    after,
                    format!("Win from {}", title),
                    game_session_id,
                    created_at
                ],
            )?;
        }

        tx.execute(
            "UPDATE house_users SET balance_cents = ? WHERE id = ?",
            params![after, user_id],
        )?;
        tx.commit()?;

        Ok(BookedRound {
            game_session_id,
            balance_cents: after,
        })
    }

    // === History ===

    pub fn transactions(&self, user_id: i64, page: u32, per_page: u32) -> Result<TransactionPage> {
        let conn = self.lock()?;
        let total_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM house_transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM house_transactions WHERE user_id = ?
             ORDER BY id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![user_id, i64::from(per_page), offset], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TransactionPage {
            transactions,
            total_count,
            page,
            per_page,
        })
    }

    pub fn game_sessions(&self, user_id: i64, page: u32, per_page: u32) -> Result<GameHistoryPage> {
        let conn = self.lock()?;
        let total_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM house_game_sessions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);
        let mut stmt = conn.prepare(
            "SELECT id, user_id, game_type, bet_cents, win_cents, net_cents, game_data, created_at
             FROM house_game_sessions WHERE user_id = ?
             ORDER BY id DESC LIMIT ? OFFSET ?",
        )?;
        let sessions = stmt
            .query_map(params![user_id, i64::from(per_page), offset], row_to_game_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(GameHistoryPage {
            sessions,
            total_count,
            page,
            per_page,
        })
    }

    pub fn game_stats(&self, user_id: i64) -> Result<GameStats> {
        let conn = self.lock()?;
        let (total_games, bet, won, net): (i64, i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    CAST(COALESCE(SUM(bet_cents), 0) AS BIGINT),
                    CAST(COALESCE(SUM(win_cents), 0) AS BIGINT),
                    CAST(COALESCE(SUM(net_cents), 0) AS BIGINT)
             FROM house_game_sessions WHERE user_id = ?",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        Ok(GameStats {
            total_games,
            total_bet: from_cents(bet),
            total_won: from_cents(won),
            net_result: from_cents(net),
        })
    }
}

fn balance_in(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT balance_cents FROM house_users WHERE id = ?",
        params![user_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::not_found("User not found"))
}

// Row helpers

fn row_to_user_record(row: &Row<'_>) -> duckdb::Result<UserRecord> {
    let created_at: String = row.get(6)?;
    let last_login: Option<String> = row.get(7)?;
    Ok(UserRecord {
        user: User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            balance: from_cents(row.get(3)?),
            is_active: row.get(4)?,
            is_verified: row.get(5)?,
            created_at: read_timestamp(&created_at),
            last_login: last_login.as_deref().and_then(parse_timestamp),
        },
        password_hash: row.get(8)?,
    })
}

fn out_of_range() -> Error {
    Error::validation(AMOUNT_OUT_OF_RANGE)
}

/// Parse a text column, failing the row on values the domain doesn't know
fn parse_column<T>(idx: usize, raw: &str) -> duckdb::Result<T>
where
    T: FromStr<Err = Error>,
{
    raw.parse()
        .map_err(|e: Error| duckdb::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into()))
}

fn row_to_transaction(row: &Row<'_>) -> duckdb::Result<Transaction> {
    let transaction_type: String = row.get(1)?;
    let status: String = row.get(2)?;
    let created_at: String = row.get(9)?;
    Ok(Transaction {
        id: row.get(0)?,
        transaction_type: parse_column(1, &transaction_type)?,
        status: parse_column(2, &status)?,
        amount: from_cents(row.get(3)?),
        balance_before: from_cents(row.get(4)?),
        balance_after: from_cents(row.get(5)?),
        description: row.get(6)?,
        game_session_id: row.get(7)?,
        reference_id: row.get(8)?,
        created_at: read_timestamp(&created_at),
    })
}

fn row_to_game_session(row: &Row<'_>) -> duckdb::Result<GameSession> {
    let game_data: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(GameSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        game_type: row.get(2)?,
        bet_amount: from_cents(row.get(3)?),
        win_amount: from_cents(row.get(4)?),
        net_result: from_cents(row.get(5)?),
        game_data: game_data.and_then(|raw| serde_json::from_str(&raw).ok()),
        created_at: read_timestamp(&created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ledger() -> HouseLedger {
        let ledger = HouseLedger::open_in_memory().unwrap();
        ledger.run_migrations().unwrap();
        ledger
    }

    fn add_player(ledger: &HouseLedger, name: &str) -> User {
        let email = format!("{}@example.com", name);
        ledger
            .create_user(
                &NewPlayer {
                    username: name,
                    email: &email,
                    password_hash: "hash",
                    bonus_cents: 10_000,
                },
                Utc::now(),
            )
            .unwrap()
    }

    #[test]
    fn test_cents_conversion() {
        assert_eq!(to_cents(Decimal::new(1250, 2)).unwrap(), 1250);
        assert_eq!(to_cents(Decimal::new(3, 0)).unwrap(), 300);
        assert_eq!(from_cents(-305), Decimal::new(-305, 2));
    }

    #[test]
    fn test_create_user_credits_bonus() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        assert_eq!(user.balance, Decimal::new(10000, 2));
        assert!(user.is_active);

        let page = ledger.transactions(user.id, 1, 20).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.transactions[0].transaction_type, TransactionType::Bonus);
        assert_eq!(page.transactions[0].description.as_deref(), Some("Welcome bonus"));
    }

    #[test]
    fn test_duplicate_username_and_email() {
        let ledger = ledger();
        add_player(&ledger, "alice");

        let err = ledger
            .create_user(
                &NewPlayer {
                    username: "ALICE",
                    email: "other@example.com",
                    password_hash: "hash",
                    bonus_cents: 0,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");

        let err = ledger
            .create_user(
                &NewPlayer {
                    username: "bob",
                    email: "alice@example.com",
                    password_hash: "hash",
                    bonus_cents: 0,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already exists");
        assert_eq!(ledger.user_count().unwrap(), 1);
    }

    #[test]
    fn test_withdrawal_cannot_overdraw() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");

        let err = ledger
            .post_movement(
                user.id,
                &Movement {
                    transaction_type: TransactionType::Withdrawal,
                    cents: 10_001,
                    description: "Withdrawal of $100.01".into(),
                    reference_id: None,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient balance");

        let txn = ledger
            .post_movement(
                user.id,
                &Movement {
                    transaction_type: TransactionType::Deposit,
                    cents: 2_550,
                    description: "Deposit of $25.50".into(),
                    reference_id: None,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(txn.balance_before, Decimal::new(10000, 2));
        assert_eq!(txn.balance_after, Decimal::new(12550, 2));
    }

    #[test]
    fn test_unknown_transaction_type_fails_the_read() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        ledger
            .lock()
            .unwrap()
            .execute(
                "UPDATE house_transactions SET transaction_type = 'jackpot' WHERE user_id = ?",
                params![user.id],
            )
            .unwrap();

        let err = ledger.transactions(user.id, 1, 20).unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        ledger
            .lock()
            .unwrap()
            .execute(
                "UPDATE house_transactions SET transaction_type = 'bonus', status = 'lost' WHERE user_id = ?",
                params![user.id],
            )
            .unwrap();
        assert!(ledger.transactions(user.id, 1, 20).is_err());
    }

    #[test]
    fn test_balance_overflow_is_rejected() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        let huge = Movement {
            transaction_type: TransactionType::Deposit,
            cents: i64::MAX - 5_000,
            description: "Deposit".into(),
            reference_id: None,
        };

        let err = ledger.post_movement(user.id, &huge, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), AMOUNT_OUT_OF_RANGE);

        let record = ledger.user_by_id(user.id).unwrap().unwrap();
        assert_eq!(record.user.balance, Decimal::new(10000, 2));
        assert_eq!(ledger.transactions(user.id, 1, 10).unwrap().total_count, 1);

        let err = ledger
            .record_round(
                user.id,
                &RoundEntry {
                    game: GameKind::Wheel,
                    bet_cents: 100,
                    win_cents: i64::MAX,
                    game_data: json!({}),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), AMOUNT_OUT_OF_RANGE);
        assert_eq!(ledger.game_sessions(user.id, 1, 10).unwrap().total_count, 0);
    }

    #[test]
    fn test_record_round_books_bet_and_win() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");

        let booked = ledger
            .record_round(
                user.id,
                &RoundEntry {
                    game: GameKind::CoinFlip,
                    bet_cents: 1_000,
                    win_cents: 1_920,
                    game_data: json!({"result": "Heads"}),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(booked.balance_cents, 10_920);

        let page = ledger.transactions(user.id, 1, 10).unwrap();
        assert_eq!(page.total_count, 3);
        let win = &page.transactions[0];
        assert_eq!(win.transaction_type, TransactionType::Win);
        assert_eq!(win.description.as_deref(), Some("Win from Coin Flip"));
        assert_eq!(win.game_session_id, Some(booked.game_session_id));
        let bet = &page.transactions[1];
        assert_eq!(bet.description.as_deref(), Some("Bet for Coin Flip"));
        assert_eq!(bet.balance_after, Decimal::new(9000, 2));

        let history = ledger.game_sessions(user.id, 1, 10).unwrap();
        assert_eq!(history.sessions[0].game_type, "coin");
        assert_eq!(history.sessions[0].net_result, Decimal::new(920, 2));
        assert_eq!(history.sessions[0].game_data.as_ref().unwrap()["result"], "Heads");
    }

    #[test]
    fn test_losing_round_writes_no_win_row() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        ledger
            .record_round(
                user.id,
                &RoundEntry {
                    game: GameKind::DiceRoll,
                    bet_cents: 500,
                    win_cents: 0,
                    game_data: json!({}),
                },
                Utc::now(),
            )
            .unwrap();
        let page = ledger.transactions(user.id, 1, 10).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.transactions[0].transaction_type, TransactionType::Bet);
    }

    #[test]
    fn test_failed_round_leaves_balance() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        let err = ledger
            .record_round(
                user.id,
                &RoundEntry {
                    game: GameKind::Slot,
                    bet_cents: 20_000,
                    win_cents: 0,
                    game_data: json!({}),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient balance");

        let record = ledger.user_by_id(user.id).unwrap().unwrap();
        assert_eq!(record.user.balance, Decimal::new(10000, 2));
        assert_eq!(ledger.game_sessions(user.id, 1, 10).unwrap().total_count, 0);
    }

    #[test]
    fn test_stats_aggregate_rounds() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        for (bet, win) in [(1_000, 0), (1_000, 2_000), (500, 500)] {
            ledger
                .record_round(
                    user.id,
                    &RoundEntry {
                        game: GameKind::Roulette,
                        bet_cents: bet,
                        win_cents: win,
                        game_data: json!({}),
                    },
                    Utc::now(),
                )
                .unwrap();
        }
        let stats = ledger.game_stats(user.id).unwrap();
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.total_bet, Decimal::new(2500, 2));
        assert_eq!(stats.total_won, Decimal::new(2500, 2));
        assert_eq!(stats.net_result, Decimal::ZERO);
    }

    #[test]
    fn test_pagination_newest_first() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        for i in 1..=5 {
            ledger
                .post_movement(
                    user.id,
                    &Movement {
                        transaction_type: TransactionType::Deposit,
                        cents: i * 100,
                        description: format!("Deposit {}", i),
                        reference_id: None,
                    },
                    Utc::now(),
                )
                .unwrap();
        }
        let page = ledger.transactions(user.id, 2, 2).unwrap();
        assert_eq!(page.total_count, 6);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.transactions[0].description.as_deref(), Some("Deposit 3"));

        let past_end = ledger.transactions(user.id, 9, 2).unwrap();
        assert!(past_end.transactions.is_empty());
    }

    #[test]
    fn test_tokens_and_revocation() {
        let ledger = ledger();
        let user = add_player(&ledger, "alice");
        let now = Utc::now();
        for (hash, kind) in [("a", TokenKind::Access), ("r", TokenKind::Refresh)] {
            ledger
                .insert_token(
                    &StoredToken {
                        token_hash: hash.into(),
                        session_id: "s1".into(),
                        user_id: user.id,
                        kind,
                        expires_at: now + chrono::Duration::minutes(5),
                    },
                    now,
                )
                .unwrap();
        }

        let owner = ledger.token_owner("a", TokenKind::Access).unwrap().unwrap();
        assert_eq!(owner.user_id, user.id);
        assert!(ledger.token_owner("a", TokenKind::Refresh).unwrap().is_none());

        assert_eq!(ledger.purge_expired_tokens(now).unwrap(), 0);
        assert_eq!(ledger.revoke_session("s1").unwrap(), 2);
        assert!(ledger.token_owner("a", TokenKind::Access).unwrap().is_none());
    }
}
