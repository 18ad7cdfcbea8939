//! In-process casino for demo mode
//!
//! Runs the same contract as the remote API against the DuckDB house ledger:
//! Argon2id password hashes, opaque bearer tokens stored as SHA-256 hashes,
//! and rounds settled by the house rules.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::ledger::{
    from_cents, to_cents, HouseLedger, Movement, NewPlayer, RoundEntry, StoredToken, TokenKind, UserRecord,
};
use crate::domain::result::{Error, Result};
use crate::domain::rules::play_round;
use crate::domain::wire::format_money;
use crate::domain::{
    AuthTokens, BalanceReceipt, Bet, Credentials, GameHistoryPage, Outcome, PlayResult, Registration,
    StatsReport, TransactionPage, TransactionType, User,
};
use crate::ports::CasinoBackend;

/// Credit for new accounts
pub const WELCOME_BONUS: Decimal = Decimal::from_parts(10000, 0, 0, false, 2);

pub const ACCESS_TOKEN_MINUTES: i64 = 60;
pub const REFRESH_TOKEN_DAYS: i64 = 7;

const TOKEN_BYTES: usize = 32;
const MAX_PER_PAGE: u32 = 100;

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Demo casino backend
pub struct HouseBackend {
    ledger: HouseLedger,
    rng: Mutex<StdRng>,
    hasher: Argon2<'static>,
}

impl HouseBackend {
    /// OS-seeded randomness and default Argon2id cost
    pub fn new(ledger: HouseLedger) -> Self {
        Self {
            ledger,
            rng: Mutex::new(StdRng::from_entropy()),
            hasher: Argon2::default(),
        }
    }

    /// Deterministic rounds and a cheap password hash, for tests and seeding
    pub fn seeded(ledger: HouseLedger, seed: u64) -> Result<Self> {
        let params = Params::new(1024, 1, 1, None)
            .map_err(|e| Error::Config(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self {
            ledger,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn ledger(&self) -> &HouseLedger {
        &self.ledger
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| Error::database(format!("House RNG lock poisoned: {}", e)))?;
        Ok(f(&mut rng))
    }

    fn hash_password(&self, password: &str) -> Result<String> {
        let salt_bytes: [u8; 16] = self.with_rng(|rng| rng.gen())?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Config(format!("Failed to encode salt: {}", e)))?;
        let hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, stored: &str) -> bool {
        PasswordHash::new(stored)
            .map(|parsed| self.hasher.verify_password(password.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    }

    fn new_token(&self) -> Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.with_rng(|rng| rng.fill_bytes(&mut bytes))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Issue an access/refresh pair under one session id
    fn issue_tokens(&self, record: &UserRecord) -> Result<AuthTokens> {
        let now = Utc::now();
        let session_id = Uuid::new_v4().to_string();
        let access_token = self.new_token()?;
        let refresh_token = self.new_token()?;

        for (token, kind, expires_at) in [
            (&access_token, TokenKind::Access, now + Duration::minutes(ACCESS_TOKEN_MINUTES)),
            (&refresh_token, TokenKind::Refresh, now + Duration::days(REFRESH_TOKEN_DAYS)),
        ] {
            self.ledger.insert_token(
                &StoredToken {
                    token_hash: hash_token(token),
                    session_id: session_id.clone(),
                    user_id: record.user.id,
                    kind,
                    expires_at,
                },
                now,
            )?;
        }

        Ok(AuthTokens {
            access_token,
            refresh_token: Some(refresh_token),
            token_type: "bearer".to_string(),
            user: Some(record.user.clone()),
        })
    }

    /// Resolve a bearer token to an active player
    fn authenticate(&self, token: &str, kind: TokenKind) -> Result<UserRecord> {
        let owner = self
            .ledger
            .token_owner(&hash_token(token), kind)?
            .ok_or(Error::Unauthorized)?;
        if owner.expires_at <= Utc::now() {
            return Err(Error::Unauthorized);
        }
        let record = self.ledger.user_by_id(owner.user_id)?.ok_or(Error::Unauthorized)?;
        if !record.user.is_active {
            return Err(Error::Unauthorized);
        }
        Ok(record)
    }

    fn cashier(&self, token: &str, transaction_type: TransactionType, amount: Decimal) -> Result<BalanceReceipt> {
        let record = self.authenticate(token, TokenKind::Access)?;
        let cents = positive_cents(amount, "Amount")?;
        let verb = match transaction_type {
            TransactionType::Withdrawal => "Withdrawal",
            _ => "Deposit",
        };
        let description = format!("{} of {}", verb, format_money(amount));
        let txn = self.ledger.post_movement(
            record.user.id,
            &Movement {
                transaction_type,
                cents,
                description: description.clone(),
                reference_id: Some(Uuid::new_v4().to_string()),
            },
            Utc::now(),
        )?;
        Ok(BalanceReceipt {
            balance: txn.balance_after,
            transaction_id: Some(txn.id),
            message: Some(format!("{} successful", description)),
        })
    }
}

/// Cents for a strictly positive amount with at most two decimals
fn positive_cents(amount: Decimal, what: &str) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation(format!("{} must be greater than zero", what)));
    }
    if amount.round_dp(2) != amount {
        return Err(Error::validation(format!("{} can have at most two decimal places", what)));
    }
    to_cents(amount)
}

fn check_page(page: u32, per_page: u32) -> Result<()> {
    if page == 0 {
        return Err(Error::validation("page must be at least 1"));
    }
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(Error::validation(format!("per_page must be between 1 and {}", MAX_PER_PAGE)));
    }
    Ok(())
}

impl CasinoBackend for HouseBackend {
    fn name(&self) -> &str {
        "house"
    }

    fn endpoint(&self) -> String {
        self.ledger
            .db_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string())
    }

    fn register(&self, registration: &Registration) -> Result<User> {
        registration.validate()?;
        let password_hash = self.hash_password(&registration.password)?;
        self.ledger.create_user(
            &NewPlayer {
                username: registration.username.trim(),
                email: registration.email.trim(),
                password_hash: &password_hash,
                bonus_cents: to_cents(WELCOME_BONUS)?,
            },
            Utc::now(),
        )
    }

    fn login(&self, credentials: &Credentials) -> Result<AuthTokens> {
        let record = self
            .ledger
            .user_by_name(credentials.username.trim())?
            .filter(|record| self.verify_password(&credentials.password, &record.password_hash))
            .ok_or(Error::Unauthorized)?;
        if !record.user.is_active {
            return Err(Error::validation("User account is disabled"));
        }

        let now = Utc::now();
        self.ledger.record_login(record.user.id, now)?;
        self.ledger.purge_expired_tokens(now)?;

        let mut record = record;
        record.user.last_login = Some(now);
        self.issue_tokens(&record)
    }

    fn refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        let record = self.authenticate(refresh_token, TokenKind::Refresh)?;
        // Rotate: the old pair stops working once the new one is issued
        if let Some(owner) = self.ledger.token_owner(&hash_token(refresh_token), TokenKind::Refresh)? {
            self.ledger.revoke_session(&owner.session_id)?;
        }
        self.issue_tokens(&record)
    }

    fn me(&self, token: &str) -> Result<User> {
        Ok(self.authenticate(token, TokenKind::Access)?.user)
    }

    fn balance(&self, token: &str) -> Result<Decimal> {
        Ok(self.authenticate(token, TokenKind::Access)?.user.balance)
    }

    fn deposit(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt> {
        self.cashier(token, TransactionType::Deposit, amount)
    }

    fn withdraw(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt> {
        self.cashier(token, TransactionType::Withdrawal, amount)
    }

    fn transactions(&self, token: &str, page: u32, per_page: u32) -> Result<TransactionPage> {
        let record = self.authenticate(token, TokenKind::Access)?;
        check_page(page, per_page)?;
        self.ledger.transactions(record.user.id, page, per_page)
    }

    fn play(&self, token: &str, bet: &Bet) -> Result<PlayResult> {
        let record = self.authenticate(token, TokenKind::Access)?;
        if let Some(price) = bet.game.fixed_price() {
            if bet.amount != price {
                return Err(Error::validation(format!(
                    "Bet amount must be equal to the card cost ({})",
                    format_money(price)
                )));
            }
        }
        let bet_cents = positive_cents(bet.amount, "Bet amount")?;
        if record.user.balance < bet.amount {
            return Err(Error::validation("Insufficient balance"));
        }

        let round = self.with_rng(|rng| play_round(bet.game, bet.choice, rng))??;
        let winnings = round.winnings(bet.amount);
        let booked = self.ledger.record_round(
            record.user.id,
            &RoundEntry {
                game: bet.game,
                bet_cents,
                win_cents: to_cents(winnings)?,
                game_data: JsonValue::Object(round.details.clone()),
            },
            Utc::now(),
        )?;

        let net_win_loss = winnings - bet.amount;
        let mut details = round.details;
        details.insert("session_id".to_string(), json!(booked.game_session_id));
        Ok(PlayResult {
            game: Some(bet.game),
            outcome: Outcome::from_net(net_win_loss),
            bet: bet.amount,
            winnings,
            net_win_loss,
            new_balance: from_cents(booked.balance_cents),
            details,
        })
    }

    fn game_history(&self, token: &str, page: u32, per_page: u32) -> Result<GameHistoryPage> {
        let record = self.authenticate(token, TokenKind::Access)?;
        check_page(page, per_page)?;
        self.ledger.game_sessions(record.user.id, page, per_page)
    }

    fn stats(&self, token: &str) -> Result<StatsReport> {
        let record = self.authenticate(token, TokenKind::Access)?;
        Ok(StatsReport {
            user_id: record.user.id,
            username: record.user.username.clone(),
            current_balance: record.user.balance,
            stats: self.ledger.game_stats(record.user.id)?,
        })
    }
}

/// House backend that opens the ledger for each call and closes it after
///
/// DuckDB locks the file while a connection is open. Long-running callers
/// such as the balance watcher use this so other `sb` processes can reach
/// the house between calls.
pub struct PerCallHouse {
    path: PathBuf,
}

impl PerCallHouse {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }

    fn open(&self) -> Result<HouseBackend> {
        Ok(HouseBackend::new(HouseLedger::open(&self.path)?))
    }
}

impl CasinoBackend for PerCallHouse {
    fn name(&self) -> &str {
        "house"
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }

    fn register(&self, registration: &Registration) -> Result<User> {
        self.open()?.register(registration)
    }

    fn login(&self, credentials: &Credentials) -> Result<AuthTokens> {
        self.open()?.login(credentials)
    }

    fn refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        self.open()?.refresh(refresh_token)
    }

    fn me(&self, token: &str) -> Result<User> {
        self.open()?.me(token)
    }

    fn balance(&self, token: &str) -> Result<Decimal> {
        self.open()?.balance(token)
    }

    fn deposit(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt> {
        self.open()?.deposit(token, amount)
    }

    fn withdraw(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt> {
        self.open()?.withdraw(token, amount)
    }

    fn transactions(&self, token: &str, page: u32, per_page: u32) -> Result<TransactionPage> {
        self.open()?.transactions(token, page, per_page)
    }

    fn play(&self, token: &str, bet: &Bet) -> Result<PlayResult> {
        self.open()?.play(token, bet)
    }

    fn game_history(&self, token: &str, page: u32, per_page: u32) -> Result<GameHistoryPage> {
        self.open()?.game_history(token, page, per_page)
    }

    fn stats(&self, token: &str) -> Result<StatsReport> {
        self.open()?.stats(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use crate::domain::{Choice, CoinSide, GameKind, Hand};

    fn house() -> HouseBackend {
        let ledger = HouseLedger::open_in_memory().unwrap();
        ledger.run_migrations().unwrap();
        HouseBackend::seeded(ledger, 7).unwrap()
    }

    fn signed_up(house: &HouseBackend) -> String {
        house
            .register(&Registration::new("alice", "alice@example.com", "wonderland"))
            .unwrap();
        house
            .login(&Credentials {
                username: "alice".into(),
                password: "wonderland".into(),
            })
            .unwrap()
            .access_token
    }

    fn coin_bet(amount: Decimal) -> Bet {
        Bet {
            game: GameKind::CoinFlip,
            amount,
            choice: Some(Choice::Coin(CoinSide::Heads)),
        }
    }

    #[test]
    fn test_register_and_login() {
        let house = house();
        let user = house
            .register(&Registration::new("alice", "alice@example.com", "wonderland"))
            .unwrap();
        assert_eq!(user.balance, WELCOME_BONUS);

        let tokens = house
            .login(&Credentials {
                username: "alice".into(),
                password: "wonderland".into(),
            })
            .unwrap();
        assert!(tokens.refresh_token.is_some());
        assert!(tokens.user.unwrap().last_login.is_some());
        assert_eq!(house.me(&tokens.access_token).unwrap().username, "alice");
    }

    #[test]
    fn test_password_is_not_stored_in_clear() {
        let house = house();
        signed_up(&house);
        let record = house.ledger().user_by_name("alice").unwrap().unwrap();
        assert!(record.password_hash.starts_with("$argon2id$"));
        assert!(!record.password_hash.contains("wonderland"));
    }

    #[test]
    fn test_wrong_password_is_unauthorized() {
        let house = house();
        signed_up(&house);
        let err = house
            .login(&Credentials {
                username: "alice".into(),
                password: "looking-glass".into(),
            })
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_disabled_account_cannot_log_in() {
        let house = house();
        let user = house
            .register(&Registration::new("alice", "alice@example.com", "wonderland"))
            .unwrap();
        house.ledger().set_active(user.id, false).unwrap();
        let err = house
            .login(&Credentials {
                username: "alice".into(),
                password: "wonderland".into(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "User account is disabled");
    }

    #[test]
    fn test_refresh_rotates_tokens() {
        let house = house();
        house
            .register(&Registration::new("alice", "alice@example.com", "wonderland"))
            .unwrap();
        let first = house
            .login(&Credentials {
                username: "alice".into(),
                password: "wonderland".into(),
            })
            .unwrap();
        let refresh = first.refresh_token.clone().unwrap();

        let second = house.refresh(&refresh).unwrap();
        assert_ne!(second.access_token, first.access_token);
        assert!(house.balance(&second.access_token).is_ok());
        assert!(house.balance(&first.access_token).unwrap_err().is_unauthorized());
        assert!(house.refresh(&refresh).unwrap_err().is_unauthorized());
        // An access token is not a refresh token
        assert!(house.refresh(&second.access_token).unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_cashier_descriptions_and_overdraw() {
        let house = house();
        let token = signed_up(&house);

        let receipt = house.deposit(&token, Decimal::new(2550, 2)).unwrap();
        assert_eq!(receipt.balance, Decimal::new(12550, 2));
        let receipt = house.withdraw(&token, Decimal::new(550, 2)).unwrap();
        assert_eq!(receipt.balance, Decimal::new(12000, 2));

        let page = house.transactions(&token, 1, 10).unwrap();
        assert_eq!(page.transactions[0].description.as_deref(), Some("Withdrawal of $5.50"));
        assert_eq!(page.transactions[1].description.as_deref(), Some("Deposit of $25.50"));

        let err = house.withdraw(&token, Decimal::new(1_000_000, 2)).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient balance");
        assert!(house.deposit(&token, Decimal::new(-5, 0)).is_err());
        assert!(house.deposit(&token, Decimal::new(1005, 3)).is_err());
    }

    #[test]
    fn test_huge_deposits_cannot_overflow_balance() {
        let house = house();
        let token = signed_up(&house);
        let huge = Decimal::from_str("90000000000000000").unwrap();

        let first = house.deposit(&token, huge).unwrap();
        assert_eq!(first.balance, huge + Decimal::new(100, 0));
        let err = house.deposit(&token, huge).unwrap_err();
        assert_eq!(err.to_string(), "Amount is out of range");
        assert_eq!(house.balance(&token).unwrap(), first.balance);
    }

    #[test]
    fn test_play_settles_against_balance() {
        let house = house();
        let token = signed_up(&house);
        let before = house.balance(&token).unwrap();

        let result = house.play(&token, &coin_bet(Decimal::new(1000, 2))).unwrap();
        assert_eq!(result.new_balance, before - result.bet + result.winnings);
        assert_eq!(house.balance(&token).unwrap(), result.new_balance);
        assert!(result.details.contains_key("result"));
        assert!(result.details.contains_key("session_id"));

        let history = house.game_history(&token, 1, 10).unwrap();
        assert_eq!(history.total_count, 1);
        assert_eq!(house.stats(&token).unwrap().stats.total_games, 1);
    }

    #[test]
    fn test_seeded_house_is_deterministic() {
        let play = || {
            let house = house();
            let token = signed_up(&house);
            (0..10)
                .map(|_| house.play(&token, &coin_bet(Decimal::ONE)).unwrap().outcome)
                .collect::<Vec<_>>()
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn test_play_rejections_leave_balance() {
        let house = house();
        let token = signed_up(&house);

        let err = house.play(&token, &coin_bet(Decimal::new(50_000, 2))).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient balance");

        let scratch = Bet {
            game: GameKind::ScratchCard,
            amount: Decimal::new(5, 0),
            choice: None,
        };
        assert!(house.play(&token, &scratch).is_err());

        let wrong_pick = Bet {
            game: GameKind::CoinFlip,
            amount: Decimal::ONE,
            choice: Some(Choice::Hand(Hand::Rock)),
        };
        assert!(matches!(house.play(&token, &wrong_pick), Err(Error::Validation(_))));

        assert_eq!(house.balance(&token).unwrap(), WELCOME_BONUS);
        assert_eq!(house.game_history(&token, 1, 10).unwrap().total_count, 0);
    }

    #[test]
    fn test_unknown_token_is_unauthorized() {
        let house = house();
        signed_up(&house);
        assert!(house.balance("nope").unwrap_err().is_unauthorized());
        assert!(house.stats("nope").unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_page_bounds() {
        let house = house();
        let token = signed_up(&house);
        assert!(house.transactions(&token, 0, 10).is_err());
        assert!(house.transactions(&token, 1, 101).is_err());
        assert!(house.game_history(&token, 1, 0).is_err());
    }

    #[test]
    fn test_per_call_house_releases_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house.duckdb");
        {
            let ledger = HouseLedger::open(&path).unwrap();
            ledger.run_migrations().unwrap();
            signed_up(&HouseBackend::seeded(ledger, 7).unwrap());
        }

        let per_call = PerCallHouse::new(&path);
        let token = per_call
            .login(&Credentials {
                username: "alice".into(),
                password: "wonderland".into(),
            })
            .unwrap()
            .access_token;
        assert_eq!(per_call.balance(&token).unwrap(), WELCOME_BONUS);

        // Another connection can take the file between calls
        let other = HouseBackend::new(HouseLedger::open(&path).unwrap());
        other.deposit(&token, Decimal::from(25)).unwrap();
        drop(other);

        assert_eq!(per_call.balance(&token).unwrap(), WELCOME_BONUS + Decimal::from(25));
        assert_eq!(per_call.endpoint(), path.display().to_string());
    }
}
