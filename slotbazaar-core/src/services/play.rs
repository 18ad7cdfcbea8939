//! Play service - one form, submit and render path for every game

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use super::auth::with_session;
use crate::domain::bet::{parse_bet, validate_bet, INSUFFICIENT_BALANCE, INVALID_BET};
use crate::domain::result::{Error, Result};
use crate::domain::wire::format_money;
use crate::domain::{
    Bet, BetLimits, GameHistoryPage, GameKind, Notice, PlayResult, StatsReport,
};
use crate::ports::{CasinoBackend, SessionStore};

use super::wallet::MAX_PER_PAGE;

/// Catalog entry shown by `sb games`
#[derive(Debug, Clone, Serialize)]
pub struct GameInfo {
    pub slug: &'static str,
    pub title: &'static str,
    pub rtp: f64,
    pub description: &'static str,
    pub choices: &'static str,
    pub fixed_price: Option<Decimal>,
}

impl From<GameKind> for GameInfo {
    fn from(kind: GameKind) -> Self {
        Self {
            slug: kind.slug(),
            title: kind.title(),
            rtp: kind.rtp(),
            description: kind.description(),
            choices: kind.choice_kind().options(),
            fixed_price: kind.fixed_price(),
        }
    }
}

/// A settled round and the notice to show for it
#[derive(Debug, Clone, Serialize)]
pub struct PlayOutcome {
    pub result: PlayResult,
    pub notice: Notice,
}

pub struct PlayService {
    backend: Arc<dyn CasinoBackend>,
    store: Arc<dyn SessionStore>,
    limits: BetLimits,
}

impl PlayService {
    pub fn new(backend: Arc<dyn CasinoBackend>, store: Arc<dyn SessionStore>, limits: BetLimits) -> Self {
        Self { backend, store, limits }
    }

    pub fn limits(&self) -> BetLimits {
        self.limits
    }

    pub fn catalog(&self) -> Vec<GameInfo> {
        GameKind::ALL.iter().copied().map(GameInfo::from).collect()
    }

    /// Validate the form, place the wager and describe the result
    ///
    /// Nothing is sent when the pick, the amount, or the balance check fails.
    pub fn play(&self, game: GameKind, choice: Option<&str>, bet_input: Option<&str>) -> Result<PlayOutcome> {
        let choice = game.parse_choice(choice)?;

        with_session(self.store.as_ref(), |token| {
            let balance = self.backend.balance(token)?;
            let amount = self.wager(game, bet_input, balance)?;
            let bet = Bet { game, amount, choice };
            let result = self.backend.play(token, &bet)?;
            let notice = Notice::for_play(&result);
            Ok(PlayOutcome { result, notice })
        })
    }

    fn wager(&self, game: GameKind, bet_input: Option<&str>, balance: Decimal) -> Result<Decimal> {
        let input = bet_input.map(str::trim).filter(|s| !s.is_empty());
        match (game.fixed_price(), input) {
            // Fixed-price cards skip the table limits
            (Some(price), input) => {
                if let Some(raw) = input {
                    if parse_bet(raw)? != price {
                        return Err(Error::validation(format!(
                            "{} costs {}",
                            game.title(),
                            format_money(price)
                        )));
                    }
                }
                if price > balance {
                    return Err(Error::validation(INSUFFICIENT_BALANCE));
                }
                Ok(price)
            }
            (None, Some(raw)) => validate_bet(raw, &self.limits, balance),
            (None, None) => Err(Error::validation(INVALID_BET)),
        }
    }

    pub fn history(&self, page: u32, per_page: u32) -> Result<GameHistoryPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        with_session(self.store.as_ref(), |token| {
            self.backend.game_history(token, page, per_page)
        })
    }

    pub fn stats(&self) -> Result<StatsReport> {
        with_session(self.store.as_ref(), |token| self.backend.stats(token))
    }
}
