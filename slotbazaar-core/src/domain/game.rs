//! Game catalog, player choices and play results

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::result::{Error, Result};
use super::wire::{deserialize_amount, deserialize_timestamp, format_money};

/// Every game the lobby offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    CoinFlip,
    DiceRoll,
    HighLow,
    NumberGuess,
    Slot,
    RockPaperScissors,
    Roulette,
    ScratchCard,
    Blackjack,
    Wheel,
}

/// What a player has to pick before a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    None,
    CoinSide,
    DieFace,
    HighLow,
    Guess,
    Hand,
    Color,
}

impl ChoiceKind {
    /// Human-readable list of accepted picks
    pub fn options(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::CoinSide => "Heads, Tails",
            Self::DieFace => "1-6",
            Self::HighLow => "Low, High",
            Self::Guess => "1-10",
            Self::Hand => "Rock, Paper, Scissors",
            Self::Color => "Red, Black",
        }
    }
}

impl GameKind {
    pub const ALL: [GameKind; 10] = [
        GameKind::CoinFlip,
        GameKind::DiceRoll,
        GameKind::HighLow,
        GameKind::NumberGuess,
        GameKind::Slot,
        GameKind::RockPaperScissors,
        GameKind::Roulette,
        GameKind::ScratchCard,
        GameKind::Blackjack,
        GameKind::Wheel,
    ];

    /// Path segment under `/games/`
    pub fn slug(&self) -> &'static str {
        match self {
            Self::CoinFlip => "coin",
            Self::DiceRoll => "dice",
            Self::HighLow => "highlow",
            Self::NumberGuess => "guess",
            Self::Slot => "slot",
            Self::RockPaperScissors => "rps",
            Self::Roulette => "roulette",
            Self::ScratchCard => "scratch",
            Self::Blackjack => "blackjack",
            Self::Wheel => "wheel",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::CoinFlip => "Coin Flip",
            Self::DiceRoll => "Dice Roll",
            Self::HighLow => "High/Low Card",
            Self::NumberGuess => "Number Guess",
            Self::Slot => "3-Reel Slot",
            Self::RockPaperScissors => "Rock Paper Scissors",
            Self::Roulette => "Simple Roulette",
            Self::ScratchCard => "Scratch Card",
            Self::Blackjack => "Simplified Blackjack",
            Self::Wheel => "Wheel of Fortune",
        }
    }

    /// Advertised return-to-player, in percent
    pub fn rtp(&self) -> f64 {
        match self {
            Self::CoinFlip => 96.0,
            Self::DiceRoll => 95.0,
            Self::HighLow => 96.0,
            Self::NumberGuess => 95.0,
            Self::Slot => 96.3,
            Self::RockPaperScissors => 97.0,
            Self::Roulette => 97.3,
            Self::ScratchCard => 96.0,
            Self::Blackjack => 100.0,
            Self::Wheel => 95.0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CoinFlip => "Call heads or tails. A correct call pays 1.92x.",
            Self::DiceRoll => "Pick a face of a six-sided die. A hit pays 5.7x.",
            Self::HighLow => "Bet whether the next card is low (2-7) or high (8-A).",
            Self::NumberGuess => "Guess the secret number from 1 to 10. A hit pays 9.5x.",
            Self::Slot => "Spin three reels. Three cherries, lemons or bells pay 5x, 8x or 13x.",
            Self::RockPaperScissors => "Beat the house hand for 1.91x. A tie returns the bet.",
            Self::Roulette => "Red or black on a single-zero wheel. A hit pays 2x.",
            Self::ScratchCard => "Scratch a $1.00 card to reveal a prize of up to 20x.",
            Self::Blackjack => "One deal against the dealer. Closest to 21 without busting wins 2x.",
            Self::Wheel => "Spin a ten-segment wheel with prizes up to 3x.",
        }
    }

    pub fn choice_kind(&self) -> ChoiceKind {
        match self {
            Self::CoinFlip => ChoiceKind::CoinSide,
            Self::DiceRoll => ChoiceKind::DieFace,
            Self::HighLow => ChoiceKind::HighLow,
            Self::NumberGuess => ChoiceKind::Guess,
            Self::RockPaperScissors => ChoiceKind::Hand,
            Self::Roulette => ChoiceKind::Color,
            Self::Slot | Self::ScratchCard | Self::Blackjack | Self::Wheel => ChoiceKind::None,
        }
    }

    /// Games sold at a fixed price ignore the bet input
    pub fn fixed_price(&self) -> Option<Decimal> {
        match self {
            Self::ScratchCard => Some(Decimal::ONE),
            _ => None,
        }
    }

    /// Turn the player's pick into a typed choice for this game
    pub fn parse_choice(&self, input: Option<&str>) -> Result<Option<Choice>> {
        let kind = self.choice_kind();
        let input = input.map(str::trim).filter(|s| !s.is_empty());
        match (kind, input) {
            (ChoiceKind::None, None) => Ok(None),
            (ChoiceKind::None, Some(_)) => Err(Error::validation(format!(
                "{} does not take a choice",
                self.title()
            ))),
            (kind, None) => Err(Error::validation(format!(
                "Please choose one of: {}",
                kind.options()
            ))),
            (kind, Some(raw)) => {
                let invalid = || {
                    Error::validation(format!("Invalid choice '{}'. Choose one of: {}", raw, kind.options()))
                };
                let choice = match kind {
                    ChoiceKind::CoinSide => Choice::Coin(raw.parse().map_err(|_| invalid())?),
                    ChoiceKind::HighLow => Choice::Call(raw.parse().map_err(|_| invalid())?),
                    ChoiceKind::Hand => Choice::Hand(raw.parse().map_err(|_| invalid())?),
                    ChoiceKind::Color => match raw.parse::<Color>() {
                        Ok(Color::Green) | Err(_) => return Err(invalid()),
                        Ok(color) => Choice::Color(color),
                    },
                    ChoiceKind::DieFace => match raw.parse::<u8>() {
                        Ok(n @ 1..=6) => Choice::Face(n),
                        _ => return Err(invalid()),
                    },
                    ChoiceKind::Guess => match raw.parse::<u8>() {
                        Ok(n @ 1..=10) => Choice::Guess(n),
                        _ => return Err(invalid()),
                    },
                    ChoiceKind::None => return Ok(None),
                };
                Ok(Some(choice))
            }
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for GameKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' ' | '/'))
            .collect::<String>()
            .to_ascii_lowercase();
        let kind = match key.as_str() {
            "coin" | "coinflip" => Self::CoinFlip,
            "dice" | "diceroll" => Self::DiceRoll,
            "highlow" | "highlowcard" | "hilo" => Self::HighLow,
            "guess" | "numberguess" => Self::NumberGuess,
            "slot" | "slots" | "reelslot" | "threereelslot" | "3reelslot" => Self::Slot,
            "rps" | "rockpaperscissors" => Self::RockPaperScissors,
            "roulette" | "simpleroulette" => Self::Roulette,
            "scratch" | "scratchcard" => Self::ScratchCard,
            "blackjack" | "simplifiedblackjack" => Self::Blackjack,
            "wheel" | "wheeloffortune" => Self::Wheel,
            _ => return Err(Error::not_found(format!("Unknown game '{}'", s))),
        };
        Ok(kind)
    }
}

macro_rules! named_pick {
    ($name:ident { $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let lower = s.trim().to_ascii_lowercase();
                $(
                    if lower == $label.to_ascii_lowercase() $(|| lower == $alias)* {
                        return Ok(Self::$variant);
                    }
                )+
                Err(Error::validation(format!("Unrecognised choice '{}'", s)))
            }
        }
    };
}

named_pick!(CoinSide { Heads => "Heads" | "h", Tails => "Tails" | "t" });
named_pick!(HighLowCall { Low => "Low" | "l" | "lo", High => "High" | "h" | "hi" });
named_pick!(Hand { Rock => "Rock" | "r", Paper => "Paper" | "p", Scissors => "Scissors" | "s" });
named_pick!(Color { Red => "Red" | "r", Black => "Black" | "b", Green => "Green" });

/// A typed pick for the games that need one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Coin(CoinSide),
    Face(u8),
    Call(HighLowCall),
    Guess(u8),
    Hand(Hand),
    Color(Color),
}

impl Choice {
    /// Value sent as `choice` in the play request
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Coin(side) => JsonValue::from(side.as_str()),
            Self::Call(call) => JsonValue::from(call.as_str()),
            Self::Hand(hand) => JsonValue::from(hand.as_str()),
            Self::Color(color) => JsonValue::from(color.as_str()),
            Self::Face(n) | Self::Guess(n) => JsonValue::from(*n),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coin(side) => write!(f, "{}", side),
            Self::Call(call) => write!(f, "{}", call),
            Self::Hand(hand) => write!(f, "{}", hand),
            Self::Color(color) => write!(f, "{}", color),
            Self::Face(n) | Self::Guess(n) => write!(f, "{}", n),
        }
    }
}

/// A validated wager ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct Bet {
    pub game: GameKind,
    pub amount: Decimal,
    pub choice: Option<Choice>,
}

impl Bet {
    /// JSON body for `POST /games/<slug>/play`
    pub fn to_request_body(&self) -> JsonValue {
        use rust_decimal::prelude::ToPrimitive;

        let mut body = Map::new();
        body.insert(
            "bet_amount".to_string(),
            self.amount.to_f64().map(JsonValue::from).unwrap_or(JsonValue::Null),
        );
        if let Some(choice) = &self.choice {
            body.insert("choice".to_string(), choice.to_json());
        }
        JsonValue::Object(body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    #[default]
    Loss,
    Push,
}

impl Outcome {
    pub fn from_net(net: Decimal) -> Self {
        if net > Decimal::ZERO {
            Self::Win
        } else if net.is_zero() {
            Self::Push
        } else {
            Self::Loss
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Win => "Win",
            Self::Loss => "Loss",
            Self::Push => "Push",
        })
    }
}

/// Settled round as returned by the backend
///
/// Game-specific fields (cards, reels, the house hand) stay in `details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayResult {
    #[serde(default, skip_deserializing)]
    pub game: Option<GameKind>,
    #[serde(default, skip_deserializing)]
    pub outcome: Outcome,
    #[serde(default, alias = "bet_amount", deserialize_with = "deserialize_amount")]
    pub bet: Decimal,
    #[serde(alias = "win_amount", deserialize_with = "deserialize_amount")]
    pub winnings: Decimal,
    #[serde(alias = "net_result", deserialize_with = "deserialize_amount")]
    pub net_win_loss: Decimal,
    #[serde(alias = "balance_after", deserialize_with = "deserialize_amount")]
    pub new_balance: Decimal,
    #[serde(flatten)]
    pub details: Map<String, JsonValue>,
}

impl PlayResult {
    /// Attach the game and wager the client sent and classify the round
    pub fn settle(mut self, bet: &Bet) -> Self {
        self.game = Some(bet.game);
        if self.bet.is_zero() {
            self.bet = bet.amount;
        }
        self.outcome = Outcome::from_net(self.net_win_loss);
        self
    }

    /// One-line summary of the game-specific fields, e.g. `result: Heads`
    pub fn detail_summary(&self) -> String {
        self.details
            .iter()
            .map(|(key, value)| match value {
                JsonValue::String(s) => format!("{}: {}", key, s),
                other => format!("{}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PlayResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | bet {} | won {} | net {} | balance {}",
            self.outcome,
            format_money(self.bet),
            format_money(self.winnings),
            format_money(self.net_win_loss),
            format_money(self.new_balance)
        )
    }
}

/// A recorded round from `/user/games`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: i64,
    pub user_id: i64,
    pub game_type: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub bet_amount: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub win_amount: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub net_result: Decimal,
    #[serde(default)]
    pub game_data: Option<JsonValue>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    /// Catalog title when the slug is known, else the raw type
    pub fn display_name(&self) -> String {
        self.game_type
            .parse::<GameKind>()
            .map(|kind| kind.title().to_string())
            .unwrap_or_else(|_| self.game_type.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameHistoryPage {
    pub sessions: Vec<GameSession>,
    pub total_count: i64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub total_games: i64,
    #[serde(deserialize_with = "deserialize_amount")]
    pub total_bet: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub total_won: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub net_result: Decimal,
}

/// Reply of `/user/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub user_id: i64,
    pub username: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub current_balance: Decimal,
    pub stats: GameStats,
}
