//! House rules for every game
//!
//! Each round draws from the supplied RNG and yields a payout rate. The
//! caller multiplies the wager by the rate and books the difference.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value as JsonValue};

use super::game::{Choice, CoinSide, Color, GameKind, Hand, HighLowCall};
use super::result::{Error, Result};

const COIN_RATE: Decimal = Decimal::from_parts(192, 0, 0, false, 2);
const DICE_RATE: Decimal = Decimal::from_parts(570, 0, 0, false, 2);
const LOW_RATE: Decimal = Decimal::from_parts(208, 0, 0, false, 2);
const HIGH_RATE: Decimal = Decimal::from_parts(178, 0, 0, false, 2);
const GUESS_RATE: Decimal = Decimal::from_parts(950, 0, 0, false, 2);
const RPS_WIN_RATE: Decimal = Decimal::from_parts(191, 0, 0, false, 2);
const EVEN_MONEY: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Highest card value that still counts as "low"
const LOW_CEILING: u8 = 7;

/// Slot symbols and what three of a kind pays
const SLOT_SYMBOLS: [(&str, i64); 3] = [("Cherry", 5), ("Lemon", 8), ("Bell", 13)];

/// Scratch card prizes as (rate in tenths, weight per thousand)
const SCRATCH_PRIZES: [(i64, u32); 6] = [(0, 620), (10, 160), (20, 150), (50, 50), (100, 15), (200, 5)];

/// Wheel segments as rates in tenths
const WHEEL_SEGMENTS: [i64; 10] = [0, 0, 0, 0, 0, 15, 15, 15, 20, 30];

const CARD_RANKS: [&str; 13] = ["2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K", "A"];
const CARD_SUITS: [&str; 4] = ["H", "D", "C", "S"];

/// A settled round before any money moves
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// Multiplier applied to the wager; zero is a loss, one returns the stake
    pub rate: Decimal,
    /// Game-specific record of what happened
    pub details: Map<String, JsonValue>,
}

impl Round {
    fn new(rate: Decimal, details: JsonValue) -> Self {
        let details = match details {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        Self { rate, details }
    }

    /// Prize for `bet`, rounded to cents
    pub fn winnings(&self, bet: Decimal) -> Decimal {
        (bet * self.rate).round_dp(2)
    }
}

fn rate_json(rate: Decimal) -> JsonValue {
    rate.to_f64().map(JsonValue::from).unwrap_or(JsonValue::Null)
}

/// Play one round of `game` with the player's pick
pub fn play_round<R: Rng + ?Sized>(game: GameKind, choice: Option<Choice>, rng: &mut R) -> Result<Round> {
    let missing = || Error::validation(format!("A choice is required for {}", game.title()));
    let mismatched = |c: Choice| Error::validation(format!("'{}' is not a valid pick for {}", c, game.title()));

    match (game, choice) {
        (GameKind::CoinFlip, Some(Choice::Coin(side))) => Ok(coin_flip(side, rng)),
        (GameKind::DiceRoll, Some(Choice::Face(face))) if (1..=6).contains(&face) => Ok(dice_roll(face, rng)),
        (GameKind::HighLow, Some(Choice::Call(call))) => Ok(high_low(call, rng)),
        (GameKind::NumberGuess, Some(Choice::Guess(n))) if (1..=10).contains(&n) => Ok(number_guess(n, rng)),
        (GameKind::RockPaperScissors, Some(Choice::Hand(hand))) => Ok(rock_paper_scissors(hand, rng)),
        (GameKind::Roulette, Some(Choice::Color(color))) if color != Color::Green => Ok(roulette(color, rng)),
        (GameKind::Slot, None) => Ok(slot(rng)),
        (GameKind::ScratchCard, None) => scratch_card(rng),
        (GameKind::Blackjack, None) => Ok(blackjack(rng)),
        (GameKind::Wheel, None) => Ok(wheel(rng)),
        (_, Some(c)) => Err(mismatched(c)),
        (_, None) => Err(missing()),
    }
}

fn coin_flip<R: Rng + ?Sized>(side: CoinSide, rng: &mut R) -> Round {
    let flip = if rng.gen_bool(0.5) { CoinSide::Heads } else { CoinSide::Tails };
    let rate = if flip == side { COIN_RATE } else { Decimal::ZERO };
    Round::new(rate, json!({ "choice": side.as_str(), "result": flip.as_str() }))
}

fn dice_roll<R: Rng + ?Sized>(face: u8, rng: &mut R) -> Round {
    let roll: u8 = rng.gen_range(1..=6);
    let rate = if roll == face { DICE_RATE } else { Decimal::ZERO };
    Round::new(rate, json!({ "choice": face, "roll": roll }))
}

/// Card value for high/low: pips at face value, J=11, Q=12, K and A both 13
fn high_low_value(rank: usize) -> u8 {
    match rank {
        0..=8 => rank as u8 + 2,
        9 => 11,
        10 => 12,
        _ => 13,
    }
}

fn high_low<R: Rng + ?Sized>(call: HighLowCall, rng: &mut R) -> Round {
    let rank = rng.gen_range(0..CARD_RANKS.len());
    let value = high_low_value(rank);
    let rate = match call {
        HighLowCall::Low if value <= LOW_CEILING => LOW_RATE,
        HighLowCall::High if value > LOW_CEILING => HIGH_RATE,
        _ => Decimal::ZERO,
    };
    Round::new(
        rate,
        json!({ "choice": call.as_str(), "card": CARD_RANKS[rank], "value": value }),
    )
}

fn number_guess<R: Rng + ?Sized>(guess: u8, rng: &mut R) -> Round {
    let secret: u8 = rng.gen_range(1..=10);
    let rate = if secret == guess { GUESS_RATE } else { Decimal::ZERO };
    Round::new(rate, json!({ "guess": guess, "secret_number": secret }))
}

fn beats(a: Hand, b: Hand) -> bool {
    matches!(
        (a, b),
        (Hand::Rock, Hand::Scissors) | (Hand::Paper, Hand::Rock) | (Hand::Scissors, Hand::Paper)
    )
}

fn rock_paper_scissors<R: Rng + ?Sized>(hand: Hand, rng: &mut R) -> Round {
    const HANDS: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];
    let house = HANDS[rng.gen_range(0..HANDS.len())];
    let (rate, verdict) = if hand == house {
        (Decimal::ONE, "Push")
    } else if beats(hand, house) {
        (RPS_WIN_RATE, "Win")
    } else {
        (Decimal::ZERO, "Loss")
    };
    Round::new(
        rate,
        json!({ "choice": hand.as_str(), "house": house.as_str(), "result": verdict }),
    )
}

/// Pocket colour on a single-zero wheel with 1-18 red and 19-36 black
pub fn roulette_color(number: u8) -> Color {
    match number {
        0 => Color::Green,
        1..=18 => Color::Red,
        _ => Color::Black,
    }
}

fn roulette<R: Rng + ?Sized>(color: Color, rng: &mut R) -> Round {
    let number: u8 = rng.gen_range(0..=36);
    let landed = roulette_color(number);
    let rate = if landed == color { EVEN_MONEY } else { Decimal::ZERO };
    Round::new(
        rate,
        json!({ "choice": color.as_str(), "number": number, "color": landed.as_str() }),
    )
}

fn slot<R: Rng + ?Sized>(rng: &mut R) -> Round {
    let reels: Vec<usize> = (0..3).map(|_| rng.gen_range(0..SLOT_SYMBOLS.len())).collect();
    let rate = if reels.iter().all(|&r| r == reels[0]) {
        Decimal::new(SLOT_SYMBOLS[reels[0]].1, 0)
    } else {
        Decimal::ZERO
    };
    let symbols: Vec<&str> = reels.iter().map(|&r| SLOT_SYMBOLS[r].0).collect();
    Round::new(rate, json!({ "reels": symbols }))
}

fn scratch_card<R: Rng + ?Sized>(rng: &mut R) -> Result<Round> {
    let weights = WeightedIndex::new(SCRATCH_PRIZES.iter().map(|(_, w)| *w))
        .map_err(|e| Error::validation(format!("Invalid scratch card table: {}", e)))?;
    let rate = Decimal::new(SCRATCH_PRIZES[weights.sample(rng)].0, 1).normalize();
    Ok(Round::new(rate, json!({ "multiplier": rate_json(rate) })))
}

fn wheel<R: Rng + ?Sized>(rng: &mut R) -> Round {
    let segment = rng.gen_range(0..WHEEL_SEGMENTS.len());
    let rate = Decimal::new(WHEEL_SEGMENTS[segment], 1).normalize();
    Round::new(rate, json!({ "segment": segment, "multiplier": rate_json(rate) }))
}

/// Blackjack total with aces counted as 11 until that would bust
pub fn hand_total(ranks: &[usize]) -> u8 {
    let mut total: u8 = 0;
    let mut soft_aces = 0;
    for &rank in ranks {
        total += match CARD_RANKS[rank] {
            "A" => {
                soft_aces += 1;
                11
            }
            "J" | "Q" | "K" => 10,
            _ => rank as u8 + 2,
        };
    }
    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    total
}

fn blackjack<R: Rng + ?Sized>(rng: &mut R) -> Round {
    let mut deck: Vec<(usize, usize)> = (0..CARD_SUITS.len())
        .flat_map(|suit| (0..CARD_RANKS.len()).map(move |rank| (rank, suit)))
        .collect();
    deck.shuffle(rng);

    let player = [deck[0], deck[2]];
    let dealer = [deck[1], deck[3]];
    let ranks = |hand: &[(usize, usize)]| hand.iter().map(|(r, _)| *r).collect::<Vec<_>>();
    let player_total = hand_total(&ranks(&player));
    let dealer_total = hand_total(&ranks(&dealer));
    let player_bj = player_total == 21;
    let dealer_bj = dealer_total == 21;

    let (rate, verdict) = if player_bj && dealer_bj {
        (Decimal::ONE, "Push")
    } else if player_bj {
        (EVEN_MONEY, "Blackjack")
    } else if dealer_bj {
        (Decimal::ZERO, "Dealer blackjack")
    } else if player_total > 21 {
        (Decimal::ZERO, "Bust")
    } else if dealer_total > 21 || player_total > dealer_total {
        (EVEN_MONEY, "Win")
    } else if dealer_total > player_total {
        (Decimal::ZERO, "Loss")
    } else {
        (Decimal::ONE, "Push")
    };

    let show = |hand: &[(usize, usize)]| {
        hand.iter()
            .map(|(r, s)| format!("{}{}", CARD_RANKS[*r], CARD_SUITS[*s]))
            .collect::<Vec<_>>()
    };
    Round::new(
        rate,
        json!({
            "player_hand": show(&player),
            "dealer_hand": show(&dealer),
            "player_total": player_total,
            "dealer_total": dealer_total,
            "result": verdict,
        }),
    )
}
