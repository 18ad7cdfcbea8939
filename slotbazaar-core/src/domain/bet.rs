//! Input shaping for bets, deposits and withdrawals
//!
//! These checks run before any request is sent. The backend repeats them
//! authoritatively.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::wire::format_money;

/// Digits, an optional point, at most two decimals
pub const AMOUNT_PATTERN: &str = r"^\d*\.?\d{0,2}$";

pub const INVALID_BET: &str = "Please enter a valid bet amount";
pub const INVALID_AMOUNT: &str = "Please enter a valid amount";
pub const INSUFFICIENT_BALANCE: &str = "Insufficient balance";

/// Smallest deposit the cashier accepts
pub const MIN_DEPOSIT: Decimal = Decimal::ONE;

/// Largest single deposit the cashier accepts
pub const MAX_DEPOSIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 2);

/// Table limits for a single wager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetLimits {
    pub min: Decimal,
    pub max: Decimal,
}

impl Default for BetLimits {
    fn default() -> Self {
        Self {
            min: Decimal::new(1, 0),
            max: Decimal::new(1000, 0),
        }
    }
}

fn parse_with(input: &str, message: &str) -> Result<Decimal> {
    let input = input.trim().trim_start_matches('$');
    let re = Regex::new(AMOUNT_PATTERN).map_err(|e| Error::validation(e.to_string()))?;
    if input.is_empty() || input == "." || !re.is_match(input) {
        return Err(Error::validation(message));
    }
    let amount = Decimal::from_str(input).map_err(|_| Error::validation(message))?;
    if amount <= Decimal::ZERO {
        return Err(Error::validation(message));
    }
    Ok(amount.round_dp(2))
}

/// Parse a positive amount with at most two decimals
pub fn parse_amount(input: &str) -> Result<Decimal> {
    parse_with(input, INVALID_AMOUNT)
}

/// Parse a wager without checking it against balance or limits
pub fn parse_bet(input: &str) -> Result<Decimal> {
    parse_with(input, INVALID_BET)
}

/// Validate a wager against format, balance and table limits, in that order
pub fn validate_bet(input: &str, limits: &BetLimits, balance: Decimal) -> Result<Decimal> {
    let amount = parse_bet(input)?;
    check_bet(amount, limits, balance)?;
    Ok(amount)
}

/// Balance and limit checks for an already-parsed wager
pub fn check_bet(amount: Decimal, limits: &BetLimits, balance: Decimal) -> Result<()> {
    if amount > balance {
        return Err(Error::validation(INSUFFICIENT_BALANCE));
    }
    if amount < limits.min {
        return Err(Error::validation(format!("Minimum bet is {}", format_money(limits.min))));
    }
    if amount > limits.max {
        return Err(Error::validation(format!("Maximum bet is {}", format_money(limits.max))));
    }
    Ok(())
}

pub fn validate_deposit(input: &str) -> Result<Decimal> {
    let amount = parse_amount(input)?;
    if amount < MIN_DEPOSIT {
        return Err(Error::validation(format!(
            "Minimum deposit is {}",
            format_money(MIN_DEPOSIT)
        )));
    }
    if amount > MAX_DEPOSIT {
        return Err(Error::validation(format!(
            "Maximum deposit is {}",
            format_money(MAX_DEPOSIT)
        )));
    }
    Ok(amount)
}

pub fn validate_withdrawal(input: &str, balance: Decimal) -> Result<Decimal> {
    let amount = parse_amount(input)?;
    if amount > balance {
        return Err(Error::validation(INSUFFICIENT_BALANCE));
    }
    Ok(amount)
}
