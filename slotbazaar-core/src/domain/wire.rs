//! Lenient deserializers for values the backend encodes inconsistently
//!
//! Amounts arrive as JSON numbers (`float(...)` on the server) or as strings
//! (pydantic `Decimal`). Timestamps arrive with or without a UTC offset.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

fn amount_from_raw<E: serde::de::Error>(raw: RawAmount) -> Result<Decimal, E> {
    let value = match raw {
        RawAmount::Number(n) => Decimal::from_str(&n.to_string()).map_err(E::custom)?,
        RawAmount::Text(s) => Decimal::from_str(s.trim()).map_err(E::custom)?,
    };
    Ok(value.round_dp(2))
}

/// Deserialize an amount from a number or a numeric string, rounded to cents
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    amount_from_raw(RawAmount::deserialize(deserializer)?)
}

pub fn deserialize_opt_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawAmount>::deserialize(deserializer)? {
        Some(raw) => amount_from_raw(raw).map(Some),
        None => Ok(None),
    }
}

/// Parse a timestamp as RFC 3339, falling back to a naive datetime taken as UTC
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
}

pub fn deserialize_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        None => Ok(None),
    }
}

/// Render an amount the way the player sees it: `$12.50`
pub fn format_money(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}
