//! Player-facing notifications
//!
//! A `Notice` is what the player sees after an action: the result of a
//! round, a cashier receipt, or an error.

use serde::Serialize;

use super::game::{Outcome, PlayResult};
use super::result::Error;
use super::wire::format_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn for_play(result: &PlayResult) -> Self {
        match result.outcome {
            Outcome::Win => Self::success(format!("You won {}!", format_money(result.winnings))),
            Outcome::Push => Self::info(format!(
                "Push. Your bet of {} was returned.",
                format_money(result.bet)
            )),
            Outcome::Loss => Self::new(NoticeLevel::Warning, "Better luck next time!"),
        }
    }

    pub fn for_error(error: &Error) -> Self {
        let level = match error {
            Error::Validation(_) | Error::RateLimited => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        Self::new(level, error.to_string())
    }
}
