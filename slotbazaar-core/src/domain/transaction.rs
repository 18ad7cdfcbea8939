//! Ledger transaction model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::Error;
use super::wire::{deserialize_amount, deserialize_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Bet,
    Win,
    Bonus,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Bet => "bet",
            Self::Win => "win",
            Self::Bonus => "bonus",
            Self::Refund => "refund",
        }
    }

    /// Whether this kind of entry adds to the balance
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit | Self::Win | Self::Bonus | Self::Refund)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "bet" => Ok(Self::Bet),
            "win" => Ok(Self::Win),
            "bonus" => Ok(Self::Bonus),
            "refund" => Ok(Self::Refund),
            other => Err(Error::validation(format!("Unknown transaction type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(Error::validation(format!("Unknown transaction status: {}", other))),
        }
    }
}

/// One balance movement
///
/// `amount` is always positive; the direction follows from `transaction_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance_before: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance_after: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub game_session_id: Option<i64>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with its sign: negative for debits
    pub fn signed_amount(&self) -> Decimal {
        if self.transaction_type.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}

/// One page of `/user/transactions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total_count: i64,
    pub page: u32,
    pub per_page: u32,
}

impl TransactionPage {
    pub fn total_pages(&self) -> u32 {
        page_count(self.total_count, self.per_page)
    }
}

/// Number of pages needed for `total` rows at `per_page` rows each
pub fn page_count(total: i64, per_page: u32) -> u32 {
    if total <= 0 || per_page == 0 {
        return 0;
    }
    ((total as u64 + per_page as u64 - 1) / per_page as u64) as u32
}

/// Reply to a deposit or withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReceipt {
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance: Decimal,
    #[serde(default)]
    pub transaction_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}
