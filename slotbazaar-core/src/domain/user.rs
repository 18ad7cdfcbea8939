//! Player account and session models

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::wire::{deserialize_amount, deserialize_opt_timestamp, deserialize_timestamp};

/// A player account as reported by `/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_opt_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Credentials for `/auth/login`
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Payload for `/auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 50;

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Shape checks shared by the client form and the house backend
    pub fn validate(&self) -> Result<()> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(Error::validation("Username is required"));
        }
        if username.len() > MAX_USERNAME_LEN {
            return Err(Error::validation(format!(
                "Username must be at most {} characters",
                MAX_USERNAME_LEN
            )));
        }
        let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .map_err(|e| Error::validation(e.to_string()))?;
        if !email_re.is_match(self.email.trim()) {
            return Err(Error::validation("Please enter a valid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

/// Token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<User>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// What the client remembers between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn from_tokens(username: impl Into<String>, tokens: &AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            username: username.into(),
            issued_at: Utc::now(),
        }
    }
}
