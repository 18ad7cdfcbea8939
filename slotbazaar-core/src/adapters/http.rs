//! SlotBazaar HTTP API client
//!
//! Blocking reqwest client for the remote casino API. Every non-success
//! status is mapped to a `domain::Error` with the message the player sees;
//! nothing is retried.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::wire::deserialize_amount;
use crate::domain::{
    AuthTokens, BalanceReceipt, Bet, Credentials, GameHistoryPage, PlayResult, Registration, StatsReport,
    TransactionPage, User,
};
use crate::ports::CasinoBackend;

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(deserialize_with = "deserialize_amount")]
    balance: Decimal,
}

/// Pull a readable message out of an error body
///
/// FastAPI answers `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": "...", ...}]}` for request validation failures.
/// Other servers use `{"message": "..."}`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    let text = match value.get("detail").or_else(|| value.get("message"))? {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(JsonValue::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Blocking HTTP adapter for the SlotBazaar API
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpBackend {
    /// Create a client for `base_url`, e.g. `http://localhost:8003`
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| Error::Config(format!("Invalid API URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        let reason = if error.is_timeout() {
            format!("request timed out after {} seconds", self.timeout_secs)
        } else if error.is_connect() {
            "connection refused".to_string()
        } else {
            error.to_string()
        };
        Error::Network {
            url: self.base_url.clone(),
            reason,
        }
    }

    /// Send the request and turn any non-2xx status into an error
    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().map_err(|e| self.map_request_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(Error::from_status(status.as_u16(), extract_detail(&body)))
    }

    fn parse<T: DeserializeOwned>(&self, response: Response, what: &str) -> Result<T> {
        let body = response.text().map_err(|e| self.map_request_error(e))?;
        serde_json::from_str(&body).map_err(|e| Error::Api {
            status: 200,
            message: format!("Unexpected {} response from server: {}", what, e),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, token: &str, what: &str) -> Result<T> {
        let response = self.send(self.client.get(self.url(path)).bearer_auth(token))?;
        self.parse(response, what)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, token: Option<&str>, body: &JsonValue, what: &str) -> Result<T> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = self.send(request)?;
        self.parse(response, what)
    }
}

fn amount_json(amount: Decimal) -> JsonValue {
    amount.to_f64().map(JsonValue::from).unwrap_or(JsonValue::Null)
}

impl CasinoBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    fn register(&self, registration: &Registration) -> Result<User> {
        let body = serde_json::to_value(registration)?;
        self.post("/auth/register", None, &body, "registration")
    }

    fn login(&self, credentials: &Credentials) -> Result<AuthTokens> {
        let body = serde_json::to_value(credentials)?;
        self.post("/auth/login", None, &body, "login")
    }

    fn refresh(&self, refresh_token: &str) -> Result<AuthTokens> {
        self.post(
            "/auth/refresh",
            None,
            &json!({ "refresh_token": refresh_token }),
            "refresh",
        )
    }

    fn me(&self, token: &str) -> Result<User> {
        self.get("/auth/me", token, "profile")
    }

    fn balance(&self, token: &str) -> Result<Decimal> {
        let response: BalanceResponse = self.get("/auth/balance", token, "balance")?;
        Ok(response.balance)
    }

    fn deposit(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt> {
        self.post(
            "/auth/deposit",
            Some(token),
            &json!({ "amount": amount_json(amount) }),
            "deposit",
        )
    }

    fn withdraw(&self, token: &str, amount: Decimal) -> Result<BalanceReceipt> {
        self.post(
            "/auth/withdraw",
            Some(token),
            &json!({ "amount": amount_json(amount) }),
            "withdrawal",
        )
    }

    fn transactions(&self, token: &str, page: u32, per_page: u32) -> Result<TransactionPage> {
        self.get(
            &format!("/user/transactions?page={}&per_page={}", page, per_page),
            token,
            "transaction history",
        )
    }

    fn play(&self, token: &str, bet: &Bet) -> Result<PlayResult> {
        let path = format!("/games/{}/play", bet.game.slug());
        let result: PlayResult = self.post(&path, Some(token), &bet.to_request_body(), "game")?;
        Ok(result.settle(bet))
    }

    fn game_history(&self, token: &str, page: u32, per_page: u32) -> Result<GameHistoryPage> {
        self.get(
            &format!("/user/games?page={}&per_page={}", page, per_page),
            token,
            "game history",
        )
    }

    fn stats(&self, token: &str) -> Result<StatsReport> {
        self.get("/user/stats", token, "stats")
    }
}
