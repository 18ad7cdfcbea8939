//! Mock SlotBazaar API server for testing
//!
//! A tiny HTTP/1.1 server on a random local port that answers the routes the
//! client uses, with one known player, a shared balance, and switches for
//! forcing error statuses.
//!
//! - POST /auth/login, /auth/register, /auth/refresh
//! - GET /auth/me, /auth/balance
//! - POST /auth/deposit, /auth/withdraw
//! - GET /user/transactions, /user/games, /user/stats
//! - POST /games/{slug}/play

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};

const ACCESS_TOKEN: &str = "mock-access-token";
const REFRESH_TOKEN: &str = "mock-refresh-token";

/// Configuration for the mock server
#[derive(Debug, Clone)]
pub struct MockApiConfig {
    pub username: String,
    pub password: String,
    /// Starting balance
    pub balance: Decimal,
    /// Answer every request with this status instead of routing it
    pub force_status: Option<u16>,
    /// Payout rate applied to every game round
    pub play_rate: Decimal,
    /// Number of ledger rows served by /user/transactions
    pub transaction_count: usize,
}

impl Default for MockApiConfig {
    fn default() -> Self {
        Self {
            username: "alice".to_string(),
            password: "wonderland".to_string(),
            balance: Decimal::new(10000, 2),
            force_status: None,
            play_rate: Decimal::new(192, 2),
            transaction_count: 45,
        }
    }
}

#[derive(Debug)]
struct MockState {
    balance: Decimal,
    last_path: Option<String>,
    next_id: i64,
}

/// Mock API server for testing
pub struct MockApiServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockApiServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockApiConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("mock server address").port();
        listener.set_nonblocking(true).expect("non-blocking listener");

        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState {
            balance: config.balance,
            last_path: None,
            next_id: 1,
        }));

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// The access token the server accepts
    pub fn token(&self) -> String {
        ACCESS_TOKEN.to_string()
    }

    pub fn refresh_token(&self) -> String {
        REFRESH_TOKEN.to_string()
    }

    /// Path of the most recent request
    pub fn last_path(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.last_path.clone())
    }

    /// Change the balance behind the server's back, as another session would
    pub fn set_balance(&self, balance: Decimal) {
        if let Ok(mut state) = self.state.lock() {
            state.balance = balance;
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    method: String,
    path: String,
    authorization: Option<String>,
    body: JsonValue,
}

/// Read headers, then as much body as Content-Length announces
fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut parts = lines.next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }
    let body = serde_json::from_slice(&data[header_end..]).unwrap_or(JsonValue::Null);

    Some(Request {
        method,
        path,
        authorization,
        body,
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockApiConfig, state: &Mutex<MockState>) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let (route, query) = match request.path.split_once('?') {
        Some((route, query)) => (route.to_string(), query.to_string()),
        None => (request.path.clone(), String::new()),
    };
    let mut state = match state.lock() {
        Ok(state) => state,
        Err(_) => return,
    };
    state.last_path = Some(route.clone());

    let (status, body) = route_request(&request, &route, &query, config, &mut state);
    send_response(&mut stream, status, &body.to_string());
}

fn money(amount: Decimal) -> JsonValue {
    amount.to_f64().map(JsonValue::from).unwrap_or(JsonValue::Null)
}

fn body_amount(body: &JsonValue, key: &str) -> Option<Decimal> {
    body.get(key)
        .and_then(JsonValue::as_f64)
        .and_then(|f| Decimal::try_from(f).ok())
        .map(|d| d.round_dp(2))
}

fn query_param(query: &str, name: &str, default: u32) -> u32 {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(default)
}

fn user_json(config: &MockApiConfig, balance: Decimal) -> JsonValue {
    json!({
        "id": 1,
        "username": config.username,
        "email": format!("{}@example.com", config.username),
        "balance": format!("{:.2}", balance),
        "is_active": true,
        "is_verified": false,
        "created_at": "2024-01-01T00:00:00",
        "last_login": null
    })
}

fn tokens_json(config: &MockApiConfig, balance: Decimal) -> JsonValue {
    json!({
        "access_token": ACCESS_TOKEN,
        "refresh_token": REFRESH_TOKEN,
        "token_type": "bearer",
        "user": user_json(config, balance)
    })
}

fn route_request(
    request: &Request,
    route: &str,
    query: &str,
    config: &MockApiConfig,
    state: &mut MockState,
) -> (u16, JsonValue) {
    if let Some(status) = config.force_status {
        return (status, json!({ "detail": format!("Forced status {}", status) }));
    }

    match (request.method.as_str(), route) {
        ("POST", "/auth/login") => {
            let username = request.body.get("username").and_then(JsonValue::as_str);
            let password = request.body.get("password").and_then(JsonValue::as_str);
            if username == Some(config.username.as_str()) && password == Some(config.password.as_str()) {
                (200, tokens_json(config, state.balance))
            } else {
                (401, json!({ "detail": "Incorrect username or password" }))
            }
        }
        ("POST", "/auth/register") => {
            let username = request.body.get("username").and_then(JsonValue::as_str).unwrap_or("");
            if username == config.username {
                return (400, json!({ "detail": "Username already exists" }));
            }
            let registered = MockApiConfig {
                username: username.to_string(),
                ..config.clone()
            };
            (200, user_json(&registered, Decimal::new(10000, 2)))
        }
        ("POST", "/auth/refresh") => {
            match request.body.get("refresh_token").and_then(JsonValue::as_str) {
                Some(REFRESH_TOKEN) => (200, tokens_json(config, state.balance)),
                _ => (401, json!({ "detail": "Invalid refresh token" })),
            }
        }
        _ => {
            let authorized = request
                .authorization
                .as_deref()
                .map(|h| h.eq_ignore_ascii_case(&format!("Bearer {}", ACCESS_TOKEN)))
                .unwrap_or(false);
            if !authorized {
                return (401, json!({ "detail": "Could not validate credentials" }));
            }
            route_authenticated(request, route, query, config, state)
        }
    }
}

fn route_authenticated(
    request: &Request,
    route: &str,
    query: &str,
    config: &MockApiConfig,
    state: &mut MockState,
) -> (u16, JsonValue) {
    match (request.method.as_str(), route) {
        ("GET", "/auth/me") => (200, user_json(config, state.balance)),
        ("GET", "/auth/balance") => (200, json!({ "balance": money(state.balance) })),
        ("POST", "/auth/deposit") => match body_amount(&request.body, "amount") {
            Some(amount) if amount > Decimal::ZERO => {
                state.balance += amount;
                state.next_id += 1;
                (
                    200,
                    json!({
                        "balance": money(state.balance),
                        "transaction_id": state.next_id,
                        "message": "Deposit successful"
                    }),
                )
            }
            _ => (422, json!({ "detail": [{ "loc": ["body", "amount"], "msg": "Input should be greater than 0" }] })),
        },
        ("POST", "/auth/withdraw") => match body_amount(&request.body, "amount") {
            Some(amount) if amount > state.balance => (400, json!({ "detail": "Insufficient balance" })),
            Some(amount) if amount > Decimal::ZERO => {
                state.balance -= amount;
                state.next_id += 1;
                (
                    200,
                    json!({
                        "balance": money(state.balance),
                        "transaction_id": state.next_id,
                        "message": "Withdrawal successful"
                    }),
                )
            }
            _ => (422, json!({ "detail": [{ "msg": "Input should be greater than 0" }] })),
        },
        ("GET", "/user/transactions") => {
            let page = query_param(query, "page", 1).max(1);
            let per_page = query_param(query, "per_page", 20).clamp(1, 100);
            let start = ((page - 1) * per_page) as usize;
            let end = (start + per_page as usize).min(config.transaction_count);
            let rows: Vec<JsonValue> = (start..end.max(start))
                .map(|i| {
                    json!({
                        "id": (config.transaction_count - i) as i64,
                        "transaction_type": "deposit",
                        "status": "completed",
                        "amount": 1.0,
                        "balance_before": "0.00",
                        "balance_after": "1.00",
                        "description": "Deposit of $1.00",
                        "created_at": "2024-01-01T00:00:00"
                    })
                })
                .collect();
            (
                200,
                json!({
                    "transactions": rows,
                    "total_count": config.transaction_count,
                    "page": page,
                    "per_page": per_page
                }),
            )
        }
        ("GET", "/user/games") => (
            200,
            json!({
                "sessions": [{
                    "id": 1,
                    "user_id": 1,
                    "game_type": "coin",
                    "bet_amount": "5.00",
                    "win_amount": "9.60",
                    "net_result": "4.60",
                    "game_data": { "result": "Heads" },
                    "created_at": "2024-01-01T00:00:00"
                }],
                "total_count": 1,
                "page": query_param(query, "page", 1),
                "per_page": query_param(query, "per_page", 20)
            }),
        ),
        ("GET", "/user/stats") => (
            200,
            json!({
                "user_id": 1,
                "username": config.username,
                "current_balance": money(state.balance),
                "stats": { "total_games": 1, "total_bet": 5.0, "total_won": 9.6, "net_result": 4.6 }
            }),
        ),
        ("POST", path) if path.starts_with("/games/") && path.ends_with("/play") => {
            let Some(bet) = body_amount(&request.body, "bet_amount") else {
                return (422, json!({ "detail": [{ "msg": "bet_amount is required" }] }));
            };
            if bet > state.balance {
                return (400, json!({ "detail": "Insufficient balance" }));
            }
            let winnings = (bet * config.play_rate).round_dp(2);
            state.balance = state.balance - bet + winnings;
            let result = match request.body.get("choice") {
                Some(JsonValue::String(s)) => JsonValue::from(s.clone()),
                Some(other) => other.clone(),
                None => JsonValue::from("Win"),
            };
            (
                200,
                json!({
                    "result": result,
                    "winnings": money(winnings),
                    "net_win_loss": money(winnings - bet),
                    "new_balance": money(state.balance)
                }),
            )
        }
        _ => (404, json!({ "detail": "Not Found" })),
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text(status),
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        assert_eq!(query_param("page=3&per_page=10", "per_page", 20), 10);
        assert_eq!(query_param("page=x", "page", 1), 1);
        assert_eq!(query_param("", "page", 1), 1);
    }

    #[test]
    fn test_server_reports_base_url() {
        let server = MockApiServer::start(MockApiConfig::default());
        assert!(server.base_url().starts_with("http://127.0.0.1:"));
        assert!(server.last_path().is_none());
    }
}
