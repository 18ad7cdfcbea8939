//! Configuration management
//!
//! Settings live in `settings.json` inside the SlotBazaar directory:
//! ```json
//! {
//!   "app": { "apiUrl": "http://localhost:8003", "demoMode": false, ... },
//!   "limits": { "minBet": "1", "maxBet": "1000" }
//! }
//! ```
//! Fields the client does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::BetLimits;

pub const DEFAULT_API_URL: &str = "http://localhost:8003";
pub const DEFAULT_POLL_SECONDS: u64 = 5;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub const API_URL_ENV: &str = "SLOTBAZAAR_API_URL";
pub const DEMO_MODE_ENV: &str = "SLOTBAZAAR_DEMO_MODE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    limits: LimitSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    demo_mode: bool,
    #[serde(default)]
    balance_poll_seconds: Option<u64>,
    #[serde(default)]
    request_timeout_seconds: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LimitSettings {
    #[serde(default)]
    min_bet: Option<Decimal>,
    #[serde(default)]
    max_bet: Option<Decimal>,
}

/// SlotBazaar client configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub demo_mode: bool,
    pub balance_poll_seconds: u64,
    pub request_timeout_seconds: u64,
    pub bet_limits: BetLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            demo_mode: false,
            balance_poll_seconds: DEFAULT_POLL_SECONDS,
            request_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            bet_limits: BetLimits::default(),
        }
    }
}

fn read_settings(dir: &Path) -> Result<SettingsFile> {
    let settings_path = dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

/// Limits from the file, or the defaults when they cannot work
fn bet_limits(raw: &LimitSettings) -> BetLimits {
    let defaults = BetLimits::default();
    let limits = BetLimits {
        min: raw.min_bet.unwrap_or(defaults.min),
        max: raw.max_bet.unwrap_or(defaults.max),
    };
    if limits.min <= Decimal::ZERO || limits.min > limits.max {
        return defaults;
    }
    limits
}

impl Config {
    /// Load config from the SlotBazaar directory
    ///
    /// `SLOTBAZAAR_API_URL` and `SLOTBAZAAR_DEMO_MODE` override the file.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut config = Self::from_settings(read_settings(dir)?);
        config.apply_overrides(
            std::env::var(API_URL_ENV).ok().as_deref(),
            std::env::var(DEMO_MODE_ENV).ok().as_deref(),
        );
        Ok(config)
    }

    fn from_settings(raw: SettingsFile) -> Self {
        Self {
            api_url: raw
                .app
                .api_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            demo_mode: raw.app.demo_mode,
            balance_poll_seconds: raw
                .app
                .balance_poll_seconds
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_POLL_SECONDS),
            request_timeout_seconds: raw
                .app
                .request_timeout_seconds
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            bet_limits: bet_limits(&raw.limits),
        }
    }

    /// Apply environment overrides (for CI/testing)
    pub fn apply_overrides(&mut self, api_url: Option<&str>, demo_mode: Option<&str>) {
        if let Some(url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
            self.api_url = url.to_string();
        }
        match demo_mode {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => self.demo_mode = true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => self.demo_mode = false,
            _ => {}
        }
    }

    /// Save config to the SlotBazaar directory
    ///
    /// Only `demoMode` is written. Everything else in the file is kept as
    /// it was, so environment overrides never end up on disk.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut settings = read_settings(dir)?;

        settings.app.demo_mode = self.demo_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(dir.join("settings.json"), content)?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_settings(read_settings(dir.path()).unwrap());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.demo_mode);
        assert_eq!(config.balance_poll_seconds, 5);
        assert_eq!(config.bet_limits, BetLimits::default());
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"theme": "dark", "apiUrl": "https://casino.example"}, "extra": [1, 2]}"#,
        )
        .unwrap();

        let mut config = Config::from_settings(read_settings(dir.path()).unwrap());
        assert_eq!(config.api_url, "https://casino.example");
        config.enable_demo_mode();
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap()).unwrap();
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["app"]["demoMode"], true);
        assert_eq!(saved["extra"], serde_json::json!([1, 2]));

        let reloaded = Config::from_settings(read_settings(dir.path()).unwrap());
        assert!(reloaded.demo_mode);
        assert_eq!(reloaded.bet_limits, BetLimits::default());
    }

    #[test]
    fn test_save_does_not_persist_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"apiUrl": "https://casino.example", "demoMode": true}, "limits": {"minBet": "2"}}"#,
        )
        .unwrap();

        let mut config = Config::from_settings(read_settings(dir.path()).unwrap());
        config.apply_overrides(Some("http://localhost:9999"), None);
        config.disable_demo_mode();
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap()).unwrap();
        assert_eq!(saved["app"]["apiUrl"], "https://casino.example");
        assert_eq!(saved["app"]["demoMode"], false);
        assert!(saved["app"].get("balancePollSeconds").map_or(true, |v| v.is_null()));
        assert!(saved["limits"].get("maxBet").map_or(true, |v| v.is_null()));

        let reloaded = Config::from_settings(read_settings(dir.path()).unwrap());
        assert_eq!(reloaded.api_url, "https://casino.example");
        assert_eq!(reloaded.bet_limits.min, Decimal::new(2, 0));
    }

    #[test]
    fn test_unusable_limits_fall_back_to_defaults() {
        for limits in [
            r#"{"minBet": "0"}"#,
            r#"{"minBet": "-5"}"#,
            r#"{"minBet": "50", "maxBet": "10"}"#,
            r#"{"maxBet": "0.50"}"#,
        ] {
            let dir = TempDir::new().unwrap();
            std::fs::write(
                dir.path().join("settings.json"),
                format!(r#"{{"limits": {}}}"#, limits),
            )
            .unwrap();
            let config = Config::from_settings(read_settings(dir.path()).unwrap());
            assert_eq!(config.bet_limits, BetLimits::default(), "{}", limits);
        }

        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"limits": {"minBet": "5", "maxBet": "500"}}"#,
        )
        .unwrap();
        let config = Config::from_settings(read_settings(dir.path()).unwrap());
        assert_eq!(
            config.bet_limits,
            BetLimits {
                min: Decimal::new(5, 0),
                max: Decimal::new(500, 0)
            }
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some(" https://api.slotbazaar.test "), Some("yes"));
        assert_eq!(config.api_url, "https://api.slotbazaar.test");
        assert!(config.demo_mode);

        config.apply_overrides(Some(""), Some("0"));
        assert_eq!(config.api_url, "https://api.slotbazaar.test");
        assert!(!config.demo_mode);

        config.apply_overrides(None, Some("maybe"));
        assert!(!config.demo_mode);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        let config = Config::from_settings(read_settings(dir.path()).unwrap());
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }
}
