//! Balance watcher - fixed-interval polling of the player's balance

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use super::auth::NOT_LOGGED_IN;
use crate::domain::result::{Error, Result};
use crate::ports::{CasinoBackend, SessionStore};

/// A balance that differs from the last one seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceUpdate {
    pub balance: Decimal,
    pub previous: Option<Decimal>,
}

impl BalanceUpdate {
    pub fn change(&self) -> Option<Decimal> {
        self.previous.map(|prev| self.balance - prev)
    }
}

/// How a watch ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WatchSummary {
    pub polls: u64,
    pub updates: u64,
    pub failures: u64,
    pub last_balance: Option<Decimal>,
}

/// Polls the balance on a tokio interval
///
/// The backend call is blocking and runs on `spawn_blocking`. Transient
/// failures are counted and polling carries on; a rejected session stops
/// the watch and clears the saved session.
pub struct BalanceWatcher {
    backend: Arc<dyn CasinoBackend>,
    store: Arc<dyn SessionStore>,
    interval: Duration,
}

impl BalanceWatcher {
    pub fn new(backend: Arc<dyn CasinoBackend>, store: Arc<dyn SessionStore>, interval: Duration) -> Self {
        Self {
            backend,
            store,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until `shutdown` resolves, calling `on_update` for each change
    ///
    /// The first successful poll always reports.
    pub async fn run<F, E, S>(&self, mut on_update: F, mut on_error: E, shutdown: S) -> Result<WatchSummary>
    where
        F: FnMut(BalanceUpdate),
        E: FnMut(&Error),
        S: Future<Output = ()>,
    {
        let session = self
            .store
            .load()?
            .ok_or_else(|| Error::validation(NOT_LOGGED_IN))?;
        let token = Arc::new(session.access_token);

        let mut summary = WatchSummary::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let backend = Arc::clone(&self.backend);
                    let token = Arc::clone(&token);
                    let polled = tokio::task::spawn_blocking(move || backend.balance(&token))
                        .await
                        .map_err(|e| Error::database(format!("Balance poll task failed: {}", e)))?;
                    summary.polls += 1;

                    match polled {
                        Ok(balance) => {
                            if summary.last_balance != Some(balance) {
                                on_update(BalanceUpdate {
                                    balance,
                                    previous: summary.last_balance,
                                });
                                summary.updates += 1;
                                summary.last_balance = Some(balance);
                            }
                        }
                        Err(error) if error.is_unauthorized() => {
                            self.store.clear()?;
                            return Err(error);
                        }
                        Err(error) => {
                            summary.failures += 1;
                            on_error(&error);
                        }
                    }
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::house::HouseBackend;
    use crate::adapters::ledger::HouseLedger;
    use crate::adapters::session_file::MemorySessionStore;
    use crate::domain::{Registration, Session};
    use crate::services::AuthService;
    use chrono::Utc;

    fn setup() -> (Arc<dyn CasinoBackend>, Arc<MemorySessionStore>) {
        let ledger = HouseLedger::open_in_memory().unwrap();
        ledger.run_migrations().unwrap();
        let backend: Arc<dyn CasinoBackend> = Arc::new(HouseBackend::seeded(ledger, 9).unwrap());
        let store = Arc::new(MemorySessionStore::new());
        AuthService::new(backend.clone(), store.clone())
            .register(&Registration::new("alice", "alice@example.com", "wonderland"))
            .unwrap();
        (backend, store)
    }

    #[tokio::test]
    async fn test_reports_first_balance_once() {
        let (backend, store) = setup();
        let watcher = BalanceWatcher::new(backend, store, Duration::from_millis(10));

        let mut seen = Vec::new();
        let summary = watcher
            .run(
                |update| seen.push(update),
                |_| {},
                tokio::time::sleep(Duration::from_millis(120)),
            )
            .await
            .unwrap();

        assert!(summary.polls >= 2);
        assert_eq!(summary.updates, 1);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].balance, Decimal::new(10000, 2));
        assert_eq!(seen[0].change(), None);
    }

    #[tokio::test]
    async fn test_rejected_token_stops_and_clears() {
        let (backend, store) = setup();
        store
            .save(&Session {
                access_token: "stale".into(),
                refresh_token: None,
                username: "alice".into(),
                issued_at: Utc::now(),
            })
            .unwrap();
        let watcher = BalanceWatcher::new(backend, store.clone(), Duration::from_millis(10));

        let err = watcher
            .run(|_| {}, |_| {}, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requires_login() {
        let (backend, store) = setup();
        store.clear().unwrap();
        let watcher = BalanceWatcher::new(backend, store, Duration::from_millis(10));
        let err = watcher
            .run(|_| {}, |_| {}, std::future::ready(()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), NOT_LOGGED_IN);
    }

    #[test]
    fn test_update_change() {
        let update = BalanceUpdate {
            balance: Decimal::new(12000, 2),
            previous: Some(Decimal::new(10000, 2)),
        };
        assert_eq!(update.change(), Some(Decimal::new(2000, 2)));
    }
}
