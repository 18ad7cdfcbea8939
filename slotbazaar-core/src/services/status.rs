//! Status service - which backend, who is logged in, what they hold

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use super::auth::with_session;
use crate::domain::result::Result;
use crate::ports::{CasinoBackend, SessionStore};

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub backend: String,
    pub endpoint: String,
    pub demo_mode: bool,
    pub logged_in: bool,
    pub username: Option<String>,
    pub balance: Option<Decimal>,
    /// Why the balance could not be fetched, if it could not
    pub error: Option<String>,
}

/// Status service
pub struct StatusService {
    backend: Arc<dyn CasinoBackend>,
    store: Arc<dyn SessionStore>,
    demo_mode: bool,
}

impl StatusService {
    pub fn new(backend: Arc<dyn CasinoBackend>, store: Arc<dyn SessionStore>, demo_mode: bool) -> Self {
        Self {
            backend,
            store,
            demo_mode,
        }
    }

    /// Summarise the client state; backend failures are reported, not returned
    pub fn get_status(&self) -> Result<StatusSummary> {
        let session = self.store.load()?;
        let mut summary = StatusSummary {
            backend: self.backend.name().to_string(),
            endpoint: self.backend.endpoint(),
            demo_mode: self.demo_mode,
            logged_in: session.is_some(),
            username: session.map(|s| s.username),
            balance: None,
            error: None,
        };

        if summary.logged_in {
            match with_session(self.store.as_ref(), |token| self.backend.balance(token)) {
                Ok(balance) => summary.balance = Some(balance),
                Err(error) => {
                    if error.is_unauthorized() {
                        summary.logged_in = false;
                        summary.username = None;
                    }
                    summary.error = Some(error.to_string());
                }
            }
        }
        Ok(summary)
    }
}
