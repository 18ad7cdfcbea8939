//! Wallet service - balance, cashier and ledger history

use std::io::Write;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use super::auth::with_session;
use crate::domain::bet::{validate_deposit, validate_withdrawal};
use crate::domain::result::{Error, Result};
use crate::domain::{BalanceReceipt, TransactionPage};
use crate::ports::{CasinoBackend, SessionStore};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Flat row for CSV export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    created_at: String,
    transaction_type: &'a str,
    status: &'a str,
    amount: Decimal,
    balance_before: Decimal,
    balance_after: Decimal,
    description: &'a str,
    game_session_id: Option<i64>,
}

fn csv_error(e: csv::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

pub struct WalletService {
    backend: Arc<dyn CasinoBackend>,
    store: Arc<dyn SessionStore>,
}

impl WalletService {
    pub fn new(backend: Arc<dyn CasinoBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self { backend, store }
    }

    pub fn balance(&self) -> Result<Decimal> {
        with_session(self.store.as_ref(), |token| self.backend.balance(token))
    }

    pub fn deposit(&self, input: &str) -> Result<BalanceReceipt> {
        let amount = validate_deposit(input)?;
        with_session(self.store.as_ref(), |token| self.backend.deposit(token, amount))
    }

    /// Checks the amount against the current balance before asking the cashier
    pub fn withdraw(&self, input: &str) -> Result<BalanceReceipt> {
        with_session(self.store.as_ref(), |token| {
            let balance = self.backend.balance(token)?;
            let amount = validate_withdrawal(input, balance)?;
            self.backend.withdraw(token, amount)
        })
    }

    /// One page of the ledger, newest first
    ///
    /// `page` is raised to 1 and `per_page` clamped to 1..=100.
    pub fn transactions(&self, page: u32, per_page: u32) -> Result<TransactionPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        with_session(self.store.as_ref(), |token| {
            self.backend.transactions(token, page, per_page)
        })
    }

    /// Write the whole ledger as CSV. Returns the number of rows.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut out = csv::Writer::from_writer(writer);
        let mut written = 0usize;
        let mut page = 1;

        loop {
            let batch = self.transactions(page, MAX_PER_PAGE)?;
            for txn in &batch.transactions {
                out.serialize(CsvRow {
                    id: txn.id,
                    created_at: txn.created_at.to_rfc3339(),
                    transaction_type: txn.transaction_type.as_str(),
                    status: txn.status.as_str(),
                    amount: txn.signed_amount(),
                    balance_before: txn.balance_before,
                    balance_after: txn.balance_after,
                    description: txn.description.as_deref().unwrap_or(""),
                    game_session_id: txn.game_session_id,
                })
                .map_err(csv_error)?;
                written += 1;
            }
            if batch.transactions.is_empty() || page >= batch.total_pages() {
                break;
            }
            page += 1;
        }

        out.flush()?;
        Ok(written)
    }
}
