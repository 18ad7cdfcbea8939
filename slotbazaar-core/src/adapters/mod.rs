//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest client for the remote SlotBazaar API
//! - DuckDB house ledger and in-process backend for demo mode
//! - JSON file for the saved session

pub mod house;
pub mod http;
pub mod ledger;
pub mod session_file;

#[cfg(test)]
pub mod mock_api;
