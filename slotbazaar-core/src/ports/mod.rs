//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod backend;
mod session;

pub use backend::CasinoBackend;
pub use session::SessionStore;
