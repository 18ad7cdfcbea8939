//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod auth;
mod balance_watch;
mod demo;
pub mod logging;
pub mod migration;
mod play;
mod status;
pub mod wallet;

pub use auth::AuthService;
pub use balance_watch::{BalanceUpdate, BalanceWatcher, WatchSummary};
pub use demo::{DemoSeed, DemoService, DemoStatus, DEMO_PASSWORD, DEMO_USERNAME};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use play::{GameInfo, PlayOutcome, PlayService};
pub use status::{StatusService, StatusSummary};
pub use wallet::WalletService;
