//! Earnbot Payout Library
//!
//! Withdrawal subsystem for the task-earn Telegram bot: on-chain payout
//! wallet gateway, pending-withdrawal registry, withdrawal ledger, and the
//! coordinator state machine tying them together.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod gateway;
pub mod messaging;
pub mod store;
pub mod withdraw;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{PayoutGateway, WalletGateway};
pub use withdraw::{PendingWithdrawalRegistry, WithdrawEvent, WithdrawalCoordinator};
