//! Persistence interfaces consumed by the withdrawal core
//!
//! The bot's real database lives behind these traits; the in-memory
//! implementation backs tests and single-process deployments.

pub mod memory;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
pub use memory::MemoryStore;
pub use types::{User, WithdrawalRecord, WithdrawalStatus};

/// User lookup and balance mutation
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by internal id
    async fn find_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Find a user by Telegram id
    async fn find_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>>;

    /// Atomically apply a balance delta, returning the new balance.
    ///
    /// This is a delta, never an overwrite, so concurrent credits (task
    /// rewards, referral bonuses) are not lost. Errors if the delta would
    /// take the balance negative.
    async fn increment_balance(&self, user_id: &str, delta: i64) -> Result<u64>;

    /// Set the user's receiving address
    async fn set_wallet_address(&self, user_id: &str, address: &str) -> Result<()>;

    /// Stamp the user's last withdrawal time
    async fn set_last_withdrawal(
        &self,
        user_id: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()>;
}

/// Append-only withdrawal ledger
#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Append a terminal-state withdrawal record
    async fn create_withdrawal(&self, record: WithdrawalRecord) -> Result<()>;

    /// List a user's withdrawals, newest first
    async fn list_withdrawals(&self, user_id: &str, limit: usize) -> Result<Vec<WithdrawalRecord>>;
}
