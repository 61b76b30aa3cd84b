//! Core persisted types for users and withdrawals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bot user with an earnable token balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Internal user id
    pub id: String,

    /// Telegram user id
    pub telegram_id: i64,

    /// Telegram username, if set
    #[serde(default)]
    pub username: Option<String>,

    /// On-chain receiving address (None until the user sets one)
    #[serde(default)]
    pub wallet_address: Option<String>,

    /// Token balance in display units
    pub balance: u64,

    /// When the user last withdrew
    #[serde(default)]
    pub last_withdrawal: Option<DateTime<Utc>>,

    /// When the user joined
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a zero balance
    pub fn new(telegram_id: i64, username: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            telegram_id,
            username,
            wallet_address: None,
            balance: 0,
            last_withdrawal: None,
            created_at: Utc::now(),
        }
    }
}

/// Status of a withdrawal record.
///
/// Pending/Approved/Rejected are declared for a manual-approval payout path;
/// the automatic flow only ever writes Completed or Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Failed,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Approved => write!(f, "approved"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
            WithdrawalStatus::Completed => write!(f, "completed"),
            WithdrawalStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single withdrawal attempt, written once in its terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    /// Unique record id
    pub id: String,

    /// Owning user id
    pub user_id: String,

    /// Amount in display units
    pub amount: u64,

    /// Destination address
    pub wallet_address: String,

    /// Terminal status
    pub status: WithdrawalStatus,

    /// Transaction signature (present iff completed)
    #[serde(default)]
    pub tx_signature: Option<String>,

    /// User-safe error message (present iff failed)
    #[serde(default)]
    pub error: Option<String>,

    /// Full internal error detail, for operators
    #[serde(default)]
    pub error_details: Option<String>,

    /// Estimated network fee in lamports
    #[serde(default)]
    pub network_fee_lamports: Option<u64>,

    /// Currency label at the time of withdrawal
    pub currency: String,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the transfer was confirmed (completed records)
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,

    /// When the failed attempt happened (failed records)
    #[serde(default)]
    pub attempted_at: Option<DateTime<Utc>>,
}

impl WithdrawalRecord {
    /// Build a completed record for a confirmed on-chain transfer
    pub fn completed(
        user_id: &str,
        amount: u64,
        wallet_address: &str,
        tx_signature: &str,
        network_fee_lamports: u64,
        currency: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            wallet_address: wallet_address.to_string(),
            status: WithdrawalStatus::Completed,
            tx_signature: Some(tx_signature.to_string()),
            error: None,
            error_details: None,
            network_fee_lamports: Some(network_fee_lamports),
            currency: currency.to_string(),
            created_at: now,
            processed_at: Some(now),
            attempted_at: None,
        }
    }

    /// Build a failed record for a settlement that did not pay out
    pub fn failed(
        user_id: &str,
        amount: u64,
        wallet_address: &str,
        error: &str,
        error_details: &str,
        currency: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            wallet_address: wallet_address.to_string(),
            status: WithdrawalStatus::Failed,
            tx_signature: None,
            error: Some(error.to_string()),
            error_details: Some(error_details.to_string()),
            network_fee_lamports: None,
            currency: currency.to_string(),
            created_at: now,
            processed_at: None,
            attempted_at: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_record_carries_signature() {
        let record = WithdrawalRecord::completed("u1", 100, "addr", "5sig", 5000, "0XL");
        assert_eq!(record.status, WithdrawalStatus::Completed);
        assert!(record.tx_signature.as_deref().is_some_and(|s| !s.is_empty()));
        assert!(record.error.is_none());
        assert!(record.processed_at.is_some());
    }

    #[test]
    fn test_failed_record_carries_error() {
        let record = WithdrawalRecord::failed("u1", 100, "addr", "boom", "full detail", "0XL");
        assert_eq!(record.status, WithdrawalStatus::Failed);
        assert!(record.error.as_deref().is_some_and(|s| !s.is_empty()));
        assert!(record.tx_signature.is_none());
        assert!(record.attempted_at.is_some());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&WithdrawalStatus::Completed).unwrap();
        assert_eq!(json, r#""completed""#);
    }
}
