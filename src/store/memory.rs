//! In-memory store with optional JSON snapshot persistence

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::{User, WithdrawalRecord};
use super::{UserStore, WithdrawalStore};

/// Snapshot file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    users: Vec<User>,
    withdrawals: Vec<WithdrawalRecord>,
}

/// In-memory user and withdrawal store
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    /// Withdrawal records, newest first
    withdrawals: Arc<RwLock<Vec<WithdrawalRecord>>>,
    persistence_path: Option<String>,
}

impl MemoryStore {
    /// Create an empty store without persistence
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            withdrawals: Arc::new(RwLock::new(Vec::new())),
            persistence_path: None,
        }
    }

    /// Create a store backed by a JSON snapshot file
    pub fn with_persistence(path: &str) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            withdrawals: Arc::new(RwLock::new(Vec::new())),
            persistence_path: Some(path.to_string()),
        }
    }

    /// Load the snapshot from disk, if one exists
    pub async fn load(&self) -> Result<()> {
        if let Some(path) = &self.persistence_path {
            if Path::new(path).exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| Error::Persistence(e.to_string()))?;

                let snapshot: StoreSnapshot =
                    serde_json::from_str(&data).map_err(|e| Error::Persistence(e.to_string()))?;

                let mut users = self.users.write().await;
                *users = snapshot
                    .users
                    .into_iter()
                    .map(|u| (u.id.clone(), u))
                    .collect();

                let mut withdrawals = self.withdrawals.write().await;
                *withdrawals = snapshot.withdrawals;

                info!(
                    "Loaded {} users, {} withdrawal records from {}",
                    users.len(),
                    withdrawals.len(),
                    path
                );
            }
        }
        Ok(())
    }

    /// Save a snapshot to disk
    pub async fn save(&self) -> Result<()> {
        if let Some(path) = &self.persistence_path {
            let snapshot = {
                let users = self.users.read().await;
                let withdrawals = self.withdrawals.read().await;
                StoreSnapshot {
                    users: users.values().cloned().collect(),
                    withdrawals: withdrawals.clone(),
                }
            };

            let json = serde_json::to_string_pretty(&snapshot)
                .map_err(|e| Error::Persistence(e.to_string()))?;

            tokio::fs::write(path, json)
                .await
                .map_err(|e| Error::Persistence(e.to_string()))?;

            debug!("Saved store snapshot to {}", path);
        }
        Ok(())
    }

    /// Insert or replace a user
    pub async fn upsert_user(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn find_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.telegram_id == telegram_id).cloned())
    }

    async fn increment_balance(&self, user_id: &str, delta: i64) -> Result<u64> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| Error::Persistence(format!("User not found: {}", user_id)))?;

        let new_balance = if delta >= 0 {
            user.balance
                .checked_add(delta as u64)
                .ok_or_else(|| Error::InvariantViolation("Balance overflow".to_string()))?
        } else {
            user.balance
                .checked_sub(delta.unsigned_abs())
                .ok_or_else(|| {
                    Error::InvariantViolation(format!(
                        "Balance underflow: {} - {}",
                        user.balance,
                        delta.unsigned_abs()
                    ))
                })?
        };

        user.balance = new_balance;
        Ok(new_balance)
    }

    async fn set_wallet_address(&self, user_id: &str, address: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| Error::Persistence(format!("User not found: {}", user_id)))?;
        user.wallet_address = Some(address.to_string());
        Ok(())
    }

    async fn set_last_withdrawal(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| Error::Persistence(format!("User not found: {}", user_id)))?;
        user.last_withdrawal = Some(at);
        Ok(())
    }
}

#[async_trait]
impl WithdrawalStore for MemoryStore {
    async fn create_withdrawal(&self, record: WithdrawalRecord) -> Result<()> {
        let mut withdrawals = self.withdrawals.write().await;
        withdrawals.insert(0, record);
        Ok(())
    }

    async fn list_withdrawals(&self, user_id: &str, limit: usize) -> Result<Vec<WithdrawalRecord>> {
        let withdrawals = self.withdrawals.read().await;
        Ok(withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::WithdrawalStatus;

    fn seeded_user(balance: u64) -> User {
        let mut user = User::new(42, Some("alice".into()));
        user.balance = balance;
        user
    }

    #[tokio::test]
    async fn test_increment_balance_applies_delta() {
        let store = MemoryStore::new();
        let user = seeded_user(100);
        let id = user.id.clone();
        store.upsert_user(user).await;

        assert_eq!(store.increment_balance(&id, -60).await.unwrap(), 40);
        assert_eq!(store.increment_balance(&id, 25).await.unwrap(), 65);
    }

    #[tokio::test]
    async fn test_increment_balance_rejects_underflow() {
        let store = MemoryStore::new();
        let user = seeded_user(10);
        let id = user.id.clone();
        store.upsert_user(user).await;

        let result = store.increment_balance(&id, -11).await;
        assert!(matches!(result, Err(Error::InvariantViolation(_))));

        // Balance untouched after the failed mutation
        let user = store.find_user(&id).await.unwrap().unwrap();
        assert_eq!(user.balance, 10);
    }

    #[tokio::test]
    async fn test_list_withdrawals_newest_first() {
        let store = MemoryStore::new();
        store
            .create_withdrawal(WithdrawalRecord::completed("u1", 10, "addr", "sig1", 0, "0XL"))
            .await
            .unwrap();
        store
            .create_withdrawal(WithdrawalRecord::failed("u1", 20, "addr", "err", "detail", "0XL"))
            .await
            .unwrap();
        store
            .create_withdrawal(WithdrawalRecord::completed("u2", 30, "addr", "sig2", 0, "0XL"))
            .await
            .unwrap();

        let records = store.list_withdrawals("u1", 10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, 20);
        assert_eq!(records[0].status, WithdrawalStatus::Failed);
        assert_eq!(records[1].amount, 10);
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let path = path.to_str().unwrap();

        let store = MemoryStore::with_persistence(path);
        let user = seeded_user(77);
        let telegram_id = user.telegram_id;
        store.upsert_user(user).await;
        store
            .create_withdrawal(WithdrawalRecord::completed("u1", 10, "addr", "sig", 0, "0XL"))
            .await
            .unwrap();
        store.save().await.unwrap();

        let reloaded = MemoryStore::with_persistence(path);
        reloaded.load().await.unwrap();

        let user = reloaded
            .find_user_by_telegram_id(telegram_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.balance, 77);
        assert_eq!(reloaded.list_withdrawals("u1", 10).await.unwrap().len(), 1);
    }
}
