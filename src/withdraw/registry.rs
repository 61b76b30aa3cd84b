//! Pending withdrawal registry
//!
//! Process-local guard preventing a user from having more than one
//! in-flight withdrawal. Reservations are ephemeral: never persisted,
//! destroyed on settle/cancel, and swept after a TTL. This is a
//! double-submission guard only; the balance-mutation guarantee comes from
//! the atomic ledger update in the coordinator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// An ephemeral claim on a user's withdrawal slot
#[derive(Debug, Clone)]
pub struct PendingReservation {
    /// Owning user id
    pub user_id: String,

    /// Amount frozen at request time, in display units
    pub amount: u64,

    /// Destination address frozen at request time
    pub address: String,

    /// When the reservation was made
    pub reserved_at: DateTime<Utc>,

    /// Set once a confirm has claimed this reservation for settlement
    in_flight: bool,
}

/// In-memory registry of pending withdrawals, one slot per user
pub struct PendingWithdrawalRegistry {
    entries: RwLock<HashMap<String, PendingReservation>>,
    ttl: chrono::Duration,
}

impl PendingWithdrawalRegistry {
    /// Create a registry with the given reservation lifetime
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(30)),
        }
    }

    fn is_expired(&self, reservation: &PendingReservation, now: DateTime<Utc>) -> bool {
        now - reservation.reserved_at > self.ttl
    }

    /// Reserve the user's withdrawal slot.
    ///
    /// Fails with [`Error::WithdrawalPending`] if a live reservation exists;
    /// an expired leftover that the sweeper has not reached yet is replaced.
    pub async fn reserve(
        &self,
        user_id: &str,
        amount: u64,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(user_id) {
            if existing.in_flight || !self.is_expired(existing, now) {
                return Err(Error::WithdrawalPending);
            }
        }

        entries.insert(
            user_id.to_string(),
            PendingReservation {
                user_id: user_id.to_string(),
                amount,
                address: address.to_string(),
                reserved_at: now,
                in_flight: false,
            },
        );

        debug!("Reserved withdrawal slot for user {}: {} tokens", user_id, amount);
        Ok(())
    }

    /// Look up a user's reservation
    pub async fn get(&self, user_id: &str) -> Option<PendingReservation> {
        let entries = self.entries.read().await;
        entries.get(user_id).cloned()
    }

    /// Whether the user has a live (unexpired) reservation
    pub async fn has_live(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(user_id)
            .map(|r| r.in_flight || !self.is_expired(r, now))
            .unwrap_or(false)
    }

    /// Atomically claim the user's reservation for settlement.
    ///
    /// Returns None if there is no reservation or a confirm already claimed
    /// it — a duplicate confirm tap lands here and is answered as "no
    /// pending withdrawal".
    pub async fn begin_confirm(&self, user_id: &str) -> Option<PendingReservation> {
        let mut entries = self.entries.write().await;
        let reservation = entries.get_mut(user_id)?;
        if reservation.in_flight {
            return None;
        }
        reservation.in_flight = true;
        Some(reservation.clone())
    }

    /// Remove the user's reservation. Idempotent.
    pub async fn release(&self, user_id: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(user_id).is_some() {
            debug!("Released withdrawal slot for user {}", user_id);
        }
    }

    /// Evict reservations older than the TTL, returning the count removed.
    ///
    /// In-flight reservations are skipped: releasing one mid-settlement
    /// would open the door to a concurrent second withdrawal.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|user_id, r| {
            let keep = r.in_flight || !self.is_expired(r, now);
            if !keep {
                info!("Cleaned up expired withdrawal reservation for user {}", user_id);
            }
            keep
        });
        before - entries.len()
    }

    /// Number of reservations currently held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Spawn the background sweep task, running until aborted
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would sweep an empty registry
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = registry.sweep_expired(Utc::now()).await;
                if swept > 0 {
                    info!("Swept {} expired withdrawal reservations", swept);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PendingWithdrawalRegistry {
        PendingWithdrawalRegistry::new(Duration::from_secs(30 * 60))
    }

    #[tokio::test]
    async fn test_at_most_one_reservation_per_user() {
        let reg = registry();
        let now = Utc::now();

        reg.reserve("u1", 100, "addr", now).await.unwrap();
        let second = reg.reserve("u1", 50, "addr", now).await;
        assert!(matches!(second, Err(Error::WithdrawalPending)));

        // Other users are unaffected
        reg.reserve("u2", 10, "addr2", now).await.unwrap();
        assert_eq!(reg.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_reserves_admit_exactly_one() {
        let reg = Arc::new(registry());
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let reg = Arc::clone(&reg);
            handles.push(tokio::spawn(async move {
                reg.reserve("u1", 100, "addr", now).await.is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(reg.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_only() {
        let reg = registry();
        let old = Utc::now() - chrono::Duration::minutes(31);
        let fresh = Utc::now();

        reg.reserve("stale", 100, "addr", old).await.unwrap();
        reg.reserve("live", 100, "addr", fresh).await.unwrap();

        let swept = reg.sweep_expired(Utc::now()).await;
        assert_eq!(swept, 1);
        assert!(reg.get("stale").await.is_none());
        assert!(reg.get("live").await.is_some());
    }

    #[tokio::test]
    async fn test_reservation_at_exactly_ttl_survives() {
        let reg = registry();
        let now = Utc::now();
        let at_ttl = now - chrono::Duration::minutes(30);

        reg.reserve("u1", 100, "addr", at_ttl).await.unwrap();
        assert_eq!(reg.sweep_expired(now).await, 0);
    }

    #[tokio::test]
    async fn test_sweep_skips_in_flight() {
        let reg = registry();
        let old = Utc::now() - chrono::Duration::hours(2);

        reg.reserve("u1", 100, "addr", old).await.unwrap();
        assert!(reg.begin_confirm("u1").await.is_some());

        assert_eq!(reg.sweep_expired(Utc::now()).await, 0);
        assert!(reg.get("u1").await.is_some());
    }

    #[tokio::test]
    async fn test_begin_confirm_claims_once() {
        let reg = registry();
        reg.reserve("u1", 100, "addr", Utc::now()).await.unwrap();

        let first = reg.begin_confirm("u1").await;
        assert!(first.is_some());
        assert_eq!(first.unwrap().amount, 100);

        // The duplicate tap finds nothing to claim
        assert!(reg.begin_confirm("u1").await.is_none());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let reg = registry();
        reg.reserve("u1", 100, "addr", Utc::now()).await.unwrap();

        reg.release("u1").await;
        reg.release("u1").await;
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_leftover_is_replaced_on_reserve() {
        let reg = registry();
        let old = Utc::now() - chrono::Duration::hours(1);

        reg.reserve("u1", 100, "addr", old).await.unwrap();
        // Sweep has not run, but the entry is dead; a new request succeeds
        reg.reserve("u1", 40, "addr", Utc::now()).await.unwrap();
        assert_eq!(reg.get("u1").await.unwrap().amount, 40);
    }
}
