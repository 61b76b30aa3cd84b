//! On-chain wallet gateway
//!
//! All blockchain interaction for the payout wallet lives here:
//! - Token/SOL balance queries (quick sentinel check + retried full check)
//! - Serialized SPL-token transfers with fee estimation and bounded retry
//! - Health and token-info reports for operators
//!
//! The transfer path is fully serialized through an instance-owned lock:
//! the hot wallet's balance and blockhash state cannot support concurrent
//! sends.

pub mod types;
pub mod wallet;

use async_trait::async_trait;

use crate::error::Result;
pub use types::{HealthReport, TokenInfo, TransferReceipt, WalletBalances};
pub use wallet::{is_valid_address, WalletGateway};

/// On-chain operations the withdrawal coordinator depends on
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    /// Payout token balance in display units; 0 on RPC failure.
    ///
    /// Callers must treat 0 as ambiguous ("really zero" or "query failed")
    /// and fall back to [`full_balances`](Self::full_balances).
    async fn quick_token_balance(&self) -> u64;

    /// Full balance snapshot, wrapped in bounded retry
    async fn full_balances(&self) -> Result<WalletBalances>;

    /// Send tokens to an on-chain address and await confirmation
    async fn transfer_tokens(&self, to_address: &str, amount: u64) -> Result<TransferReceipt>;

    /// Best-effort available token balance: quick check first, full check
    /// whenever the quick check comes back zero.
    async fn available_token_balance(&self) -> u64 {
        let quick = self.quick_token_balance().await;
        if quick > 0 {
            return quick;
        }
        match self.full_balances().await {
            Ok(balances) => balances.token_balance,
            Err(e) => {
                tracing::error!("Full balance check failed: {}", e);
                0
            }
        }
    }
}
