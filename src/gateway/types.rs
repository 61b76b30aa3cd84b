//! Result types for on-chain wallet queries and transfers

use serde::{Deserialize, Serialize};

/// Full payout-wallet balance snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalances {
    /// Hot wallet address
    pub address: String,

    /// Native SOL balance in lamports (pays network fees)
    pub sol_lamports: u64,

    /// Payout token balance in display units
    pub token_balance: u64,
}

/// Result of a confirmed token transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Confirmed transaction signature
    pub signature: String,

    /// Recipient address
    pub recipient: String,

    /// Amount sent, in display units
    pub amount: u64,

    /// Estimated network fee in lamports (base fee + priority fee)
    pub fee_lamports: u64,

    /// Block explorer link for the transaction
    pub explorer_url: String,
}

/// Chain connectivity report for operators
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Current slot
    pub slot: u64,

    /// Node software version
    pub node_version: String,

    /// Configured priority fee in micro-lamports per compute unit
    pub priority_fee_microlamports: u64,
}

/// Payout token details for operator debugging
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// Token mint address
    pub mint: String,

    /// Mint decimals
    pub decimals: u8,

    /// Total supply in display units
    pub supply: u64,

    /// Hot wallet token balance in display units
    pub wallet_token_balance: u64,

    /// Hot wallet SOL balance in lamports
    pub wallet_sol_lamports: u64,
}
