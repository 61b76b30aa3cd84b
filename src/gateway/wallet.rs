//! Hot wallet operations: balance queries and SPL-token transfers
//!
//! Wraps the RPC connection and the payout keypair. Transfers check token
//! and fee balances, attach compute-budget instructions with a clamped
//! priority fee, estimate the total fee before sending, and run inside a
//! bounded exponential-backoff retry loop.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::Transaction,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{base_units_to_tokens, tokens_to_base_units};

use super::types::{HealthReport, TokenInfo, TransferReceipt, WalletBalances};
use super::PayoutGateway;

/// Validate an on-chain receiving address
pub fn is_valid_address(address: &str) -> bool {
    Pubkey::from_str(address.trim()).is_ok()
}

/// Gateway to the hot payout wallet
pub struct WalletGateway {
    rpc: Arc<RpcClient>,
    keypair: Arc<Keypair>,
    token_mint: Pubkey,
    token_decimals: u8,
    explorer_url: String,
    min_fee_balance_lamports: u64,
    compute_unit_limit: u32,
    priority_fee_microlamports: u64,
    fallback_fee_lamports: u64,
    retry_attempts: u32,
    retry_base_delay_ms: u64,
    /// Serializes transfers: one in-flight send at a time
    transfer_lock: Mutex<()>,
}

impl WalletGateway {
    /// Create a gateway from configuration, loading the hot wallet keypair
    pub fn new(config: &Config) -> Result<Self> {
        if config.wallet.token_mint.is_empty() {
            return Err(Error::Config("token_mint is not set".to_string()));
        }

        let token_mint = Pubkey::from_str(&config.wallet.token_mint)
            .map_err(|e| Error::Config(format!("Invalid token_mint: {}", e)))?;

        let keypair = load_keypair(&config.wallet.keypair_path)?;

        let rpc = Arc::new(RpcClient::new_with_timeout(
            config.rpc.endpoint.clone(),
            Duration::from_millis(config.rpc.timeout_ms),
        ));

        // Priority fee is clamped to the configured ceiling
        let priority_fee = config
            .wallet
            .priority_fee_microlamports
            .min(config.wallet.max_priority_fee_microlamports);

        info!(
            "Wallet gateway initialized: address={}, mint={}",
            keypair.pubkey(),
            token_mint
        );

        Ok(Self {
            rpc,
            keypair: Arc::new(keypair),
            token_mint,
            token_decimals: config.wallet.token_decimals,
            explorer_url: config.wallet.explorer_url.clone(),
            min_fee_balance_lamports: config.wallet.min_fee_balance_lamports,
            compute_unit_limit: config.wallet.compute_unit_limit,
            priority_fee_microlamports: priority_fee,
            fallback_fee_lamports: config.wallet.fallback_fee_lamports,
            retry_attempts: config.rpc.retry_attempts,
            retry_base_delay_ms: config.rpc.retry_base_delay_ms,
            transfer_lock: Mutex::new(()),
        })
    }

    /// Hot wallet address
    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.retry_base_delay_ms),
            max_interval: Duration::from_millis(self.retry_base_delay_ms * 4),
            max_elapsed_time: Some(Duration::from_millis(
                self.retry_base_delay_ms * (1u64 << self.retry_attempts),
            )),
            ..Default::default()
        }
    }

    /// Raw token balance of the hot wallet's token account.
    ///
    /// A missing token account reads as zero; RPC failures propagate.
    async fn token_balance_raw(&self) -> Result<u64> {
        let ata = spl_associated_token_account::get_associated_token_address(
            &self.keypair.pubkey(),
            &self.token_mint,
        );

        match self.rpc.get_token_account_balance(&ata).await {
            Ok(ui) => ui
                .amount
                .parse::<u64>()
                .map_err(|e| Error::Internal(format!("Unparseable token amount: {}", e))),
            Err(e) if e.to_string().contains("could not find account") => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn full_balances_attempt(&self) -> Result<WalletBalances> {
        let address = self.keypair.pubkey();
        let sol_lamports = self.rpc.get_balance(&address).await?;
        let token_raw = self.token_balance_raw().await?;

        Ok(WalletBalances {
            address: address.to_string(),
            sol_lamports,
            token_balance: base_units_to_tokens(token_raw, self.token_decimals),
        })
    }

    /// Chain connectivity report
    pub async fn health(&self) -> Result<HealthReport> {
        let slot = self.rpc.get_slot().await?;
        let version = self.rpc.get_version().await?;

        Ok(HealthReport {
            slot,
            node_version: version.solana_core,
            priority_fee_microlamports: self.priority_fee_microlamports,
        })
    }

    /// Payout token details for operator debugging
    pub async fn token_info(&self) -> Result<TokenInfo> {
        let supply = self.rpc.get_token_supply(&self.token_mint).await?;
        let supply_raw = supply
            .amount
            .parse::<u64>()
            .map_err(|e| Error::Internal(format!("Unparseable token supply: {}", e)))?;

        let balances = self.full_balances_attempt().await?;

        Ok(TokenInfo {
            mint: self.token_mint.to_string(),
            decimals: self.token_decimals,
            supply: base_units_to_tokens(supply_raw, self.token_decimals),
            wallet_token_balance: balances.token_balance,
            wallet_sol_lamports: balances.sol_lamports,
        })
    }

    /// Single transfer attempt: pre-flight checks, fee estimation, send
    async fn send_transfer(&self, recipient: &Pubkey, amount: u64) -> Result<TransferReceipt> {
        let payer = self.keypair.pubkey();

        let raw_amount = tokens_to_base_units(amount, self.token_decimals)
            .ok_or_else(|| Error::Internal(format!("Amount overflow: {} tokens", amount)))?;

        // Check token balance
        let token_raw = self.token_balance_raw().await?;
        if token_raw < raw_amount {
            return Err(Error::InsufficientTokenBalance {
                available: base_units_to_tokens(token_raw, self.token_decimals),
                required: amount,
            });
        }

        // Check SOL floor for fees
        let sol_balance = self.rpc.get_balance(&payer).await?;
        if sol_balance < self.min_fee_balance_lamports {
            return Err(Error::InsufficientFeeBalance {
                available_lamports: sol_balance,
                required_lamports: self.min_fee_balance_lamports,
            });
        }

        let source_ata =
            spl_associated_token_account::get_associated_token_address(&payer, &self.token_mint);
        let dest_ata =
            spl_associated_token_account::get_associated_token_address(recipient, &self.token_mint);

        let instructions: Vec<Instruction> = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(self.compute_unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(self.priority_fee_microlamports),
            spl_associated_token_account::instruction::create_associated_token_account_idempotent(
                &payer,
                recipient,
                &self.token_mint,
                &spl_token::ID,
            ),
            spl_token::instruction::transfer_checked(
                &spl_token::ID,
                &source_ata,
                &self.token_mint,
                &dest_ata,
                &payer,
                &[],
                raw_amount,
                self.token_decimals,
            )
            .map_err(|e| Error::ContractError(e.to_string()))?,
        ];

        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::TransactionSend(format!("Failed to get blockhash: {}", e)))?;

        // Estimate total fee; fall back to the configured default if the
        // estimate itself fails
        let message = Message::new_with_blockhash(&instructions, Some(&payer), &blockhash);
        let base_fee = match self.rpc.get_fee_for_message(&message).await {
            Ok(fee) => fee,
            Err(e) => {
                warn!("Fee estimation failed, using fallback: {}", e);
                self.fallback_fee_lamports
            }
        };
        let priority_fee_lamports =
            (self.compute_unit_limit as u64 * self.priority_fee_microlamports) / 1_000_000;
        let total_fee = base_fee + priority_fee_lamports;

        debug!("Estimated fee: {} lamports", total_fee);

        if sol_balance < total_fee {
            return Err(Error::InsufficientFeeBalance {
                available_lamports: sol_balance,
                required_lamports: total_fee,
            });
        }

        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&payer),
            &[self.keypair.as_ref()],
            blockhash,
        );

        debug!("Sending {} tokens to {}", amount, recipient);

        let signature = self
            .rpc
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| classify_send_error(&e.to_string()))?;

        info!(
            "Transfer confirmed: {} tokens to {} (sig: {})",
            amount, recipient, signature
        );

        Ok(TransferReceipt {
            signature: signature.to_string(),
            recipient: recipient.to_string(),
            amount,
            fee_lamports: total_fee,
            explorer_url: format!("{}/tx/{}", self.explorer_url, signature),
        })
    }
}

#[async_trait]
impl PayoutGateway for WalletGateway {
    async fn quick_token_balance(&self) -> u64 {
        match self.token_balance_raw().await {
            Ok(raw) => base_units_to_tokens(raw, self.token_decimals),
            Err(e) => {
                error!("Quick balance check failed: {}", e);
                0
            }
        }
    }

    async fn full_balances(&self) -> Result<WalletBalances> {
        let backoff = self.backoff();
        retry(backoff, || async {
            match self.full_balances_attempt().await {
                Ok(balances) => Ok(balances),
                Err(e) if e.is_retryable() => {
                    warn!("Retryable balance check error: {}", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn transfer_tokens(&self, to_address: &str, amount: u64) -> Result<TransferReceipt> {
        let recipient = Pubkey::from_str(to_address.trim())
            .map_err(|_| Error::InvalidAddress(to_address.to_string()))?;

        if amount == 0 {
            return Err(Error::Internal("Transfer amount must be positive".to_string()));
        }

        // One in-flight send at a time; a second caller waits here
        let _guard = self.transfer_lock.lock().await;

        let backoff = self.backoff();
        retry(backoff, || async {
            match self.send_transfer(&recipient, amount).await {
                Ok(receipt) => Ok(receipt),
                Err(e) if e.is_retryable() => {
                    warn!("Retryable transfer error: {}", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => {
                    error!("Permanent transfer error: {}", e);
                    Err(backoff::Error::permanent(e))
                }
            }
        })
        .await
    }
}

/// Load the hot wallet keypair from a JSON byte-array file
fn load_keypair(path: &str) -> Result<Keypair> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidKeypair(format!("Cannot read {}: {}", path, e)))?;

    let bytes: Vec<u8> =
        serde_json::from_str(&data).map_err(|e| Error::InvalidKeypair(e.to_string()))?;

    Keypair::from_bytes(&bytes).map_err(|e| Error::InvalidKeypair(e.to_string()))
}

/// Map a send failure onto the error taxonomy surfaced to users
fn classify_send_error(detail: &str) -> Error {
    let lowered = detail.to_lowercase();

    if lowered.contains("custom program error")
        || lowered.contains("instructionerror")
        || lowered.contains("error processing instruction")
    {
        Error::ContractError(detail.to_string())
    } else if lowered.contains("insufficient funds")
        || lowered.contains("insufficient lamports")
        || lowered.contains("prioritization fee")
        || lowered.contains("compute budget")
    {
        Error::FeeFailure(detail.to_string())
    } else {
        Error::TransactionSend(detail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("11111111111111111111111111111111"));
        assert!(is_valid_address(&Pubkey::new_unique().to_string()));
        // Trailing whitespace is tolerated
        assert!(is_valid_address(&format!("{} ", Pubkey::new_unique())));

        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x1234567890abcdef1234567890abcdef12345678"));
        assert!(!is_valid_address("not an address"));
    }

    #[test]
    fn test_classify_send_error() {
        assert!(matches!(
            classify_send_error("Transaction simulation failed: custom program error: 0x1"),
            Error::ContractError(_)
        ));
        assert!(matches!(
            classify_send_error("Error processing Instruction 2: invalid account data"),
            Error::ContractError(_)
        ));
        assert!(matches!(
            classify_send_error("Insufficient funds for fee"),
            Error::FeeFailure(_)
        ));
        assert!(matches!(
            classify_send_error("connection reset by peer"),
            Error::TransactionSend(_)
        ));
        // Default category stays retryable so the backoff loop can absorb it
        assert!(classify_send_error("503 Service Unavailable").is_retryable());
    }
}
