//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub withdraw: WithdrawConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

/// Hot payout wallet and token settings
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Path to the hot wallet keypair file (JSON byte array)
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,

    /// SPL mint of the payout token
    #[serde(default)]
    pub token_mint: String,

    /// Decimals of the payout token mint
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    /// Block explorer base URL for transaction links
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,

    /// Minimum SOL balance (lamports) required before attempting a transfer
    #[serde(default = "default_min_fee_balance")]
    pub min_fee_balance_lamports: u64,

    /// Compute unit limit for a token transfer
    #[serde(default = "default_compute_unit_limit")]
    pub compute_unit_limit: u32,

    /// Requested priority fee (micro-lamports per compute unit)
    #[serde(default = "default_priority_fee")]
    pub priority_fee_microlamports: u64,

    /// Hard ceiling on the priority fee
    #[serde(default = "default_max_priority_fee")]
    pub max_priority_fee_microlamports: u64,

    /// Fee assumed when the RPC fee estimate fails
    #[serde(default = "default_fallback_fee")]
    pub fallback_fee_lamports: u64,
}

/// Withdrawal flow settings
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawConfig {
    /// Minimum balance (display units) required to withdraw
    #[serde(default = "default_min_withdraw")]
    pub min_withdraw_tokens: u64,

    /// Currency label shown to users
    #[serde(default = "default_currency_name")]
    pub currency_name: String,

    /// Token price used for USD display estimates
    #[serde(default = "default_token_price")]
    pub token_price_usd: f64,

    /// Reservation lifetime before passive expiry
    #[serde(default = "default_reservation_ttl")]
    pub reservation_ttl_secs: u64,

    /// Interval between expired-reservation sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Number of records shown in history displays
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path for JSON snapshot persistence
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

// Default value functions
fn default_rpc_endpoint() -> String {
    std::env::var("RPC_ENDPOINT").unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".into())
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

fn default_keypair_path() -> String {
    std::env::var("KEYPAIR_PATH").unwrap_or_else(|_| "credentials/payout/keypair.json".into())
}

fn default_token_decimals() -> u8 {
    9
}

fn default_explorer_url() -> String {
    "https://solscan.io".into()
}

fn default_min_fee_balance() -> u64 {
    1_000_000 // 0.001 SOL
}

fn default_compute_unit_limit() -> u32 {
    65_000
}

fn default_priority_fee() -> u64 {
    10_000
}

fn default_max_priority_fee() -> u64 {
    100_000
}

fn default_fallback_fee() -> u64 {
    10_000
}

fn default_min_withdraw() -> u64 {
    50
}

fn default_currency_name() -> String {
    std::env::var("CURRENCY_NAME").unwrap_or_else(|_| "TOKENS".into())
}

fn default_token_price() -> f64 {
    0.1
}

fn default_reservation_ttl() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    10 * 60
}

fn default_history_limit() -> usize {
    5
}

fn default_store_path() -> String {
    "payout-store.json".into()
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            .set_default("rpc.retry_attempts", default_retry_attempts() as i64)?
            .set_default("rpc.retry_base_delay_ms", default_retry_base_delay_ms() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix PAYOUT_)
            .add_source(
                config::Environment::with_prefix("PAYOUT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.withdraw.min_withdraw_tokens == 0 {
            anyhow::bail!("min_withdraw_tokens must be positive");
        }

        if self.withdraw.reservation_ttl_secs == 0 {
            anyhow::bail!("reservation_ttl_secs must be positive");
        }

        if self.withdraw.sweep_interval_secs == 0 {
            anyhow::bail!("sweep_interval_secs must be positive");
        }

        if self.withdraw.token_price_usd < 0.0 {
            anyhow::bail!("token_price_usd cannot be negative");
        }

        // SPL mints top out at 9 decimals in practice; anything larger
        // overflows u64 display-unit conversion long before it is sane.
        if self.wallet.token_decimals > 12 {
            anyhow::bail!(
                "token_decimals {} exceeds supported maximum 12",
                self.wallet.token_decimals
            );
        }

        if self.wallet.priority_fee_microlamports > self.wallet.max_priority_fee_microlamports {
            anyhow::bail!(
                "priority_fee_microlamports {} exceeds ceiling {}",
                self.wallet.priority_fee_microlamports,
                self.wallet.max_priority_fee_microlamports
            );
        }

        if self.wallet.compute_unit_limit == 0 {
            anyhow::bail!("compute_unit_limit must be positive");
        }

        // Validate the mint when set (commands that touch the chain require it)
        if !self.wallet.token_mint.is_empty() {
            solana_sdk::pubkey::Pubkey::from_str(&self.wallet.token_mint)
                .with_context(|| format!("Invalid token_mint: {}", self.wallet.token_mint))?;
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    timeout: {}ms
    retries: {} (base delay {}ms)
  Wallet:
    keypair_path: {}
    token_mint: {}
    token_decimals: {}
    explorer: {}
    min_fee_balance: {} lamports
    compute_unit_limit: {}
    priority_fee: {} microlamports (max {})
  Withdraw:
    min_withdraw: {} {}
    token_price: ${}
    reservation_ttl: {}s
    sweep_interval: {}s
  Store:
    path: {}
"#,
            mask_url(&self.rpc.endpoint),
            self.rpc.timeout_ms,
            self.rpc.retry_attempts,
            self.rpc.retry_base_delay_ms,
            self.wallet.keypair_path,
            if self.wallet.token_mint.is_empty() {
                "(not set)"
            } else {
                &self.wallet.token_mint
            },
            self.wallet.token_decimals,
            self.wallet.explorer_url,
            self.wallet.min_fee_balance_lamports,
            self.wallet.compute_unit_limit,
            self.wallet.priority_fee_microlamports,
            self.wallet.max_priority_fee_microlamports,
            self.withdraw.min_withdraw_tokens,
            self.withdraw.currency_name,
            self.withdraw.token_price_usd,
            self.withdraw.reservation_ttl_secs,
            self.withdraw.sweep_interval_secs,
            self.store.path,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                endpoint: default_rpc_endpoint(),
                timeout_ms: default_timeout_ms(),
                retry_attempts: default_retry_attempts(),
                retry_base_delay_ms: default_retry_base_delay_ms(),
            },
            wallet: WalletConfig {
                keypair_path: default_keypair_path(),
                token_mint: String::new(),
                token_decimals: default_token_decimals(),
                explorer_url: default_explorer_url(),
                min_fee_balance_lamports: default_min_fee_balance(),
                compute_unit_limit: default_compute_unit_limit(),
                priority_fee_microlamports: default_priority_fee(),
                max_priority_fee_microlamports: default_max_priority_fee(),
                fallback_fee_lamports: default_fallback_fee(),
            },
            withdraw: WithdrawConfig {
                min_withdraw_tokens: default_min_withdraw(),
                currency_name: default_currency_name(),
                token_price_usd: default_token_price(),
                reservation_ttl_secs: default_reservation_ttl(),
                sweep_interval_secs: default_sweep_interval(),
                history_limit: default_history_limit(),
            },
            store: StoreConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.withdraw.min_withdraw_tokens, 50);
        assert_eq!(config.withdraw.reservation_ttl_secs, 1800);
        assert_eq!(config.withdraw.sweep_interval_secs, 600);
        assert_eq!(config.wallet.token_decimals, 9);
    }

    #[test]
    fn test_validate_rejects_zero_minimum() {
        let mut config = Config::default();
        config.withdraw.min_withdraw_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_fee_above_ceiling() {
        let mut config = Config::default();
        config.wallet.priority_fee_microlamports = 200_000;
        config.wallet.max_priority_fee_microlamports = 100_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_mint() {
        let mut config = Config::default();
        config.wallet.token_mint = "not-a-pubkey".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(
            mask_url("https://api.example.com"),
            "https://api.example.com"
        );
    }
}
