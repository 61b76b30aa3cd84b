//! Earnbot Payout - withdrawal service for the task-earn Telegram bot
//!
//! # WARNING
//! - This service signs real on-chain transfers from a hot wallet.
//! - Keep the keypair file readable by the service user only.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

// Use the library crate
use earnbot_payout::cli::commands;
use earnbot_payout::config::Config;

/// Earnbot Payout - withdrawal service
#[derive(Parser)]
#[command(name = "payout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "payout.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the payout service
    Start,

    /// Check chain connectivity
    Health,

    /// Show payout wallet balances
    Balances,

    /// Show payout token details
    TokenInfo,

    /// Show current configuration (secrets masked)
    Config,

    /// Show a user's recent withdrawals
    History {
        /// Telegram user id
        telegram_id: i64,

        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("earnbot_payout=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Commands that sign with the hot wallet get the startup checks
    let needs_keypair = matches!(
        cli.command,
        Commands::Start | Commands::Health | Commands::Balances | Commands::TokenInfo
    );
    if needs_keypair {
        if let Err(e) = startup_checks(&config) {
            error!("Startup checks failed: {}", e);
            std::process::exit(1);
        }
    }

    // Execute command
    let result = match cli.command {
        Commands::Start => commands::start(&config).await,
        Commands::Health => commands::health(&config).await,
        Commands::Balances => commands::balances(&config).await,
        Commands::TokenInfo => commands::token_info(&config).await,
        Commands::Config => commands::show_config(&config),
        Commands::History { telegram_id, limit } => {
            commands::history(&config, telegram_id, limit).await
        }
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Perform startup safety checks
fn startup_checks(config: &Config) -> Result<()> {
    info!("Performing startup checks...");

    let keypair_path = &config.wallet.keypair_path;

    if !std::path::Path::new(keypair_path).exists() {
        return Err(anyhow::anyhow!("Keypair file not found: {}", keypair_path));
    }

    // Check keypair permissions (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(keypair_path)
            .map_err(|e| anyhow::anyhow!("Cannot read keypair file {}: {}", keypair_path, e))?;

        let mode = metadata.permissions().mode();

        // Check if file is readable by group or others (not 600)
        if mode & 0o077 != 0 {
            return Err(anyhow::anyhow!(
                "Keypair file {} has insecure permissions {:o}. \
                 Run 'chmod 600 {}' to fix. \
                 This service refuses to run with world-readable keypairs.",
                keypair_path,
                mode & 0o777,
                keypair_path
            ));
        }

        info!("Keypair permissions OK");
    }

    if config.wallet.token_mint.is_empty() {
        return Err(anyhow::anyhow!(
            "token_mint is not configured (set PAYOUT_WALLET__TOKEN_MINT or wallet.token_mint)"
        ));
    }

    warn!(
        "Hot wallet active: min withdrawal {} {}, fee floor {} lamports",
        config.withdraw.min_withdraw_tokens,
        config.withdraw.currency_name,
        config.wallet.min_fee_balance_lamports
    );

    info!("Startup checks passed");
    Ok(())
}
