//! CLI command implementations

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::format::{format_with_usd, lamports_to_sol};
use crate::gateway::{PayoutGateway, WalletGateway};
use crate::messaging::TracingMessenger;
use crate::store::{MemoryStore, UserStore};
use crate::withdraw::{PendingWithdrawalRegistry, WithdrawEvent, WithdrawalCoordinator};

/// Run the payout service until a shutdown signal arrives
pub async fn start(config: &Config) -> Result<()> {
    info!("Starting payout service...");
    info!(
        "Minimum withdrawal: {} {}, reservation TTL: {}s",
        config.withdraw.min_withdraw_tokens,
        config.withdraw.currency_name,
        config.withdraw.reservation_ttl_secs
    );

    let store = Arc::new(MemoryStore::with_persistence(&config.store.path));
    store.load().await?;

    let gateway = Arc::new(WalletGateway::new(config)?);
    let registry = Arc::new(PendingWithdrawalRegistry::new(Duration::from_secs(
        config.withdraw.reservation_ttl_secs,
    )));

    let coordinator = WithdrawalCoordinator::new(
        store.clone(),
        store.clone(),
        registry.clone(),
        gateway.clone(),
        Arc::new(TracingMessenger),
        config.withdraw.clone(),
    );

    // Background sweep for expired reservations
    let sweeper = registry.spawn_sweeper(Duration::from_secs(config.withdraw.sweep_interval_secs));

    // The bot/command layer feeds withdrawal events through this channel
    let (_event_tx, mut event_rx) = mpsc::channel::<WithdrawEvent>(1024);

    info!("Payout service ready (wallet: {})", gateway.address());

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(event) => {
                        if let Err(e) = coordinator.handle_event(event).await {
                            warn!("Event handling failed: {}", e);
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Stop accepting new requests; in-flight transfers are not aborted
    sweeper.abort();
    store.save().await?;
    info!("Payout service stopped");

    Ok(())
}

/// Check chain connectivity
pub async fn health(config: &Config) -> Result<()> {
    let gateway = WalletGateway::new(config)?;
    let report = gateway.health().await?;

    println!("Chain health:");
    println!("  slot:          {}", report.slot);
    println!("  node version:  {}", report.node_version);
    println!(
        "  priority fee:  {} microlamports/cu",
        report.priority_fee_microlamports
    );

    Ok(())
}

/// Show payout wallet balances
pub async fn balances(config: &Config) -> Result<()> {
    let gateway = WalletGateway::new(config)?;
    let balances = gateway.full_balances().await?;

    println!("Payout wallet:");
    println!("  address: {}", balances.address);
    println!("  SOL:     {:.6}", lamports_to_sol(balances.sol_lamports));
    println!(
        "  tokens:  {}",
        format_with_usd(
            balances.token_balance,
            &config.withdraw.currency_name,
            config.withdraw.token_price_usd
        )
    );

    Ok(())
}

/// Show payout token details
pub async fn token_info(config: &Config) -> Result<()> {
    let gateway = WalletGateway::new(config)?;
    let info = gateway.token_info().await?;

    println!("Payout token:");
    println!("  mint:           {}", info.mint);
    println!("  decimals:       {}", info.decimals);
    println!("  supply:         {}", info.supply);
    println!("  wallet balance: {}", info.wallet_token_balance);
    println!(
        "  wallet SOL:     {:.6}",
        lamports_to_sol(info.wallet_sol_lamports)
    );

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Show a user's recent withdrawals from the local store
pub async fn history(config: &Config, telegram_id: i64, limit: usize) -> Result<()> {
    let store = MemoryStore::with_persistence(&config.store.path);
    store.load().await?;

    let Some(user) = store.find_user_by_telegram_id(telegram_id).await? else {
        println!("No user with Telegram id {}", telegram_id);
        return Ok(());
    };

    let records = crate::store::WithdrawalStore::list_withdrawals(&store, &user.id, limit).await?;
    if records.is_empty() {
        println!("No withdrawals for user {}", telegram_id);
        return Ok(());
    }

    println!("Withdrawals for user {}:", telegram_id);
    for record in records {
        let detail = match record.status {
            crate::store::WithdrawalStatus::Completed => {
                record.tx_signature.clone().unwrap_or_default()
            }
            _ => record.error.clone().unwrap_or_default(),
        };
        println!(
            "  {} | {} | {} | {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            format_with_usd(
                record.amount,
                &record.currency,
                config.withdraw.token_price_usd
            ),
            record.status,
            detail,
        );
    }

    Ok(())
}
