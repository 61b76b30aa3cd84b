//! Withdrawal coordinator
//!
//! Drives the request → confirm → execute → settle state machine:
//!
//! ```text
//! NoRequest → Requested → Confirming → Settled(success)
//!                                    → Settled(failure)
//!                                    → Cancelled
//! ```
//!
//! The reservation freezes the amount (the user's full balance) and the
//! destination address at request time. Settlement order is fixed: ledger
//! write, then balance delta, then reservation release — the ledger is
//! never behind a released slot.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::config::WithdrawConfig;
use crate::error::{Error, Result};
use crate::gateway::{is_valid_address, PayoutGateway};
use crate::messaging::Messenger;
use crate::store::types::{User, WithdrawalRecord};
use crate::store::{UserStore, WithdrawalStore};

use super::events::{WithdrawAction, WithdrawEvent};
use super::messages;
use super::registry::PendingWithdrawalRegistry;

/// Outcome of a withdrawal request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A live reservation already exists for this user
    AlreadyPending,
    /// No receiving address on the profile
    NoWalletAddress,
    /// The stored receiving address does not parse
    InvalidWalletAddress,
    /// Balance below the configured minimum
    BelowMinimum { balance: u64, minimum: u64 },
    /// Payout wallet cannot cover the withdrawal right now
    TemporaryLimit { available: u64, requested: u64 },
    /// Reservation made; awaiting the user's confirm/cancel
    AwaitingConfirmation { amount: u64 },
}

/// Outcome of a confirm (settlement attempt)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Transfer confirmed, ledger written, balance decremented
    Completed { signature: String, amount: u64 },
    /// Liquidity drained between request and confirm; reservation released,
    /// nothing recorded
    SoftDeclined { available: u64, requested: u64 },
    /// Settlement failed; a failed record was written, balance untouched
    Failed { reason: String },
}

/// Outcome of a cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Reservation released (or was already gone — cancel is idempotent)
    Cancelled,
}

/// Orchestrates withdrawals across the registry, gateway, ledger and
/// user-balance store
pub struct WithdrawalCoordinator {
    users: Arc<dyn UserStore>,
    withdrawals: Arc<dyn WithdrawalStore>,
    registry: Arc<PendingWithdrawalRegistry>,
    gateway: Arc<dyn PayoutGateway>,
    messenger: Arc<dyn Messenger>,
    config: WithdrawConfig,
}

impl WithdrawalCoordinator {
    pub fn new(
        users: Arc<dyn UserStore>,
        withdrawals: Arc<dyn WithdrawalStore>,
        registry: Arc<PendingWithdrawalRegistry>,
        gateway: Arc<dyn PayoutGateway>,
        messenger: Arc<dyn Messenger>,
        config: WithdrawConfig,
    ) -> Self {
        Self {
            users,
            withdrawals,
            registry,
            gateway,
            messenger,
            config,
        }
    }

    /// Dispatch an inbound event to its handler
    pub async fn handle_event(&self, event: WithdrawEvent) -> Result<()> {
        debug!(
            interaction_id = %event.action().interaction_id,
            "handling withdrawal event: {:?}",
            event
        );
        match event {
            WithdrawEvent::Requested(action) => {
                let outcome = self.handle_request(&action).await?;
                debug!("request outcome: {:?}", outcome);
            }
            WithdrawEvent::Confirmed(action) => {
                let outcome = self.handle_confirm(&action).await?;
                debug!("confirm outcome: {:?}", outcome);
            }
            WithdrawEvent::Cancelled(action) => {
                let outcome = self.handle_cancel(&action).await?;
                debug!("cancel outcome: {:?}", outcome);
            }
        }
        Ok(())
    }

    /// Handle a withdraw command: validate, reserve, ask for confirmation
    pub async fn handle_request(&self, action: &WithdrawAction) -> Result<RequestOutcome> {
        let user = self.find_user(action.telegram_id).await?;
        let now = Utc::now();

        if self.registry.has_live(&user.id, now).await {
            self.messenger
                .send(action.chat_id, &messages::already_in_progress())
                .await?;
            return Ok(RequestOutcome::AlreadyPending);
        }

        let address = match user.wallet_address.as_deref() {
            None => {
                self.messenger
                    .send(action.chat_id, &messages::no_wallet_address())
                    .await?;
                return Ok(RequestOutcome::NoWalletAddress);
            }
            Some(address) if !is_valid_address(address) => {
                self.messenger
                    .send(action.chat_id, &messages::invalid_wallet_address(address))
                    .await?;
                return Ok(RequestOutcome::InvalidWalletAddress);
            }
            Some(address) => address.trim().to_string(),
        };

        if user.balance < self.config.min_withdraw_tokens {
            self.messenger
                .send(
                    action.chat_id,
                    &messages::below_minimum(user.balance, &self.config),
                )
                .await?;
            return Ok(RequestOutcome::BelowMinimum {
                balance: user.balance,
                minimum: self.config.min_withdraw_tokens,
            });
        }

        // The amount is the user's full balance, frozen here
        let requested = user.balance;

        let available = self.gateway.available_token_balance().await;
        if available < requested {
            self.messenger
                .send(
                    action.chat_id,
                    &messages::temporary_limit(available, requested, &self.config),
                )
                .await?;
            return Ok(RequestOutcome::TemporaryLimit {
                available,
                requested,
            });
        }

        match self.registry.reserve(&user.id, requested, &address, now).await {
            Ok(()) => {}
            Err(Error::WithdrawalPending) => {
                self.messenger
                    .send(action.chat_id, &messages::already_in_progress())
                    .await?;
                return Ok(RequestOutcome::AlreadyPending);
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self
            .messenger
            .request_confirmation(
                action.chat_id,
                &messages::confirmation(requested, &address, &self.config),
            )
            .await
        {
            // Never leave a slot reserved for a prompt the user never saw
            self.registry.release(&user.id).await;
            return Err(e);
        }

        Ok(RequestOutcome::AwaitingConfirmation { amount: requested })
    }

    /// Handle a confirm tap: settle the reserved withdrawal
    pub async fn handle_confirm(&self, action: &WithdrawAction) -> Result<SettleOutcome> {
        let user = self.find_user(action.telegram_id).await?;

        self.messenger
            .edit_last(action.chat_id, &messages::processing())
            .await?;

        match self.settle(&user, action.chat_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(
                    user_id = %user.id,
                    interaction_id = %action.interaction_id,
                    "Withdrawal failed: {}",
                    err
                );

                let reason = err.user_message();
                let address = user.wallet_address.as_deref().unwrap_or_default().trim();

                let record = WithdrawalRecord::failed(
                    &user.id,
                    user.balance,
                    address,
                    &reason,
                    &err.to_string(),
                    &self.config.currency_name,
                );
                if let Err(e) = self.withdrawals.create_withdrawal(record).await {
                    error!("Failed to record failed withdrawal: {}", e);
                }

                self.registry.release(&user.id).await;

                if let Err(e) = self
                    .messenger
                    .edit_last(action.chat_id, &messages::failed(&reason))
                    .await
                {
                    warn!("Failed to deliver failure message: {}", e);
                }

                Ok(SettleOutcome::Failed { reason })
            }
        }
    }

    /// Settlement body; any error here becomes a recorded failed withdrawal
    async fn settle(&self, user: &User, chat_id: i64) -> Result<SettleOutcome> {
        // Claim the reservation; a missing or already-claimed slot means a
        // duplicate tap, an expiry, or a cancel raced this confirm
        let reservation = self
            .registry
            .begin_confirm(&user.id)
            .await
            .ok_or(Error::ReservationMissing)?;

        // Funds may have drained since the request
        let available = self.gateway.available_token_balance().await;
        if available < reservation.amount {
            self.registry.release(&user.id).await;
            self.messenger
                .edit_last(
                    chat_id,
                    &messages::temporary_limit(available, reservation.amount, &self.config),
                )
                .await?;
            return Ok(SettleOutcome::SoftDeclined {
                available,
                requested: reservation.amount,
            });
        }

        let receipt = self
            .gateway
            .transfer_tokens(&reservation.address, reservation.amount)
            .await?;

        // Ledger first, then balance, then release — never release ahead of
        // the ledger write
        let record = WithdrawalRecord::completed(
            &user.id,
            reservation.amount,
            &reservation.address,
            &receipt.signature,
            receipt.fee_lamports,
            &self.config.currency_name,
        );
        self.withdrawals.create_withdrawal(record).await?;

        self.users
            .increment_balance(&user.id, -(reservation.amount as i64))
            .await?;
        self.users.set_last_withdrawal(&user.id, Utc::now()).await?;

        self.registry.release(&user.id).await;

        if let Err(e) = self
            .messenger
            .send(
                chat_id,
                &messages::success(reservation.amount, &receipt, &self.config),
            )
            .await
        {
            warn!("Failed to deliver success message: {}", e);
        }

        Ok(SettleOutcome::Completed {
            signature: receipt.signature,
            amount: reservation.amount,
        })
    }

    /// Handle a cancel tap. Idempotent: cancelling an already-released
    /// reservation is a no-op.
    pub async fn handle_cancel(&self, action: &WithdrawAction) -> Result<CancelOutcome> {
        let user = self.find_user(action.telegram_id).await?;

        self.registry.release(&user.id).await;

        if let Err(e) = self
            .messenger
            .edit_last(action.chat_id, &messages::cancelled())
            .await
        {
            warn!("Failed to deliver cancel message: {}", e);
        }

        Ok(CancelOutcome::Cancelled)
    }

    /// Formatted recent withdrawal history for a user
    pub async fn history(&self, telegram_id: i64) -> Result<String> {
        let user = self.find_user(telegram_id).await?;
        let records = self
            .withdrawals
            .list_withdrawals(&user.id, self.config.history_limit)
            .await?;
        Ok(messages::history(&records, &self.config))
    }

    async fn find_user(&self, telegram_id: i64) -> Result<User> {
        self.users
            .find_user_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Unknown user: {}", telegram_id)))
    }
}
