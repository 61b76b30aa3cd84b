//! Withdrawal events from the bot/command layer
//!
//! Button taps and commands arrive as named events; each carries the user
//! identity and an idempotency token derived from the interaction id, so
//! duplicate deliveries are distinguishable in logs and audits.

/// A user action driving the withdrawal state machine
#[derive(Debug, Clone)]
pub enum WithdrawEvent {
    /// User invoked the withdraw command
    Requested(WithdrawAction),
    /// User tapped the confirm button
    Confirmed(WithdrawAction),
    /// User tapped the cancel button
    Cancelled(WithdrawAction),
}

/// Identity and provenance of a withdrawal action
#[derive(Debug, Clone)]
pub struct WithdrawAction {
    /// Telegram user id
    pub telegram_id: i64,

    /// Conversation to reply in
    pub chat_id: i64,

    /// Idempotency token from the message/callback id
    pub interaction_id: String,
}

impl WithdrawEvent {
    /// The action payload, regardless of variant
    pub fn action(&self) -> &WithdrawAction {
        match self {
            WithdrawEvent::Requested(a) | WithdrawEvent::Confirmed(a) | WithdrawEvent::Cancelled(a) => a,
        }
    }
}
