//! Outbound messaging surface
//!
//! The bot/command layer owns inbound updates; the core only needs to send
//! and edit messages in a conversation.

use async_trait::async_trait;

use crate::error::Result;

/// Outbound messaging operations the coordinator depends on
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML message to a conversation
    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Edit the most recent bot message in a conversation
    async fn edit_last(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Send a message with confirm/cancel choices attached
    async fn request_confirmation(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Messenger that logs outbound traffic; stands in for the bot layer in
/// CLI runs and local deployments
pub struct TracingMessenger;

#[async_trait]
impl Messenger for TracingMessenger {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        tracing::info!(chat_id, "outbound message: {}", text);
        Ok(())
    }

    async fn edit_last(&self, chat_id: i64, text: &str) -> Result<()> {
        tracing::info!(chat_id, "outbound edit: {}", text);
        Ok(())
    }

    async fn request_confirmation(&self, chat_id: i64, text: &str) -> Result<()> {
        tracing::info!(chat_id, "outbound confirmation prompt: {}", text);
        Ok(())
    }
}
