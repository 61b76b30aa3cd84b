//! Outbound message copy for the withdrawal flow

use crate::config::WithdrawConfig;
use crate::format::format_with_usd;
use crate::gateway::TransferReceipt;
use crate::store::types::WithdrawalRecord;

pub fn already_in_progress() -> String {
    "⏳ <b>Withdrawal Already in Progress</b>\n\n\
     You already have a withdrawal request being processed.\n\
     Please wait for it to complete before initiating another one."
        .to_string()
}

pub fn no_wallet_address() -> String {
    "❌ <b>No Wallet Address Set</b>\n\n\
     You need to set a wallet address first to withdraw.\n\
     Use /profile to set your address."
        .to_string()
}

pub fn invalid_wallet_address(address: &str) -> String {
    format!(
        "❌ <b>Invalid Wallet Address</b>\n\n\
         The address you provided is not valid.\n\
         Current address: <code>{}</code>\n\n\
         Use /profile to update your wallet address",
        address
    )
}

pub fn below_minimum(balance: u64, config: &WithdrawConfig) -> String {
    format!(
        "❌ <b>Minimum Withdrawal Not Met</b>\n\n\
         Minimum withdrawal amount: {}\n\
         Your current balance: {}\n\n\
         Keep earning to reach the minimum!",
        format_with_usd(config.min_withdraw_tokens, &config.currency_name, config.token_price_usd),
        format_with_usd(balance, &config.currency_name, config.token_price_usd),
    )
}

pub fn temporary_limit(available: u64, requested: u64, config: &WithdrawConfig) -> String {
    format!(
        "⚠️ <b>Temporary Withdrawal Limit</b>\n\n\
         Our payout wallet currently has limited funds:\n\
         Available: {}\n\
         Your withdrawal: {}\n\n\
         Please try again later or contact support.",
        format_with_usd(available, &config.currency_name, config.token_price_usd),
        format_with_usd(requested, &config.currency_name, config.token_price_usd),
    )
}

pub fn confirmation(amount: u64, address: &str, config: &WithdrawConfig) -> String {
    format!(
        "💸 <b>Withdrawal Confirmation</b>\n\n\
         Amount: {}\n\
         Recipient: <code>{}</code>\n\n\
         Please confirm this transaction:",
        format_with_usd(amount, &config.currency_name, config.token_price_usd),
        address.trim(),
    )
}

pub fn processing() -> String {
    "🔄 Processing your withdrawal... Please wait...".to_string()
}

pub fn success(amount: u64, receipt: &TransferReceipt, config: &WithdrawConfig) -> String {
    format!(
        "✅ <b>Withdrawal Successful!</b>\n\n\
         Amount: {}\n\
         TX: <code>{}</code>\n\n\
         View on explorer: <a href=\"{}\">{}</a>",
        format_with_usd(amount, &config.currency_name, config.token_price_usd),
        receipt.signature,
        receipt.explorer_url,
        receipt.explorer_url,
    )
}

pub fn failed(user_message: &str) -> String {
    format!(
        "❌ <b>Withdrawal Failed</b>\n\n\
         Error: {}\n\n\
         Your balance remains unchanged. Please try again later or contact \
         support if this persists.",
        user_message
    )
}

pub fn cancelled() -> String {
    "❌ Withdrawal cancelled.".to_string()
}

pub fn history(records: &[WithdrawalRecord], config: &WithdrawConfig) -> String {
    if records.is_empty() {
        return "📜 No withdrawals yet.".to_string();
    }

    let mut text = String::from("💸 Withdrawals:\n");
    for record in records {
        text.push_str(&format!(
            "- {} ({}) {}\n",
            format_with_usd(record.amount, &record.currency, config.token_price_usd),
            record.status,
            record.created_at.format("%Y-%m-%d"),
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::types::WithdrawalRecord;

    #[test]
    fn test_history_formats_status_and_amount() {
        let config = Config::default().withdraw;
        let records = vec![
            WithdrawalRecord::completed("u1", 100, "addr", "sig", 5000, "TOKENS"),
            WithdrawalRecord::failed("u1", 60, "addr", "boom", "detail", "TOKENS"),
        ];

        let text = history(&records, &config);
        assert!(text.contains("100 TOKENS"));
        assert!(text.contains("(completed)"));
        assert!(text.contains("(failed)"));
    }

    #[test]
    fn test_history_empty() {
        let config = Config::default().withdraw;
        assert!(history(&[], &config).contains("No withdrawals"));
    }

    #[test]
    fn test_failure_copy_mentions_unchanged_balance() {
        let text = failed("Token contract interaction failed. Please contact support.");
        assert!(text.contains("balance remains unchanged"));
    }
}
