//! Amount formatting and unit conversion helpers

/// Convert display-unit tokens to raw base units for the given mint decimals.
///
/// Returns None on overflow.
pub fn tokens_to_base_units(tokens: u64, decimals: u8) -> Option<u64> {
    tokens.checked_mul(10u64.checked_pow(decimals as u32)?)
}

/// Convert raw base units to display-unit tokens (floor)
pub fn base_units_to_tokens(raw: u64, decimals: u8) -> u64 {
    raw / 10u64.pow(decimals as u32)
}

/// Convert lamports to SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

/// Format a token amount with its USD estimate: "100 0XL ($10.00 USD)"
pub fn format_with_usd(amount: u64, currency: &str, token_price_usd: f64) -> String {
    let usd = amount as f64 * token_price_usd;
    format!("{} {} (${:.2} USD)", amount, currency, usd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_base_unit_conversion() {
        assert_eq!(tokens_to_base_units(1, 9), Some(1_000_000_000));
        assert_eq!(tokens_to_base_units(50, 6), Some(50_000_000));
        assert_eq!(tokens_to_base_units(0, 9), Some(0));
        // 10^19 overflows u64
        assert_eq!(tokens_to_base_units(1, 20), None);
        assert_eq!(tokens_to_base_units(u64::MAX, 1), None);

        assert_eq!(base_units_to_tokens(1_000_000_000, 9), 1);
        assert_eq!(base_units_to_tokens(1_999_999_999, 9), 1);
        assert_eq!(base_units_to_tokens(50_000_000, 6), 50);
    }

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_000_000_000), 1.0);
        assert_eq!(lamports_to_sol(500_000_000), 0.5);
    }

    #[test]
    fn test_format_with_usd() {
        assert_eq!(format_with_usd(100, "0XL", 0.1), "100 0XL ($10.00 USD)");
        assert_eq!(format_with_usd(0, "TOKENS", 0.1), "0 TOKENS ($0.00 USD)");
    }
}
