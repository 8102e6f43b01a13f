//! Token cost estimation for review jobs.
//!
//! The estimate is charged up front, before the worker knows the real usage,
//! so every term truncates rather than rounding in the caller's favour.

/// Bytes of source per estimated input token
pub const BYTES_PER_TOKEN: u64 = 4;

/// Fixed prompt overhead added to every review
pub const SYSTEM_OVERHEAD_TOKENS: u64 = 500;

/// Fixed allowance for the model's response
pub const OUTPUT_ALLOWANCE_TOKENS: u64 = 2_000;

/// Estimate the token cost of reviewing `content`.
pub fn estimate_cost(content: &str) -> u64 {
    estimate_cost_for_len(content.len())
}

/// Estimate from a byte length.
pub fn estimate_cost_for_len(byte_len: usize) -> u64 {
    let input_tokens = byte_len as u64 / BYTES_PER_TOKEN;
    input_tokens + SYSTEM_OVERHEAD_TOKENS + OUTPUT_ALLOWANCE_TOKENS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_kilobyte_review() {
        let content = "a".repeat(4000);
        assert_eq!(estimate_cost(&content), 3500);
    }

    #[test]
    fn test_truncates_partial_token() {
        assert_eq!(estimate_cost("abc"), 2500);
        assert_eq!(estimate_cost("abcdefg"), 2501);
    }

    #[test]
    fn test_counts_bytes_not_chars() {
        // four 3-byte characters
        assert_eq!(estimate_cost("€€€€"), 2503);
    }

    #[test]
    fn test_empty_content_still_pays_overhead() {
        assert_eq!(estimate_cost(""), SYSTEM_OVERHEAD_TOKENS + OUTPUT_ALLOWANCE_TOKENS);
    }
}
