use crate::storage::{BASIS_POINTS, SCALE};

/// Tokens granted for a payment at a stage rate, rounded down.
///
/// Formula: tokens = floor(amount × rate / SCALE)
///
/// Example:
/// - amount: 20.0 payment units
/// - rate: 1000 tokens per unit
/// - tokens: 20,000
pub fn tokens_for_payment(amount: i128, rate: i128) -> Option<i128> {
    amount.checked_mul(rate)?.checked_div(SCALE)
}

/// Payment consumed for a token grant at a stage rate, rounded up.
///
/// Formula: payment = ceil(tokens × SCALE / rate)
///
/// Paired with `tokens_for_payment` so the contract never collects less
/// than the granted tokens are worth: floor on the way out, ceil on the
/// way in, and `payment_for_tokens(tokens_for_payment(a, r), r) <= a`.
pub fn payment_for_tokens(tokens: i128, rate: i128) -> Option<i128> {
    let scaled = tokens.checked_mul(SCALE)?;
    scaled.checked_add(rate.checked_sub(1)?)?.checked_div(rate)
}

/// Percentage share of an amount, whole-percent denominator.
pub fn percent_share(amount: i128, percent: u32) -> Option<i128> {
    amount.checked_mul(percent as i128)?.checked_div(100)
}

/// Slippage-bounded minimum for a liquidity leg.
///
/// Formula: min = amount × (10,000 - max_slippage_bps) / 10,000
pub fn min_after_slippage(amount: i128, max_slippage_bps: u32) -> Option<i128> {
    let keep = BASIS_POINTS.checked_sub(max_slippage_bps)? as i128;
    amount.checked_mul(keep)?.checked_div(BASIS_POINTS as i128)
}

/// Subtraction that floors at zero instead of underflowing.
///
/// Refunds decrement running totals with this so a total can never go
/// negative even if accounting drifted.
pub fn sub_to_floor(total: i128, amount: i128) -> i128 {
    if amount >= total {
        0
    } else {
        total - amount
    }
}
