//! Monetary amounts as stored by the ledger.
//!
//! Balances and invoice amounts live in `NUMERIC(20, 4)` columns. Every amount
//! entering the domain is checked against that shape here, so both store
//! backends hold exactly the same value and the database never has to round
//! or reject one.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Decimal places kept for every amount.
pub const MONEY_SCALE: u32 = 4;

/// Largest magnitude a `NUMERIC(20, 4)` column holds: sixteen integer digits.
pub fn max_amount() -> Decimal {
    Decimal::from_i128_with_scale(99_999_999_999_999_999_999, MONEY_SCALE)
}

/// Accept `amount` if it fits the stored shape, returning it at scale 4.
///
/// Trailing zeros beyond four places are ignored (`1.500000` is fine);
/// significant digits beyond four places are rejected rather than rounded.
pub fn validate_amount(amount: Decimal) -> DomainResult<Decimal> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(DomainError::validation(format!(
            "amount {amount} has more than {MONEY_SCALE} decimal places"
        )));
    }
    if amount.abs() > max_amount() {
        return Err(DomainError::validation(format!("amount {amount} is out of range")));
    }

    let mut scaled = amount;
    scaled.rescale(MONEY_SCALE);
    Ok(scaled)
}

/// Add two amounts, failing instead of overflowing or leaving the stored range.
pub fn checked_sum(current: Decimal, delta: Decimal) -> DomainResult<Decimal> {
    let sum = current
        .checked_add(delta)
        .ok_or_else(|| DomainError::validation("balance overflow"))?;
    if sum.abs() > max_amount() {
        return Err(DomainError::validation("balance overflow"));
    }
    Ok(sum)
}
