//! # Money Module
//!
//! Fixed-point BRL amounts on top of `rust_decimal`.
//!
//! Every stored amount carries exactly two decimal places. Amounts coming from
//! callers are validated here before they reach the ledger.

use crate::error::{CoreError, CoreResult};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Number of decimal places for BRL.
pub const BRL_SCALE: u32 = 2;

/// Largest single amount accepted from a caller: R$ 1.000.000.000,00.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Round half away from zero to 2 decimal places and fix the scale at 2.
pub fn to_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(BRL_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(BRL_SCALE);
    rounded
}

/// Validate a caller-supplied amount: strictly positive, at most 2 decimals
/// and no larger than [`MAX_AMOUNT`].
///
/// # Examples
/// ```
/// use pandaloto_core::money::validate_amount;
/// use rust_decimal::Decimal;
///
/// let amount = validate_amount(Decimal::new(1050, 2)).unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// assert!(validate_amount(Decimal::ZERO).is_err());
/// ```
pub fn validate_amount(amount: Decimal) -> CoreResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "amount must be positive: {}",
            amount
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(CoreError::InvalidAmount(format!(
            "amount exceeds the maximum of {}: {}",
            MAX_AMOUNT, amount
        )));
    }
    if amount.normalize().scale() > BRL_SCALE {
        return Err(CoreError::InvalidAmount(format!(
            "amount has more than {} decimal places: {}",
            BRL_SCALE, amount
        )));
    }
    Ok(to_cents(amount))
}

/// Validate a non-negative amount (wager requirements may be zero).
pub fn validate_non_negative(amount: Decimal) -> CoreResult<Decimal> {
    if amount < Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "amount must not be negative: {}",
            amount
        )));
    }
    if amount.normalize().scale() > BRL_SCALE {
        return Err(CoreError::InvalidAmount(format!(
            "amount has more than {} decimal places: {}",
            BRL_SCALE, amount
        )));
    }
    Ok(to_cents(amount))
}

/// Parse an amount from user input ("10", "10.5", "10,50").
pub fn parse_amount(input: &str) -> CoreResult<Decimal> {
    let normalized = input.trim().replace(',', ".");
    let amount = Decimal::from_str(&normalized)
        .map_err(|_| CoreError::InvalidAmount(format!("malformed amount: {}", input)))?;
    validate_amount(amount)
}

/// Format as Brazilian Real, e.g. `R$ 1.234,56`.
pub fn format_brl(amount: Decimal) -> String {
    let cents = to_cents(amount);
    let negative = cents.is_sign_negative() && !cents.is_zero();
    let text = cents.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}R$ {},{}", if negative { "-" } else { "" }, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(dec!(100)).unwrap().to_string(), "100.00");
        assert_eq!(validate_amount(dec!(0.01)).unwrap(), dec!(0.01));
        assert!(validate_amount(dec!(0)).is_err());
        assert!(validate_amount(dec!(-5)).is_err());
        assert!(validate_amount(dec!(1.001)).is_err());
        // trailing zeros are not extra precision
        assert!(validate_amount(dec!(1.5000)).is_ok());
    }

    #[test]
    fn test_validate_amount_upper_bound() {
        assert_eq!(validate_amount(MAX_AMOUNT).unwrap(), dec!(1000000000.00));
        assert!(validate_amount(dec!(1000000000.01)).is_err());
        assert!(validate_amount(dec!(50000000000000000000000000000)).is_err());
        assert!(parse_amount("50000000000000000000000000000").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("10,50").unwrap(), dec!(10.50));
        assert_eq!(parse_amount(" 7 ").unwrap(), dec!(7.00));
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("-1").is_err());
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(dec!(1234.5)), "R$ 1.234,50");
        assert_eq!(format_brl(dec!(50)), "R$ 50,00");
        assert_eq!(format_brl(dec!(-100)), "-R$ 100,00");
        assert_eq!(format_brl(dec!(1000000)), "R$ 1.000.000,00");
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(validate_non_negative(dec!(0)).unwrap(), dec!(0.00));
        assert!(validate_non_negative(dec!(-0.01)).is_err());
    }
}
