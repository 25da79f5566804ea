//! # Error Module
//!
//! Domain errors for Pandaloto using thiserror.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core domain errors.
///
/// Pure validation failures, independent of storage or transport.
#[derive(Debug, Error)]
pub enum CoreError {
    // === Money errors ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: need {needed}, available {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    // === Ledger errors ===
    #[error("Ledger entry out of balance: {before} + {amount} != {after}")]
    UnbalancedEntry {
        before: Decimal,
        amount: Decimal,
        after: Decimal,
    },

    #[error("Invalid status transition for {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    // === Parsing errors ===
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    // === Validation errors ===
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }

    pub fn transition(entity: &str, from: &str, to: &str) -> Self {
        Self::InvalidTransition {
            entity: entity.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether this is an insufficient funds error
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, CoreError::InsufficientFunds { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = CoreError::InsufficientFunds {
            needed: dec!(1000.00),
            available: dec!(500.00),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: need 1000.00, available 500.00"
        );
        assert!(err.is_insufficient_funds());

        let err = CoreError::unknown("game type", "roleta");
        assert_eq!(err.to_string(), "Unknown game type: roleta");
    }

    #[test]
    fn test_transition_error() {
        let err = CoreError::transition("transaction", "completed", "pending");
        assert!(err.to_string().contains("completed -> pending"));
    }
}
