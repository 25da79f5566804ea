//! # Ledger Module
//!
//! Append-only ledger entries. Every balance change is recorded as exactly one
//! entry carrying the balance before and after the change.

use crate::bet::GameType;
use crate::error::{CoreError, CoreResult};
use crate::money::to_cents;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdraw,
    BetStake,
    BetWin,
    BetRefund,
    Bonus,
    /// Compensating entry (failed or cancelled withdrawal)
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
            TransactionType::BetStake => "bet_stake",
            TransactionType::BetWin => "bet_win",
            TransactionType::BetRefund => "bet_refund",
            TransactionType::Bonus => "bonus",
            TransactionType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdraw" => Some(TransactionType::Withdraw),
            "bet_stake" => Some(TransactionType::BetStake),
            "bet_win" => Some(TransactionType::BetWin),
            "bet_refund" => Some(TransactionType::BetRefund),
            "bonus" => Some(TransactionType::Bonus),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }

    /// Debits carry a negative amount
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionType::Withdraw | TransactionType::BetStake)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Processing status of a ledger entry.
///
/// Deposits, stakes and bonus credits complete immediately. Withdrawals start
/// as `Pending` and are moved forward by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TransactionStatus::Pending),
            "processing" => Some(TransactionStatus::Processing),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }

    /// Whether the funds of a debit in this status go back to the user
    pub fn returns_funds(&self) -> bool {
        matches!(self, TransactionStatus::Failed | TransactionStatus::Cancelled)
    }

    /// Validate a status change.
    ///
    /// pending -> processing | completed | failed | cancelled
    /// processing -> completed | failed | cancelled
    pub fn transition_to(self, next: TransactionStatus) -> CoreResult<TransactionStatus> {
        let allowed = match self {
            TransactionStatus::Pending => next != TransactionStatus::Pending,
            TransactionStatus::Processing => next.is_final(),
            _ => false,
        };
        if allowed {
            Ok(next)
        } else {
            Err(CoreError::transition("transaction", self.as_str(), next.as_str()))
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Payment rail used for a deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    DebitCard,
    Crypto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Crypto => "crypto",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pix" => Some(PaymentMethod::Pix),
            "credit_card" => Some(PaymentMethod::CreditCard),
            "debit_card" => Some(PaymentMethod::DebitCard),
            "crypto" => Some(PaymentMethod::Crypto),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Structured metadata attached to a ledger entry.
///
/// Unknown shapes written by older versions land in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionMetadata {
    Known(KnownMetadata),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KnownMetadata {
    Payment {
        method: PaymentMethod,
    },
    BetStake {
        bet_id: String,
        game_type: GameType,
    },
    Bonus {
        bonus_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    Reversal {
        original_id: String,
        reason: String,
    },
}

impl TransactionMetadata {
    pub fn payment(method: PaymentMethod) -> Self {
        Self::Known(KnownMetadata::Payment { method })
    }

    pub fn bet_stake(bet_id: &str, game_type: GameType) -> Self {
        Self::Known(KnownMetadata::BetStake {
            bet_id: bet_id.to_string(),
            game_type,
        })
    }

    pub fn bonus(bonus_id: &str, code: Option<String>) -> Self {
        Self::Known(KnownMetadata::Bonus {
            bonus_id: bonus_id.to_string(),
            code,
        })
    }

    pub fn reversal(original_id: &str, reason: &str) -> Self {
        Self::Known(KnownMetadata::Reversal {
            original_id: original_id.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// One immutable ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub tx_type: TransactionType,
    /// Signed: negative for debits
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TransactionMetadata>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// Build an entry, checking `balance_before + amount == balance_after`.
    pub fn new(
        id: String,
        user_id: &str,
        tx_type: TransactionType,
        amount: Decimal,
        balance_before: Decimal,
        balance_after: Decimal,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let amount = to_cents(amount);
        let balance_before = to_cents(balance_before);
        let balance_after = to_cents(balance_after);

        if balance_before + amount != balance_after {
            return Err(CoreError::UnbalancedEntry {
                before: balance_before,
                amount,
                after: balance_after,
            });
        }
        if tx_type.is_debit() && amount > Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "{} must carry a negative amount: {}",
                tx_type, amount
            )));
        }

        Ok(Self {
            id,
            user_id: user_id.to_string(),
            tx_type,
            amount,
            balance_before,
            balance_after,
            status: TransactionStatus::Completed,
            payment_method: None,
            metadata: None,
            description: String::new(),
            created_at,
            completed_at: Some(created_at),
        })
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        if !status.is_final() {
            self.completed_at = None;
        }
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_metadata(mut self, metadata: TransactionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Absolute value of the movement
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ({} -> {}) {}",
            self.id, self.tx_type, self.amount, self.balance_before, self.balance_after, self.status
        )
    }
}

/// Check that consecutive entries of one user chain together:
/// each `balance_before` equals the previous `balance_after`.
pub fn verify_continuity(entries: &[LedgerEntry]) -> CoreResult<()> {
    for pair in entries.windows(2) {
        if pair[1].balance_before != pair[0].balance_after {
            return Err(CoreError::ValidationError(format!(
                "ledger gap between {} ({}) and {} ({})",
                pair[0].id, pair[0].balance_after, pair[1].id, pair[1].balance_before
            )));
        }
    }
    Ok(())
}
