//! Balance mutator
//!
//! The single write path for user balances. A mutation runs on a connection
//! inside an open database transaction owned by the caller, so the caller can
//! add dependent rows (bet, bonus, audit) before committing:
//!
//! ```rust,ignore
//! let mut tx = ctx.pool().begin().await?;
//! let entry = BalanceMutator::apply(&mut tx, &change, ctx.next_id(), now).await?;
//! AuditLogRepo::insert(&mut *tx, &audit).await?;
//! tx.commit().await?;
//! ```
//!
//! Dropping the transaction on any error rolls everything back.

use crate::error::{BusinessError, BusinessResult};
use chrono::{DateTime, Utc};
use pandaloto_core::money::validate_amount;
use pandaloto_core::{
    LedgerEntry, PaymentMethod, TransactionMetadata, TransactionStatus, TransactionType,
};
use pandaloto_persistence::{TransactionRepo, UserRepo};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

/// A requested change to one user's balance
#[derive(Debug, Clone)]
pub struct BalanceChange {
    pub user_id: String,
    pub tx_type: TransactionType,
    /// Signed: positive credits, negative debits
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub payment_method: Option<PaymentMethod>,
    pub metadata: Option<TransactionMetadata>,
    pub description: String,
    /// Refuse unless the user's KYC is approved
    pub require_kyc: bool,
    /// Let the change through for suspended accounts
    pub allow_inactive: bool,
}

impl BalanceChange {
    fn new(user_id: &str, tx_type: TransactionType, amount: Decimal) -> Self {
        Self {
            user_id: user_id.to_string(),
            tx_type,
            amount,
            status: TransactionStatus::Completed,
            payment_method: None,
            metadata: None,
            description: String::new(),
            require_kyc: false,
            allow_inactive: false,
        }
    }

    /// Credit `amount` (must be positive)
    pub fn credit(user_id: &str, tx_type: TransactionType, amount: Decimal) -> BusinessResult<Self> {
        Ok(Self::new(user_id, tx_type, validate_amount(amount)?))
    }

    /// Debit `amount` (given positive, stored negative)
    pub fn debit(user_id: &str, tx_type: TransactionType, amount: Decimal) -> BusinessResult<Self> {
        Ok(Self::new(user_id, tx_type, -validate_amount(amount)?))
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
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

    pub fn requiring_kyc(mut self) -> Self {
        self.require_kyc = true;
        self
    }

    pub fn allow_inactive(mut self) -> Self {
        self.allow_inactive = true;
        self
    }

    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// Atomic balance + ledger writer
pub struct BalanceMutator;

impl BalanceMutator {
    /// Apply `change` on `conn`, which must be inside an open transaction.
    ///
    /// Order: lock the user row, read it, check funds then KYC, then write
    /// the new balance and the ledger entry. Nothing is committed here.
    pub async fn apply(
        conn: &mut SqliteConnection,
        change: &BalanceChange,
        entry_id: String,
        now: DateTime<Utc>,
    ) -> BusinessResult<LedgerEntry> {
        UserRepo::lock_for_update(&mut *conn, &change.user_id, now).await?;
        let user = UserRepo::get_by_id(&mut *conn, &change.user_id).await?;

        if !user.is_active && !change.allow_inactive {
            return Err(BusinessError::AccountInactive(user.id));
        }

        let balance_before = user.balance;
        let balance_after = balance_before.checked_add(change.amount).ok_or_else(|| {
            BusinessError::InvalidAmount(format!(
                "balance overflow: {} + {}",
                balance_before, change.amount
            ))
        })?;

        if change.is_debit() && balance_after < Decimal::ZERO {
            tracing::warn!(
                user = %user.id,
                tx_type = %change.tx_type,
                amount = %change.amount,
                balance = %balance_before,
                "debit refused: insufficient funds"
            );
            return Err(BusinessError::insufficient_funds(
                change.amount.abs(),
                balance_before,
            ));
        }

        if change.require_kyc && !user.can_withdraw() {
            tracing::warn!(user = %user.id, kyc = %user.kyc_status, "debit refused: KYC not approved");
            return Err(BusinessError::KycRequired {
                status: user.kyc_status,
            });
        }

        let mut entry = LedgerEntry::new(
            entry_id,
            &user.id,
            change.tx_type,
            change.amount,
            balance_before,
            balance_after,
            now,
        )?
        .with_status(change.status)
        .with_description(change.description.clone());
        if let Some(method) = change.payment_method {
            entry = entry.with_payment_method(method);
        }
        if let Some(metadata) = &change.metadata {
            entry = entry.with_metadata(metadata.clone());
        }

        UserRepo::update_balance(&mut *conn, &user.id, entry.balance_after, now).await?;
        TransactionRepo::insert(&mut *conn, &entry).await?;

        tracing::debug!(
            user = %user.id,
            tx = %entry.id,
            before = %entry.balance_before,
            after = %entry.balance_after,
            "balance mutated"
        );
        Ok(entry)
    }
}
