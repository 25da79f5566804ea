//! Repository implementations for SQLite
//!
//! CRUD operations for all tables. Every function takes any SQLite executor,
//! so the same call works on the pool or inside an open transaction
//! (`&mut *tx`).

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, Utc};
use pandaloto_core::money::to_cents;
use pandaloto_core::{
    AlertStatus, AuditLog, Bet, Bonus, BonusStatus, EntityType, FraudAlert, KycDocument,
    KycStatus, LedgerEntry, Role, TransactionStatus, TransactionType, User,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteExecutor, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Decimal as stored TEXT, always 2 places
fn money(amount: Decimal) -> String {
    to_cents(amount).to_string()
}

// ============================================================================
// User Repository
// ============================================================================

/// Repository for the users table
pub struct UserRepo;

impl UserRepo {
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, user: &User) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, full_name, cpf, phone, role,
                               balance, kyc_status, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.cpf)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(money(user.balance))
        .bind(user.kyc_status.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(exec)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PersistenceError::UniqueViolation(db.message().to_string())
            }
            other => PersistenceError::Database(other),
        })?;
        Ok(())
    }

    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<User> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("User", id))?
            .try_into()
    }

    pub async fn find_by_username<'e, E: SqliteExecutor<'e>>(
        exec: E,
        username: &str,
    ) -> PersistenceResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ? COLLATE NOCASE")
            .bind(username)
            .fetch_optional(exec)
            .await?
            .map(User::try_from)
            .transpose()
    }

    pub async fn find_by_email<'e, E: SqliteExecutor<'e>>(
        exec: E,
        email: &str,
    ) -> PersistenceResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(exec)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// All users, newest first
    pub async fn get_all<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at DESC, rowid DESC")
            .fetch_all(exec)
            .await?;
        convert_all(rows)
    }

    /// Take the write lock on a user row.
    ///
    /// Must be the first statement of a balance transaction: the UPDATE makes
    /// SQLite take its RESERVED lock, so concurrent writers queue here and the
    /// balance read that follows cannot be stale.
    pub async fn lock_for_update<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: &str,
        now: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn get_balance<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<Decimal> {
        let row: Option<(String,)> = sqlx::query_as("SELECT balance FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?;
        let (balance,) = row.ok_or_else(|| PersistenceError::not_found("User", id))?;
        parse_decimal(&balance)
    }

    pub async fn update_balance<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: &str,
        balance: Decimal,
        now: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE users SET balance = ?, updated_at = ? WHERE id = ?")
            .bind(money(balance))
            .bind(now)
            .bind(id)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn update_kyc_status<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: &str,
        status: KycStatus,
        now: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE users SET kyc_status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(id)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn set_active<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: &str,
        active: bool,
        now: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(now)
            .bind(id)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", id));
        }
        Ok(())
    }

    /// Delete a user and, through cascades, everything they own
    pub async fn delete<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn count_by_role<'e, E: SqliteExecutor<'e>>(exec: E, role: Role) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(exec)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Transaction Repository
// ============================================================================

/// Repository for the transactions (ledger) table
pub struct TransactionRepo;

impl TransactionRepo {
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, entry: &LedgerEntry) -> PersistenceResult<()> {
        let metadata = entry
            .metadata
            .as_ref()
            .map(|m| to_json("metadata", m))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, tx_type, amount, balance_before, balance_after,
                                      status, payment_method, metadata, description, created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.tx_type.as_str())
        .bind(money(entry.amount))
        .bind(money(entry.balance_before))
        .bind(money(entry.balance_after))
        .bind(entry.status.as_str())
        .bind(entry.payment_method.map(|m| m.as_str()))
        .bind(metadata)
        .bind(&entry.description)
        .bind(entry.created_at)
        .bind(entry.completed_at)
        .execute(exec)
        .await?;
        Ok(())
    }

    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<LedgerEntry> {
        sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Transaction", id))?
            .try_into()
    }

    /// Latest entries of a user, newest first
    pub async fn list_by_user<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
        limit: i64,
    ) -> PersistenceResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// Full ledger of a user in creation order
    pub async fn history<'e, E: SqliteExecutor<'e>>(exec: E, user_id: &str) -> PersistenceResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE user_id = ? ORDER BY created_at, rowid",
        )
        .bind(user_id)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// Entries created at or after `since`, in creation order
    pub async fn list_since<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> PersistenceResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE user_id = ? AND created_at >= ? ORDER BY created_at, rowid",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// Number of entries of any type created at or after `since`
    pub async fn count_since<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE user_id = ? AND created_at >= ?")
                .bind(user_id)
                .bind(since)
                .fetch_one(exec)
                .await?;
        Ok(row.0)
    }

    /// Withdrawals waiting for processing, oldest first
    pub async fn list_open_withdrawals<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE tx_type = ? AND status IN ('pending', 'processing') \
             ORDER BY created_at, rowid",
        )
        .bind(TransactionType::Withdraw.as_str())
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    pub async fn update_status<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: &str,
        status: TransactionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE transactions SET status = ?, completed_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(completed_at)
            .bind(id)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Transaction", id));
        }
        Ok(())
    }

    /// Sum of all ledger amounts of a user
    pub async fn sum_by_user<'e, E: SqliteExecutor<'e>>(exec: E, user_id: &str) -> PersistenceResult<Decimal> {
        let amounts: Vec<(String,)> = sqlx::query_as("SELECT amount FROM transactions WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(exec)
            .await?;
        amounts
            .iter()
            .try_fold(Decimal::ZERO, |acc, (amount,)| -> PersistenceResult<Decimal> {
                Ok(acc + parse_decimal(amount)?)
            })
    }
}

// ============================================================================
// Bet Repository
// ============================================================================

/// Repository for the bets table
pub struct BetRepo;

impl BetRepo {
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, bet: &Bet) -> PersistenceResult<()> {
        let game_data = bet
            .game_data
            .as_ref()
            .map(|d| to_json("game_data", d))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO bets (id, user_id, transaction_id, game_type, game_id, amount, potential_win,
                              actual_win, status, game_data, placed_at, settled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bet.id)
        .bind(&bet.user_id)
        .bind(&bet.transaction_id)
        .bind(bet.game_type.as_str())
        .bind(&bet.game_id)
        .bind(money(bet.amount))
        .bind(money(bet.potential_win))
        .bind(money(bet.actual_win))
        .bind(bet.status.as_str())
        .bind(game_data)
        .bind(bet.placed_at)
        .bind(bet.settled_at)
        .execute(exec)
        .await?;
        Ok(())
    }

    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<Bet> {
        sqlx::query_as::<_, BetRow>("SELECT * FROM bets WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Bet", id))?
            .try_into()
    }

    /// Latest bets of a user, newest first
    pub async fn list_by_user<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
        limit: i64,
    ) -> PersistenceResult<Vec<Bet>> {
        let rows = sqlx::query_as::<_, BetRow>(
            "SELECT * FROM bets WHERE user_id = ? ORDER BY placed_at DESC, rowid DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// (total staked, total won) for a user
    pub async fn totals_by_user<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
    ) -> PersistenceResult<(Decimal, Decimal)> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT amount, actual_win FROM bets WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(exec)
            .await?;

        let mut wagered = Decimal::ZERO;
        let mut won = Decimal::ZERO;
        for (amount, actual_win) in &rows {
            wagered += parse_decimal(amount)?;
            won += parse_decimal(actual_win)?;
        }
        Ok((to_cents(wagered), to_cents(won)))
    }
}

// ============================================================================
// KYC Document Repository
// ============================================================================

/// Repository for the kyc_documents table
pub struct KycDocumentRepo;

impl KycDocumentRepo {
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, doc: &KycDocument) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kyc_documents (id, user_id, document_type, file_url, status,
                                       rejection_reason, reviewed_by, reviewed_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.user_id)
        .bind(doc.document_type.as_str())
        .bind(&doc.file_url)
        .bind(doc.status.as_str())
        .bind(&doc.rejection_reason)
        .bind(&doc.reviewed_by)
        .bind(doc.reviewed_at)
        .bind(doc.created_at)
        .execute(exec)
        .await?;
        Ok(())
    }

    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<KycDocument> {
        sqlx::query_as::<_, KycDocumentRow>("SELECT * FROM kyc_documents WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("KycDocument", id))?
            .try_into()
    }

    pub async fn list_by_user<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
    ) -> PersistenceResult<Vec<KycDocument>> {
        let rows = sqlx::query_as::<_, KycDocumentRow>(
            "SELECT * FROM kyc_documents WHERE user_id = ? ORDER BY created_at, rowid",
        )
        .bind(user_id)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// Review queue, oldest first
    pub async fn list_pending<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<Vec<KycDocument>> {
        let rows = sqlx::query_as::<_, KycDocumentRow>(
            "SELECT * FROM kyc_documents WHERE status IN ('pending', 'under_review') ORDER BY created_at, rowid",
        )
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// Persist status, reason and reviewer of a reviewed document
    pub async fn update_review<'e, E: SqliteExecutor<'e>>(exec: E, doc: &KycDocument) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE kyc_documents SET status = ?, rejection_reason = ?, reviewed_by = ?, reviewed_at = ? WHERE id = ?",
        )
        .bind(doc.status.as_str())
        .bind(&doc.rejection_reason)
        .bind(&doc.reviewed_by)
        .bind(doc.reviewed_at)
        .bind(&doc.id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("KycDocument", &doc.id));
        }
        Ok(())
    }

    pub async fn count_pending<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM kyc_documents WHERE status IN ('pending', 'under_review')")
                .fetch_one(exec)
                .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Fraud Alert Repository
// ============================================================================

/// Repository for the fraud_alerts table
pub struct FraudAlertRepo;

impl FraudAlertRepo {
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, alert: &FraudAlert) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fraud_alerts (id, user_id, alert_type, severity, status, details,
                                      triggered_at, reviewed_by, reviewed_at, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.id)
        .bind(&alert.user_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.severity.as_str())
        .bind(alert.status.as_str())
        .bind(to_json("details", &alert.details)?)
        .bind(alert.triggered_at)
        .bind(&alert.reviewed_by)
        .bind(alert.reviewed_at)
        .bind(&alert.notes)
        .execute(exec)
        .await?;
        Ok(())
    }

    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<FraudAlert> {
        sqlx::query_as::<_, FraudAlertRow>("SELECT * FROM fraud_alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("FraudAlert", id))?
            .try_into()
    }

    /// Alerts, newest first, optionally filtered by status
    pub async fn list<'e, E: SqliteExecutor<'e>>(
        exec: E,
        status: Option<AlertStatus>,
    ) -> PersistenceResult<Vec<FraudAlert>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, FraudAlertRow>(
                    "SELECT * FROM fraud_alerts WHERE status = ? ORDER BY triggered_at DESC, rowid DESC",
                )
                .bind(status.as_str())
                .fetch_all(exec)
                .await?
            }
            None => {
                sqlx::query_as::<_, FraudAlertRow>(
                    "SELECT * FROM fraud_alerts ORDER BY triggered_at DESC, rowid DESC",
                )
                .fetch_all(exec)
                .await?
            }
        };
        convert_all(rows)
    }

    /// Alerts of one user in trigger order
    pub async fn list_by_user<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
    ) -> PersistenceResult<Vec<FraudAlert>> {
        let rows = sqlx::query_as::<_, FraudAlertRow>(
            "SELECT * FROM fraud_alerts WHERE user_id = ? ORDER BY triggered_at, rowid",
        )
        .bind(user_id)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    pub async fn update_review<'e, E: SqliteExecutor<'e>>(exec: E, alert: &FraudAlert) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE fraud_alerts SET status = ?, notes = ?, reviewed_by = ?, reviewed_at = ? WHERE id = ?",
        )
        .bind(alert.status.as_str())
        .bind(&alert.notes)
        .bind(&alert.reviewed_by)
        .bind(alert.reviewed_at)
        .bind(&alert.id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("FraudAlert", &alert.id));
        }
        Ok(())
    }
}

// ============================================================================
// Bonus Repository
// ============================================================================

/// Repository for the bonuses table
pub struct BonusRepo;

impl BonusRepo {
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, bonus: &Bonus) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bonuses (id, user_id, bonus_type, amount, wager_requirement, current_wager,
                                 status, code, description, expires_at, applied_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bonus.id)
        .bind(&bonus.user_id)
        .bind(bonus.bonus_type.as_str())
        .bind(money(bonus.amount))
        .bind(money(bonus.wager_requirement))
        .bind(money(bonus.current_wager))
        .bind(bonus.status.as_str())
        .bind(&bonus.code)
        .bind(&bonus.description)
        .bind(bonus.expires_at)
        .bind(bonus.applied_at)
        .bind(bonus.created_at)
        .execute(exec)
        .await?;
        Ok(())
    }

    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(exec: E, id: &str) -> PersistenceResult<Bonus> {
        sqlx::query_as::<_, BonusRow>("SELECT * FROM bonuses WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Bonus", id))?
            .try_into()
    }

    /// Bonuses owned by a user, newest first, optionally filtered by status
    pub async fn list_by_user<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
        status: Option<BonusStatus>,
    ) -> PersistenceResult<Vec<Bonus>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, BonusRow>(
                    "SELECT * FROM bonuses WHERE user_id = ? AND status = ? ORDER BY created_at DESC, rowid DESC",
                )
                .bind(user_id)
                .bind(status.as_str())
                .fetch_all(exec)
                .await?
            }
            None => {
                sqlx::query_as::<_, BonusRow>(
                    "SELECT * FROM bonuses WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
                )
                .bind(user_id)
                .fetch_all(exec)
                .await?
            }
        };
        convert_all(rows)
    }

    pub async fn list_all<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<Vec<Bonus>> {
        let rows = sqlx::query_as::<_, BonusRow>("SELECT * FROM bonuses ORDER BY created_at DESC, rowid DESC")
            .fetch_all(exec)
            .await?;
        convert_all(rows)
    }

    /// Promotion templates carrying `code` (any case), oldest first
    pub async fn find_templates<'e, E: SqliteExecutor<'e>>(
        exec: E,
        code: &str,
    ) -> PersistenceResult<Vec<Bonus>> {
        let rows = sqlx::query_as::<_, BonusRow>(
            "SELECT * FROM bonuses WHERE code = ? COLLATE NOCASE AND status = ? ORDER BY created_at, rowid",
        )
        .bind(code.trim())
        .bind(BonusStatus::Pending.as_str())
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// Whether the user already owns a bonus with this code (any case)
    pub async fn user_has_code<'e, E: SqliteExecutor<'e>>(
        exec: E,
        user_id: &str,
        code: &str,
    ) -> PersistenceResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bonuses WHERE user_id = ? AND code = ? COLLATE NOCASE AND status != ?",
        )
        .bind(user_id)
        .bind(code.trim())
        .bind(BonusStatus::Pending.as_str())
        .fetch_one(exec)
        .await?;
        Ok(row.0 > 0)
    }
}

// ============================================================================
// Audit Log Repository
// ============================================================================

/// Repository for the audit_logs table (append only)
pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, log: &AuditLog) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id, details,
                                    ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.user_id)
        .bind(log.action.as_str())
        .bind(log.entity_type.map(|e| e.as_str()))
        .bind(&log.entity_id)
        .bind(to_json("details", &log.details)?)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(log.created_at)
        .execute(exec)
        .await?;
        Ok(())
    }

    /// Most recent entries, newest first
    pub async fn list_recent<'e, E: SqliteExecutor<'e>>(exec: E, limit: i64) -> PersistenceResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT * FROM audit_logs ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    /// Entries written by or about a user, in order
    pub async fn list_by_user<'e, E: SqliteExecutor<'e>>(exec: E, user_id: &str) -> PersistenceResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT * FROM audit_logs WHERE user_id = ? OR (entity_type = 'user' AND entity_id = ?) \
             ORDER BY created_at, rowid",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    pub async fn list_by_entity<'e, E: SqliteExecutor<'e>>(
        exec: E,
        entity_type: EntityType,
        entity_id: &str,
    ) -> PersistenceResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT * FROM audit_logs WHERE entity_type = ? AND entity_id = ? ORDER BY created_at, rowid",
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_all(exec)
        .await?;
        convert_all(rows)
    }

    pub async fn count<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(exec)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Database initialization
// ============================================================================

fn connect_options(database_url: &str, busy_timeout: Duration) -> PersistenceResult<SqliteConnectOptions> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout))
}

/// Open a pool on an existing database
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    busy_timeout: Duration,
) -> PersistenceResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options(database_url, busy_timeout)?)
        .await?;
    Ok(pool)
}

/// Apply embedded migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Create (if missing) and migrate a database
pub async fn init_database(
    database_url: &str,
    max_connections: u32,
    busy_timeout: Duration,
) -> PersistenceResult<SqlitePool> {
    let pool = create_pool(database_url, max_connections, busy_timeout).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("test.db").display());
        let pool = init_database(&url, 2, Duration::from_secs(5)).await.unwrap();
        (dir, pool)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn user(username: &str) -> User {
        User::new(
            uuid::Uuid::new_v4().to_string(),
            username,
            &format!("{}@example.com", username),
            "Test User",
        )
        .with_created_at(t0())
    }

    fn entry(user_id: &str, tx_type: TransactionType, amount: Decimal, before: Decimal, at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry::new(
            uuid::Uuid::new_v4().to_string(),
            user_id,
            tx_type,
            amount,
            before,
            before + amount,
            at,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_user_roundtrip_and_lookup() {
        let (_dir, pool) = setup().await;
        let maria = user("maria");
        UserRepo::insert(&pool, &maria).await.unwrap();

        let loaded = UserRepo::get_by_id(&pool, &maria.id).await.unwrap();
        assert_eq!(loaded.username, "maria");
        assert_eq!(loaded.balance, Decimal::ZERO);
        assert_eq!(loaded.kyc_status, KycStatus::Pending);

        let found = UserRepo::find_by_username(&pool, "MARIA").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(maria.id.clone()));
        assert!(UserRepo::find_by_email(&pool, "nobody@example.com").await.unwrap().is_none());

        let duplicate = UserRepo::insert(&pool, &user("maria")).await;
        assert!(matches!(duplicate, Err(PersistenceError::UniqueViolation(_))));

        let missing = UserRepo::get_by_id(&pool, "nope").await;
        assert!(matches!(missing, Err(PersistenceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_balance_update_inside_transaction() {
        let (_dir, pool) = setup().await;
        let joao = user("joao");
        UserRepo::insert(&pool, &joao).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        UserRepo::lock_for_update(&mut *tx, &joao.id, t0()).await.unwrap();
        UserRepo::update_balance(&mut *tx, &joao.id, dec!(10.005), t0()).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(UserRepo::get_balance(&pool, &joao.id).await.unwrap(), Decimal::ZERO);

        UserRepo::update_balance(&pool, &joao.id, dec!(10.5), t0()).await.unwrap();
        assert_eq!(UserRepo::get_balance(&pool, &joao.id).await.unwrap(), dec!(10.50));

        assert!(UserRepo::lock_for_update(&pool, "ghost", t0()).await.is_err());
    }

    #[tokio::test]
    async fn test_ledger_queries() {
        let (_dir, pool) = setup().await;
        let ana = user("ana");
        UserRepo::insert(&pool, &ana).await.unwrap();

        let deposit = entry(&ana.id, TransactionType::Deposit, dec!(100), dec!(0), t0());
        let stake = entry(&ana.id, TransactionType::BetStake, dec!(-30), dec!(100), t0());
        let withdrawal = entry(&ana.id, TransactionType::Withdraw, dec!(-20), dec!(70), t0() + ChronoDuration::minutes(5))
            .with_status(TransactionStatus::Pending);
        for e in [&deposit, &stake, &withdrawal] {
            TransactionRepo::insert(&pool, e).await.unwrap();
        }

        let history = TransactionRepo::history(&pool, &ana.id).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![deposit.id.as_str(), stake.id.as_str(), withdrawal.id.as_str()]);

        let latest = TransactionRepo::list_by_user(&pool, &ana.id, 1).await.unwrap();
        assert_eq!(latest[0].id, withdrawal.id);

        assert_eq!(TransactionRepo::sum_by_user(&pool, &ana.id).await.unwrap(), dec!(50));
        let since = t0() + ChronoDuration::minutes(1);
        assert_eq!(TransactionRepo::count_since(&pool, &ana.id, since).await.unwrap(), 1);
        assert_eq!(TransactionRepo::list_since(&pool, &ana.id, t0()).await.unwrap().len(), 3);

        let open = TransactionRepo::list_open_withdrawals(&pool).await.unwrap();
        assert_eq!(open.len(), 1);

        TransactionRepo::update_status(&pool, &withdrawal.id, TransactionStatus::Completed, Some(since))
            .await
            .unwrap();
        assert!(TransactionRepo::list_open_withdrawals(&pool).await.unwrap().is_empty());
        let done = TransactionRepo::get_by_id(&pool, &withdrawal.id).await.unwrap();
        assert_eq!(done.status, TransactionStatus::Completed);
        assert_eq!(done.completed_at, Some(since));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_owned_rows() {
        let (_dir, pool) = setup().await;
        let pedro = user("pedro");
        UserRepo::insert(&pool, &pedro).await.unwrap();
        let deposit = entry(&pedro.id, TransactionType::Deposit, dec!(25), dec!(0), t0());
        TransactionRepo::insert(&pool, &deposit).await.unwrap();

        UserRepo::delete(&pool, &pedro.id).await.unwrap();

        assert!(matches!(
            TransactionRepo::get_by_id(&pool, &deposit.id).await,
            Err(PersistenceError::NotFound { .. })
        ));
        assert!(UserRepo::delete(&pool, &pedro.id).await.is_err());
    }
}
