//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables, and conversions into the
//! core domain types. Schema lives in migrations/20260301000000_init.sql.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use pandaloto_core::{
    AlertStatus, AlertType, AuditAction, AuditLog, Bet, BetStatus, Bonus, BonusStatus, BonusType,
    DocumentType, EntityType, FraudAlert, GameType, KycDocument, KycStatus, LedgerEntry,
    PaymentMethod, Role, Severity, TransactionStatus, TransactionType, User,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// === Helpers ===

pub(crate) fn parse_decimal(value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|e| PersistenceError::InvalidDecimal(format!("{}: {}", value, e)))
}

pub(crate) fn parse_enum<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> PersistenceResult<T> {
    parse(value).ok_or_else(|| PersistenceError::invalid_enum(field, value))
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    field: &'static str,
    value: &str,
) -> PersistenceResult<T> {
    serde_json::from_str(value).map_err(|source| PersistenceError::InvalidJson { field, source })
}

pub(crate) fn to_json<T: Serialize>(field: &'static str, value: &T) -> PersistenceResult<String> {
    serde_json::to_string(value).map_err(|source| PersistenceError::InvalidJson { field, source })
}

/// Row type for the `users` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub balance: String, // Decimal stored as TEXT
    pub kyc_status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for the `transactions` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: String,
    pub user_id: String,
    pub tx_type: String,
    pub amount: String,
    pub balance_before: String,
    pub balance_after: String,
    pub status: String,
    pub payment_method: Option<String>,
    pub metadata: Option<String>, // JSON
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Row type for the `bets` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BetRow {
    pub id: String,
    pub user_id: String,
    pub transaction_id: String,
    pub game_type: String,
    pub game_id: Option<String>,
    pub amount: String,
    pub potential_win: String,
    pub actual_win: String,
    pub status: String,
    pub game_data: Option<String>, // JSON
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Row type for the `kyc_documents` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct KycDocumentRow {
    pub id: String,
    pub user_id: String,
    pub document_type: String,
    pub file_url: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row type for the `fraud_alerts` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct FraudAlertRow {
    pub id: String,
    pub user_id: String,
    pub alert_type: String,
    pub severity: String,
    pub status: String,
    pub details: String, // JSON
    pub triggered_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Row type for the `bonuses` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BonusRow {
    pub id: String,
    pub user_id: String,
    pub bonus_type: String,
    pub amount: String,
    pub wager_requirement: String,
    pub current_wager: String,
    pub status: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row type for the `audit_logs` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditLogRow {
    pub id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub details: String, // JSON
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

// === Conversion implementations ===

impl TryFrom<UserRow> for User {
    type Error = PersistenceError;

    fn try_from(row: UserRow) -> PersistenceResult<Self> {
        Ok(User {
            role: parse_enum("role", &row.role, Role::from_str)?,
            balance: parse_decimal(&row.balance)?,
            kyc_status: parse_enum("kyc_status", &row.kyc_status, KycStatus::from_str)?,
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            cpf: row.cpf,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<TransactionRow> for LedgerEntry {
    type Error = PersistenceError;

    fn try_from(row: TransactionRow) -> PersistenceResult<Self> {
        let tx_type = parse_enum("tx_type", &row.tx_type, TransactionType::from_str)?;
        let mut entry = LedgerEntry::new(
            row.id,
            &row.user_id,
            tx_type,
            parse_decimal(&row.amount)?,
            parse_decimal(&row.balance_before)?,
            parse_decimal(&row.balance_after)?,
            row.created_at,
        )?
        .with_status(parse_enum("status", &row.status, TransactionStatus::from_str)?)
        .with_description(row.description);

        if let Some(method) = row.payment_method.as_deref() {
            entry = entry.with_payment_method(parse_enum("payment_method", method, PaymentMethod::from_str)?);
        }
        if let Some(metadata) = row.metadata.as_deref() {
            entry = entry.with_metadata(parse_json("metadata", metadata)?);
        }
        entry.completed_at = row.completed_at;
        Ok(entry)
    }
}

impl TryFrom<BetRow> for Bet {
    type Error = PersistenceError;

    fn try_from(row: BetRow) -> PersistenceResult<Self> {
        Ok(Bet {
            game_type: parse_enum("game_type", &row.game_type, GameType::from_str)?,
            amount: parse_decimal(&row.amount)?,
            potential_win: parse_decimal(&row.potential_win)?,
            actual_win: parse_decimal(&row.actual_win)?,
            status: parse_enum("status", &row.status, BetStatus::from_str)?,
            game_data: row
                .game_data
                .as_deref()
                .map(|raw| parse_json("game_data", raw))
                .transpose()?,
            id: row.id,
            user_id: row.user_id,
            transaction_id: row.transaction_id,
            game_id: row.game_id,
            placed_at: row.placed_at,
            settled_at: row.settled_at,
        })
    }
}

impl TryFrom<KycDocumentRow> for KycDocument {
    type Error = PersistenceError;

    fn try_from(row: KycDocumentRow) -> PersistenceResult<Self> {
        Ok(KycDocument {
            document_type: parse_enum("document_type", &row.document_type, DocumentType::from_str)?,
            status: parse_enum("status", &row.status, KycStatus::from_str)?,
            id: row.id,
            user_id: row.user_id,
            file_url: row.file_url,
            rejection_reason: row.rejection_reason,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<FraudAlertRow> for FraudAlert {
    type Error = PersistenceError;

    fn try_from(row: FraudAlertRow) -> PersistenceResult<Self> {
        Ok(FraudAlert {
            alert_type: parse_enum("alert_type", &row.alert_type, AlertType::from_str)?,
            severity: parse_enum("severity", &row.severity, Severity::from_str)?,
            status: parse_enum("status", &row.status, AlertStatus::from_str)?,
            details: parse_json("details", &row.details)?,
            id: row.id,
            user_id: row.user_id,
            triggered_at: row.triggered_at,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            notes: row.notes,
        })
    }
}

impl TryFrom<BonusRow> for Bonus {
    type Error = PersistenceError;

    fn try_from(row: BonusRow) -> PersistenceResult<Self> {
        Ok(Bonus {
            bonus_type: parse_enum("bonus_type", &row.bonus_type, BonusType::from_str)?,
            amount: parse_decimal(&row.amount)?,
            wager_requirement: parse_decimal(&row.wager_requirement)?,
            current_wager: parse_decimal(&row.current_wager)?,
            status: parse_enum("status", &row.status, BonusStatus::from_str)?,
            id: row.id,
            user_id: row.user_id,
            code: row.code,
            description: row.description,
            expires_at: row.expires_at,
            applied_at: row.applied_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<AuditLogRow> for AuditLog {
    type Error = PersistenceError;

    fn try_from(row: AuditLogRow) -> PersistenceResult<Self> {
        Ok(AuditLog {
            action: parse_enum("action", &row.action, AuditAction::from_str)?,
            entity_type: row
                .entity_type
                .as_deref()
                .map(|e| parse_enum("entity_type", e, EntityType::from_str))
                .transpose()?,
            details: parse_json("details", &row.details)?,
            id: row.id,
            user_id: row.user_id,
            entity_id: row.entity_id,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
        })
    }
}

/// Convert a batch of rows, failing on the first bad one
pub fn convert_all<R, T>(rows: Vec<R>) -> PersistenceResult<Vec<T>>
where
    T: TryFrom<R, Error = PersistenceError>,
{
    rows.into_iter().map(T::try_from).collect()
}
