//! # Audit Module
//!
//! Audit trail records. One row is written for every state-changing action,
//! in the same database transaction as the change itself.

use crate::context::RequestContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Accounts
    UserRegistered,
    UserLogin,
    AdminCreated,
    UserSuspended,
    UserActivated,
    UserDeleted,
    // Money
    DepositCompleted,
    WithdrawalRequested,
    WithdrawalStatusUpdated,
    BetPlaced,
    // KYC
    KycDocumentUploaded,
    KycApproved,
    KycRejected,
    // Bonus
    PromoCodeApplied,
    PromotionCreated,
    // Fraud
    FraudAlertReviewed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "user_registered",
            AuditAction::UserLogin => "user_login",
            AuditAction::AdminCreated => "admin_created",
            AuditAction::UserSuspended => "user_suspended",
            AuditAction::UserActivated => "user_activated",
            AuditAction::UserDeleted => "user_deleted",
            AuditAction::DepositCompleted => "deposit_completed",
            AuditAction::WithdrawalRequested => "withdrawal_requested",
            AuditAction::WithdrawalStatusUpdated => "withdrawal_status_updated",
            AuditAction::BetPlaced => "bet_placed",
            AuditAction::KycDocumentUploaded => "kyc_document_uploaded",
            AuditAction::KycApproved => "kyc_approved",
            AuditAction::KycRejected => "kyc_rejected",
            AuditAction::PromoCodeApplied => "promo_code_applied",
            AuditAction::PromotionCreated => "promotion_created",
            AuditAction::FraudAlertReviewed => "fraud_alert_reviewed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user_registered" => Some(AuditAction::UserRegistered),
            "user_login" => Some(AuditAction::UserLogin),
            "admin_created" => Some(AuditAction::AdminCreated),
            "user_suspended" => Some(AuditAction::UserSuspended),
            "user_activated" => Some(AuditAction::UserActivated),
            "user_deleted" => Some(AuditAction::UserDeleted),
            "deposit_completed" => Some(AuditAction::DepositCompleted),
            "withdrawal_requested" => Some(AuditAction::WithdrawalRequested),
            "withdrawal_status_updated" => Some(AuditAction::WithdrawalStatusUpdated),
            "bet_placed" => Some(AuditAction::BetPlaced),
            "kyc_document_uploaded" => Some(AuditAction::KycDocumentUploaded),
            "kyc_approved" => Some(AuditAction::KycApproved),
            "kyc_rejected" => Some(AuditAction::KycRejected),
            "promo_code_applied" => Some(AuditAction::PromoCodeApplied),
            "promotion_created" => Some(AuditAction::PromotionCreated),
            "fraud_alert_reviewed" => Some(AuditAction::FraudAlertReviewed),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Kind of entity an audit row points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Transaction,
    Bet,
    KycDocument,
    Bonus,
    FraudAlert,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Transaction => "transaction",
            EntityType::Bet => "bet",
            EntityType::KycDocument => "kyc_document",
            EntityType::Bonus => "bonus",
            EntityType::FraudAlert => "fraud_alert",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(EntityType::User),
            "transaction" => Some(EntityType::Transaction),
            "bet" => Some(EntityType::Bet),
            "kyc_document" => Some(EntityType::KycDocument),
            "bonus" => Some(EntityType::Bonus),
            "fraud_alert" => Some(EntityType::FraudAlert),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    /// Acting user; `None` for system actions
    pub user_id: Option<String>,
    pub action: AuditAction,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(id: String, action: AuditAction, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: None,
            action,
            entity_type: None,
            entity_id: None,
            details: serde_json::Value::Null,
            ip_address: None,
            user_agent: None,
            created_at,
        }
    }

    /// Stamp actor, ip and user agent from the request
    pub fn by(mut self, ctx: &RequestContext) -> Self {
        self.user_id = Some(ctx.actor_id.clone());
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }

    pub fn on(mut self, entity_type: EntityType, entity_id: &str) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = serde_json::to_value(details).unwrap_or(serde_json::Value::Null);
        self
    }
}

impl fmt::Display for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} by {} on {}:{}",
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.action,
            self.user_id.as_deref().unwrap_or("system"),
            self.entity_type.map(|e| e.as_str()).unwrap_or("-"),
            self.entity_id.as_deref().unwrap_or("-"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Role;
    use serde_json::json;

    #[test]
    fn test_action_str() {
        assert_eq!(AuditAction::KycApproved.as_str(), "kyc_approved");
        assert_eq!(
            AuditAction::from_str("withdrawal_requested"),
            Some(AuditAction::WithdrawalRequested)
        );
        assert_eq!(AuditAction::from_str("user_logout"), None);
        assert_eq!(EntityType::from_str("kyc_document"), Some(EntityType::KycDocument));
    }

    #[test]
    fn test_builder() {
        let ctx = RequestContext::new("u-1", Role::User)
            .with_ip("10.0.0.1")
            .with_user_agent("curl/8");
        let log = AuditLog::new("a-1".to_string(), AuditAction::DepositCompleted, Utc::now())
            .by(&ctx)
            .on(EntityType::Transaction, "t-1")
            .with_details(&json!({"amount": "100.00", "method": "pix"}));

        assert_eq!(log.user_id.as_deref(), Some("u-1"));
        assert_eq!(log.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(log.details["method"], "pix");
        assert!(log.to_string().contains("deposit_completed by u-1 on transaction:t-1"));
    }
}
