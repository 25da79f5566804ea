//! Admin operations - fraud review, user management, withdrawals, analytics
//!
//! Every method requires an admin [`RequestContext`].

use crate::error::{BusinessError, BusinessResult};
use crate::fraud::FraudEngine;
use crate::ledger::{BalanceChange, BalanceMutator};
use crate::services::{require_admin, ServiceContext};
use pandaloto_core::{
    AlertStatus, AuditAction, AuditLog, EntityType, FraudAlert, LedgerEntry, RequestContext,
    TransactionMetadata, TransactionStatus, TransactionType, User,
};
use pandaloto_persistence::{
    AnalyticsOverview, AnalyticsRepo, AuditLogRepo, FraudAlertRepo, PlatformStats, TimePeriod,
    TimeSeriesPoint, TopUser, TransactionRepo, UserRepo,
};
use serde::Serialize;

/// Upper bound for `top_users`
pub const MAX_TOP_USERS: i64 = 100;

#[derive(Serialize)]
struct AlertReviewed<'a> {
    status: AlertStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    user_id: &'a str,
}

#[derive(Serialize)]
struct UserChanged<'a> {
    username: &'a str,
    by: &'a str,
}

#[derive(Serialize)]
struct WithdrawalUpdated<'a> {
    from: TransactionStatus,
    to: TransactionStatus,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    refund_transaction_id: Option<&'a str>,
}

/// Result of processing a withdrawal
#[derive(Debug, Clone)]
pub struct WithdrawalUpdate {
    pub withdrawal: LedgerEntry,
    /// Compensating credit when the withdrawal failed or was cancelled
    pub refund: Option<LedgerEntry>,
}

/// Admin Service - review queues, user management and reporting
pub struct AdminService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AdminService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // === Fraud alerts ===

    /// Move an alert to `investigating`, `resolved` or `false_positive`
    pub async fn review_fraud_alert(
        &self,
        req: &RequestContext,
        alert_id: &str,
        status: AlertStatus,
        notes: Option<String>,
    ) -> BusinessResult<FraudAlert> {
        require_admin(req)?;

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;

        let mut alert = FraudAlertRepo::get_by_id(&mut *tx, alert_id).await?;
        alert.review(status, notes, &req.actor_id, now);
        FraudAlertRepo::update_review(&mut *tx, &alert).await?;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::FraudAlertReviewed, now)
            .by(req)
            .on(EntityType::FraudAlert, &alert.id)
            .with_details(&AlertReviewed {
                status: alert.status,
                notes: alert.notes.as_deref(),
                user_id: &alert.user_id,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(alert = %alert.id, status = %alert.status, reviewer = %req.actor_id, "fraud alert reviewed");
        Ok(alert)
    }

    /// Alerts newest first, optionally filtered by status
    pub async fn list_fraud_alerts(
        &self,
        req: &RequestContext,
        status: Option<AlertStatus>,
    ) -> BusinessResult<Vec<FraudAlert>> {
        require_admin(req)?;
        Ok(FraudAlertRepo::list(self.ctx.pool(), status).await?)
    }

    // === Users ===

    pub async fn list_users(&self, req: &RequestContext) -> BusinessResult<Vec<User>> {
        require_admin(req)?;
        Ok(UserRepo::get_all(self.ctx.pool()).await?)
    }

    pub async fn suspend_user(&self, req: &RequestContext, user_id: &str) -> BusinessResult<User> {
        self.set_active(req, user_id, false).await
    }

    pub async fn activate_user(&self, req: &RequestContext, user_id: &str) -> BusinessResult<User> {
        self.set_active(req, user_id, true).await
    }

    async fn set_active(&self, req: &RequestContext, user_id: &str, active: bool) -> BusinessResult<User> {
        require_admin(req)?;

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;

        UserRepo::set_active(&mut *tx, user_id, active, now).await?;
        let user = UserRepo::get_by_id(&mut *tx, user_id).await?;

        let action = if active {
            AuditAction::UserActivated
        } else {
            AuditAction::UserSuspended
        };
        let audit = AuditLog::new(self.ctx.next_id(), action, now)
            .by(req)
            .on(EntityType::User, &user.id)
            .with_details(&UserChanged {
                username: &user.username,
                by: &req.actor_id,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(user = %user.id, active, admin = %req.actor_id, "user status changed");
        Ok(user)
    }

    /// Delete a player and everything they own. Admins cannot be deleted.
    pub async fn delete_user(&self, req: &RequestContext, user_id: &str) -> BusinessResult<()> {
        require_admin(req)?;

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;

        let user = UserRepo::get_by_id(&mut *tx, user_id).await?;
        if user.is_admin() {
            tracing::warn!(user = %user.id, admin = %req.actor_id, "refused to delete an admin");
            return Err(BusinessError::forbidden("admin users cannot be deleted"));
        }

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::UserDeleted, now)
            .by(req)
            .on(EntityType::User, &user.id)
            .with_details(&UserChanged {
                username: &user.username,
                by: &req.actor_id,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        UserRepo::delete(&mut *tx, &user.id).await?;
        tx.commit().await?;

        tracing::info!(user = %user.id, admin = %req.actor_id, "user deleted");
        Ok(())
    }

    // === Withdrawals ===

    /// Withdrawals still `pending` or `processing`, oldest first
    pub async fn open_withdrawals(&self, req: &RequestContext) -> BusinessResult<Vec<LedgerEntry>> {
        require_admin(req)?;
        Ok(TransactionRepo::list_open_withdrawals(self.ctx.pool()).await?)
    }

    /// Advance a withdrawal. `failed` and `cancelled` credit the amount
    /// back with an `adjustment` entry in the same transaction.
    pub async fn update_withdrawal_status(
        &self,
        req: &RequestContext,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> BusinessResult<WithdrawalUpdate> {
        require_admin(req)?;

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;

        let mut withdrawal = TransactionRepo::get_by_id(&mut *tx, transaction_id).await?;
        if withdrawal.tx_type != TransactionType::Withdraw {
            return Err(BusinessError::Validation(format!(
                "transaction {} is a {}, not a withdrawal",
                withdrawal.id, withdrawal.tx_type
            )));
        }

        let from = withdrawal.status;
        let to = from.transition_to(status)?;

        let refund = if to.returns_funds() {
            let change = BalanceChange::credit(&withdrawal.user_id, TransactionType::Adjustment, withdrawal.magnitude())?
                .with_metadata(TransactionMetadata::reversal(&withdrawal.id, to.as_str()))
                .with_description("Estorno de saque")
                .allow_inactive();
            Some(BalanceMutator::apply(&mut tx, &change, self.ctx.next_id(), now).await?)
        } else {
            None
        };

        let completed_at = if to.is_final() { Some(now) } else { None };
        TransactionRepo::update_status(&mut *tx, &withdrawal.id, to, completed_at).await?;
        withdrawal.status = to;
        withdrawal.completed_at = completed_at;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::WithdrawalStatusUpdated, now)
            .by(req)
            .on(EntityType::Transaction, &withdrawal.id)
            .with_details(&WithdrawalUpdated {
                from,
                to,
                user_id: &withdrawal.user_id,
                refund_transaction_id: refund.as_ref().map(|r| r.id.as_str()),
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(tx = %withdrawal.id, from = %from, to = %to, admin = %req.actor_id, "withdrawal updated");

        if refund.is_some() {
            FraudEngine::new(self.ctx).after_event(&withdrawal.user_id).await;
        }
        Ok(WithdrawalUpdate { withdrawal, refund })
    }

    // === Reporting ===

    pub async fn analytics_overview(&self, req: &RequestContext) -> BusinessResult<AnalyticsOverview> {
        require_admin(req)?;
        Ok(AnalyticsRepo::overview(self.ctx.pool()).await?)
    }

    /// Biggest wagerers, `limit` clamped to 1..=100
    pub async fn top_users(&self, req: &RequestContext, limit: i64) -> BusinessResult<Vec<TopUser>> {
        require_admin(req)?;
        Ok(AnalyticsRepo::top_users(self.ctx.pool(), limit.clamp(1, MAX_TOP_USERS)).await?)
    }

    pub async fn transaction_time_series(
        &self,
        req: &RequestContext,
        period: TimePeriod,
    ) -> BusinessResult<Vec<TimeSeriesPoint>> {
        require_admin(req)?;
        Ok(AnalyticsRepo::time_series(self.ctx.pool(), period, self.ctx.now()).await?)
    }

    pub async fn platform_stats(&self, req: &RequestContext) -> BusinessResult<PlatformStats> {
        require_admin(req)?;
        Ok(AnalyticsRepo::platform_stats(self.ctx.pool(), self.ctx.now()).await?)
    }

    /// Latest audit entries, newest first
    pub async fn audit_trail(&self, req: &RequestContext, limit: i64) -> BusinessResult<Vec<AuditLog>> {
        require_admin(req)?;
        Ok(AuditLogRepo::list_recent(self.ctx.pool(), limit).await?)
    }
}
