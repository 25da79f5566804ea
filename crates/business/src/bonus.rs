//! Bonus operations - promo codes, promotions and wagering progress
//!
//! Admin promotions are stored as bonus templates (`status = pending`, owned
//! by the creating admin). Redeeming a code copies the template into an
//! `active` bonus owned by the player and credits its amount.
//!
//! Wagering is tracked, not enforced: `current_wager` is never incremented
//! and bonuses never move to `used` or `expired` on their own.

use crate::config::BonusConfig;
use crate::error::{BusinessError, BusinessResult};
use crate::fraud::FraudEngine;
use crate::ledger::{BalanceChange, BalanceMutator};
use crate::services::{ensure_can_act_on, require_admin, ServiceContext};
use chrono::{DateTime, Utc};
use pandaloto_core::{
    AuditAction, AuditLog, Bonus, BonusStatus, BonusType, EntityType, LedgerEntry,
    PromotionDraft, RequestContext, TransactionMetadata, TransactionType,
};
use pandaloto_persistence::{AuditLogRepo, BonusRepo, UserRepo};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqliteConnection;

pub const WELCOME_BONUS_DESCRIPTION: &str = "Bônus de boas-vindas! Aposte R$100 para sacar.";

#[derive(Serialize)]
struct PromoApplied<'a> {
    code: &'a str,
    amount: Decimal,
    wager_requirement: Decimal,
    transaction_id: &'a str,
}

#[derive(Serialize)]
struct PromotionCreated<'a> {
    bonus_type: BonusType,
    amount: Decimal,
    wager_requirement: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Wagering progress of one bonus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusProgress {
    pub bonus_id: String,
    pub current_wager: Decimal,
    pub wager_requirement: Decimal,
    /// Percent, 0 to 100
    pub progress: Decimal,
}

impl From<&Bonus> for BonusProgress {
    fn from(bonus: &Bonus) -> Self {
        Self {
            bonus_id: bonus.id.clone(),
            current_wager: bonus.current_wager,
            wager_requirement: bonus.wager_requirement,
            progress: bonus.progress(),
        }
    }
}

/// Grant the welcome bonus inside an open registration transaction.
///
/// Returns `None` when the configured amount is zero.
pub(crate) async fn grant_welcome(
    conn: &mut SqliteConnection,
    ctx: &ServiceContext,
    config: &BonusConfig,
    user_id: &str,
    now: DateTime<Utc>,
) -> BusinessResult<Option<(Bonus, LedgerEntry)>> {
    if config.welcome_amount <= Decimal::ZERO {
        return Ok(None);
    }

    let bonus = Bonus::granted(
        ctx.next_id(),
        user_id,
        BonusType::Welcome,
        config.welcome_amount,
        config.welcome_wager_requirement,
        now,
    )
    .with_description(WELCOME_BONUS_DESCRIPTION);
    BonusRepo::insert(&mut *conn, &bonus).await?;

    let change = BalanceChange::credit(user_id, TransactionType::Bonus, bonus.amount)?
        .with_metadata(TransactionMetadata::bonus(&bonus.id, None))
        .with_description("Bônus de boas-vindas");
    let entry = BalanceMutator::apply(&mut *conn, &change, ctx.next_id(), now).await?;

    Ok(Some((bonus, entry)))
}

/// Bonus Service - promo redemption and promotion management
pub struct BonusService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BonusService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Redeem a promo code for `user_id`.
    ///
    /// Codes match case-insensitively. Each user may redeem a code once;
    /// the same template serves any number of users.
    pub async fn apply_promo_code(
        &self,
        req: &RequestContext,
        user_id: &str,
        code: &str,
    ) -> BusinessResult<Bonus> {
        ensure_can_act_on(req, user_id)?;

        let code = code.trim();
        if code.is_empty() {
            return Err(BusinessError::Validation("promo code is required".to_string()));
        }

        let now = self.ctx.now();
        let mut tx = self.ctx.pool().begin().await?;

        // taken before the single-use check
        UserRepo::lock_for_update(&mut *tx, user_id, now).await?;

        let template = BonusRepo::find_templates(&mut *tx, code)
            .await?
            .into_iter()
            .find(|t| t.is_claimable(now))
            .ok_or_else(|| BusinessError::PromoCodeNotFound(code.to_string()))?;

        if BonusRepo::user_has_code(&mut *tx, user_id, code).await? {
            tracing::warn!(user = %user_id, code = %code, "promo code already used");
            return Err(BusinessError::PromoCodeAlreadyUsed(code.to_string()));
        }

        let bonus = Bonus::claim(&template, self.ctx.next_id(), user_id, now);
        BonusRepo::insert(&mut *tx, &bonus).await?;

        let change = BalanceChange::credit(user_id, TransactionType::Bonus, bonus.amount)?
            .with_metadata(TransactionMetadata::bonus(&bonus.id, bonus.code.clone()))
            .with_description(format!(
                "Bônus: {}",
                bonus.description.as_deref().unwrap_or("Promoção")
            ));
        let entry = BalanceMutator::apply(&mut tx, &change, self.ctx.next_id(), now).await?;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::PromoCodeApplied, now)
            .by(req)
            .on(EntityType::Bonus, &bonus.id)
            .with_details(&PromoApplied {
                code: bonus.code.as_deref().unwrap_or(code),
                amount: bonus.amount,
                wager_requirement: bonus.wager_requirement,
                transaction_id: &entry.id,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(user = %user_id, bonus = %bonus.id, amount = %bonus.amount, "promo code applied");

        FraudEngine::new(self.ctx).after_event(user_id).await;
        Ok(bonus)
    }

    /// Publish a promotion template (admin only)
    pub async fn create_promotion(&self, req: &RequestContext, draft: PromotionDraft) -> BusinessResult<Bonus> {
        require_admin(req)?;

        let now = self.ctx.now();
        let template = draft.into_template(self.ctx.next_id(), &req.actor_id, now)?;

        let mut tx = self.ctx.pool().begin().await?;

        if let Some(code) = template.code.as_deref() {
            let taken = BonusRepo::find_templates(&mut *tx, code)
                .await?
                .iter()
                .any(|t| !t.is_expired(now));
            if taken {
                return Err(BusinessError::Validation(format!(
                    "a live promotion already uses code {}",
                    code
                )));
            }
        }

        BonusRepo::insert(&mut *tx, &template).await?;

        let audit = AuditLog::new(self.ctx.next_id(), AuditAction::PromotionCreated, now)
            .by(req)
            .on(EntityType::Bonus, &template.id)
            .with_details(&PromotionCreated {
                bonus_type: template.bonus_type,
                amount: template.amount,
                wager_requirement: template.wager_requirement,
                code: template.code.as_deref(),
                expires_at: template.expires_at,
            });
        AuditLogRepo::insert(&mut *tx, &audit).await?;
        tx.commit().await?;

        tracing::info!(bonus = %template.id, code = ?template.code, "promotion created");
        Ok(template)
    }

    /// Bonuses owned by a user, optionally filtered by status
    pub async fn bonuses(
        &self,
        req: &RequestContext,
        user_id: &str,
        status: Option<BonusStatus>,
    ) -> BusinessResult<Vec<Bonus>> {
        ensure_can_act_on(req, user_id)?;
        Ok(BonusRepo::list_by_user(self.ctx.pool(), user_id, status).await?)
    }

    /// Every bonus and template (admin only)
    pub async fn all_bonuses(&self, req: &RequestContext) -> BusinessResult<Vec<Bonus>> {
        require_admin(req)?;
        Ok(BonusRepo::list_all(self.ctx.pool()).await?)
    }

    pub async fn progress(&self, req: &RequestContext, bonus_id: &str) -> BusinessResult<BonusProgress> {
        let bonus = BonusRepo::get_by_id(self.ctx.pool(), bonus_id).await?;
        ensure_can_act_on(req, &bonus.user_id)?;
        Ok(BonusProgress::from(&bonus))
    }
}
