//! # Bonus Module
//!
//! Promotional credit and wagering progress.
//!
//! Admin promotions are stored as bonus rows with status `pending`. They act as
//! templates: each user claiming the code gets a separate `active` copy.

use crate::error::{CoreError, CoreResult};
use crate::money::{to_cents, validate_amount, validate_non_negative};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusType {
    Welcome,
    DepositMatch,
    Cashback,
    Promotion,
    Referral,
}

impl BonusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusType::Welcome => "welcome",
            BonusType::DepositMatch => "deposit_match",
            BonusType::Cashback => "cashback",
            BonusType::Promotion => "promotion",
            BonusType::Referral => "referral",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "welcome" => Some(BonusType::Welcome),
            "deposit_match" => Some(BonusType::DepositMatch),
            "cashback" => Some(BonusType::Cashback),
            "promotion" => Some(BonusType::Promotion),
            "referral" => Some(BonusType::Referral),
            _ => None,
        }
    }

    /// Types an admin may publish as a promotion
    pub fn is_promotable(&self) -> bool {
        matches!(
            self,
            BonusType::Promotion | BonusType::DepositMatch | BonusType::Cashback
        )
    }
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusStatus {
    /// Template, claimable through its code
    Pending,
    Active,
    Used,
    Expired,
    Cancelled,
}

impl BonusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusStatus::Pending => "pending",
            BonusStatus::Active => "active",
            BonusStatus::Used => "used",
            BonusStatus::Expired => "expired",
            BonusStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BonusStatus::Pending),
            "active" => Some(BonusStatus::Active),
            "used" => Some(BonusStatus::Used),
            "expired" => Some(BonusStatus::Expired),
            "cancelled" => Some(BonusStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BonusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bonus {
    pub id: String,
    /// Owner; for templates this is the admin who created it
    pub user_id: String,
    pub bonus_type: BonusType,
    pub amount: Decimal,
    pub wager_requirement: Decimal,
    pub current_wager: Decimal,
    pub status: BonusStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bonus {
    /// An active bonus credited to `user_id` right now
    pub fn granted(
        id: String,
        user_id: &str,
        bonus_type: BonusType,
        amount: Decimal,
        wager_requirement: Decimal,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            bonus_type,
            amount: to_cents(amount),
            wager_requirement: to_cents(wager_requirement),
            current_wager: Decimal::new(0, 2),
            status: BonusStatus::Active,
            code: None,
            description: None,
            expires_at: None,
            applied_at: Some(at),
            created_at: at,
        }
    }

    /// Copy of a promotion template owned by the claiming user
    pub fn claim(template: &Bonus, id: String, user_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            code: template.code.clone(),
            description: template.description.clone(),
            ..Self::granted(
                id,
                user_id,
                template.bonus_type,
                template.amount,
                template.wager_requirement,
                at,
            )
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Wagering progress in percent, capped at 100.
    ///
    /// A zero requirement counts as complete.
    pub fn progress(&self) -> Decimal {
        wager_progress(self.current_wager, self.wager_requirement)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// A template that can still be claimed
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.status == BonusStatus::Pending && self.code.is_some() && !self.is_expired(now)
    }

    pub fn code_matches(&self, code: &str) -> bool {
        self.code
            .as_deref()
            .map(|c| c.eq_ignore_ascii_case(code.trim()))
            .unwrap_or(false)
    }
}

impl fmt::Display for Bonus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bonus {} ({}, {}, {}%)",
            self.id,
            self.bonus_type,
            self.amount,
            self.progress()
        )
    }
}

/// `min(current / requirement, 1) * 100`, rounded to 2 places.
pub fn wager_progress(current: Decimal, requirement: Decimal) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    if requirement <= Decimal::ZERO {
        return to_cents(hundred);
    }
    let ratio = (current / requirement).min(Decimal::ONE).max(Decimal::ZERO);
    to_cents(ratio * hundred)
}

/// Normalize a promo code for storage.
pub fn normalize_code(code: &str) -> CoreResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CoreError::ValidationError("promo code is empty".to_string()));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(CoreError::ValidationError(format!(
            "promo code has invalid characters: {}",
            code
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Input for a new admin promotion.
#[derive(Debug, Clone)]
pub struct PromotionDraft {
    pub bonus_type: BonusType,
    pub amount: Decimal,
    pub wager_requirement: Decimal,
    pub code: Option<String>,
    pub description: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PromotionDraft {
    /// Validate and turn into a claimable template owned by `admin_id`.
    pub fn into_template(self, id: String, admin_id: &str, at: DateTime<Utc>) -> CoreResult<Bonus> {
        if !self.bonus_type.is_promotable() {
            return Err(CoreError::ValidationError(format!(
                "bonus type {} cannot be published as a promotion",
                self.bonus_type
            )));
        }
        let amount = validate_amount(self.amount)?;
        let wager_requirement = validate_non_negative(self.wager_requirement)?;
        let code = self.code.as_deref().map(normalize_code).transpose()?;
        if self.description.trim().is_empty() {
            return Err(CoreError::ValidationError("description is required".to_string()));
        }

        Ok(Bonus {
            id,
            user_id: admin_id.to_string(),
            bonus_type: self.bonus_type,
            amount,
            wager_requirement,
            current_wager: Decimal::new(0, 2),
            status: BonusStatus::Pending,
            code,
            description: Some(self.description),
            expires_at: self.expires_at,
            applied_at: None,
            created_at: at,
        })
    }
}
