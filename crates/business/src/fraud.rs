//! Fraud engine
//!
//! Loads a user's recent ledger window, runs the pure rules from
//! `pandaloto_core::fraud` and stores one alert per detected pattern.
//! Only the velocity pre-check can refuse a request; everything else is
//! observational and never fails the caller.

use crate::error::{BusinessError, BusinessResult};
use crate::services::ServiceContext;
use pandaloto_core::fraud::{check_velocity, evaluate};
use pandaloto_core::{DetectedPattern, FraudAlert};
use pandaloto_persistence::{FraudAlertRepo, PersistenceResult, TransactionRepo};

/// Fraud Engine - velocity gate and post-event rule evaluation
pub struct FraudEngine<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FraudEngine<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Refuse a deposit or withdrawal that would exceed the velocity limit.
    ///
    /// Runs before any mutation. A trip records a `transaction_velocity`
    /// alert and returns `TooManyRequests`.
    pub async fn velocity_precheck(&self, user_id: &str) -> BusinessResult<()> {
        let thresholds = &self.ctx.config().fraud;
        let now = self.ctx.now();
        let existing =
            TransactionRepo::count_since(self.ctx.pool(), user_id, now - thresholds.velocity_window()).await?;

        let existing = existing.max(0) as usize;
        let Some(pattern) = check_velocity(existing, thresholds) else {
            return Ok(());
        };

        let count = existing + 1;
        tracing::warn!(user = %user_id, count, "velocity limit hit, request blocked");
        self.record(user_id, pattern).await;

        Err(BusinessError::TooManyRequests { count })
    }

    /// Re-evaluate every rule after a committed balance change.
    ///
    /// Returns the alerts that were stored. Load or store failures are
    /// logged and swallowed.
    pub async fn after_event(&self, user_id: &str) -> Vec<FraudAlert> {
        let patterns = match self.detect(user_id).await {
            Ok(patterns) => patterns,
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "fraud evaluation skipped");
                return Vec::new();
            }
        };

        let mut stored = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if let Some(alert) = self.record(user_id, pattern).await {
                stored.push(alert);
            }
        }
        stored
    }

    async fn detect(&self, user_id: &str) -> PersistenceResult<Vec<DetectedPattern>> {
        let thresholds = &self.ctx.config().fraud;
        let now = self.ctx.now();
        let window = TransactionRepo::list_since(self.ctx.pool(), user_id, now - thresholds.lookback()).await?;
        let patterns = evaluate(&window, now, thresholds);
        tracing::debug!(
            user = %user_id,
            entries = window.len(),
            hits = patterns.len(),
            "fraud rules evaluated"
        );
        Ok(patterns)
    }

    async fn record(&self, user_id: &str, pattern: DetectedPattern) -> Option<FraudAlert> {
        let alert = FraudAlert::from_pattern(self.ctx.next_id(), user_id, pattern, self.ctx.now());
        match FraudAlertRepo::insert(self.ctx.pool(), &alert).await {
            Ok(()) => {
                tracing::info!(
                    user = %user_id,
                    alert = %alert.id,
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    "fraud alert raised"
                );
                Some(alert)
            }
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "failed to store fraud alert");
                None
            }
        }
    }
}
