//! Service context and shared helpers
//!
//! Every service borrows a [`ServiceContext`]: the connection pool, the
//! platform configuration and the clock. Identity never lives here; it is
//! passed to each operation as a [`RequestContext`].

use crate::config::PlatformConfig;
use crate::error::{BusinessError, BusinessResult};
use chrono::{DateTime, Duration, Utc};
use pandaloto_core::{FraudAlert, LedgerEntry, RequestContext};
use pandaloto_persistence::Database;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};

// ============================================================================
// Clock
// ============================================================================

/// Source of "now" for every timestamp the services write
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// Service context
// ============================================================================

/// Context for business operations - database access, config and clock
#[derive(Clone)]
pub struct ServiceContext {
    pool: SqlitePool,
    config: Arc<PlatformConfig>,
    clock: Arc<dyn Clock>,
}

impl ServiceContext {
    /// Create new service context from database
    pub fn new(db: &Database, config: PlatformConfig) -> Self {
        Self::from_parts(db.pool().clone(), config)
    }

    /// Create from pool directly
    pub fn from_parts(pool: SqlitePool, config: PlatformConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Generate a fresh record id
    pub fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// ============================================================================
// Authorization helpers
// ============================================================================

/// Fail with `Forbidden` unless the actor is an admin
pub fn require_admin(req: &RequestContext) -> BusinessResult<()> {
    if req.is_admin() {
        Ok(())
    } else {
        tracing::warn!(actor = %req.actor_id, "admin operation refused");
        Err(BusinessError::forbidden("admin role required"))
    }
}

/// Fail with `Forbidden` when a player acts on someone else's account
pub fn ensure_can_act_on(req: &RequestContext, user_id: &str) -> BusinessResult<()> {
    if req.can_act_on(user_id) {
        Ok(())
    } else {
        tracing::warn!(actor = %req.actor_id, target = %user_id, "cross-account operation refused");
        Err(BusinessError::forbidden("cannot act on another user's account"))
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of a balance-affecting operation
#[derive(Debug, Clone)]
pub struct TransactionResult {
    pub transaction: LedgerEntry,
    pub new_balance: Decimal,
    /// Alerts raised by the post-event fraud evaluation
    pub alerts: Vec<FraudAlert>,
}

impl TransactionResult {
    pub fn new(transaction: LedgerEntry) -> Self {
        Self {
            new_balance: transaction.balance_after,
            transaction,
            alerts: Vec::new(),
        }
    }

    pub fn with_alerts(mut self, alerts: Vec<FraudAlert>) -> Self {
        self.alerts = alerts;
        self
    }
}
