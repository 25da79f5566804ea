//! # Fraud Module
//!
//! Fraud alerts and the heuristics that raise them.
//!
//! Rules are pure functions over a user's recent ledger entries:
//! - `rapid_deposits`: too many deposits in the trailing hour
//! - `excessive_withdrawals`: too many withdrawals in the trailing day
//! - `round_trip_transaction`: latest deposit and latest withdrawal too close together
//! - `transaction_velocity`: too many ledger entries of any type in the trailing minute
//!
//! Rules are independent. One event may trigger several alerts.

use crate::error::{CoreError, CoreResult};
use crate::ledger::{LedgerEntry, TransactionType};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// === Enums ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    RapidDeposits,
    ExcessiveWithdrawals,
    RoundTripTransaction,
    TransactionVelocity,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::RapidDeposits => "rapid_deposits",
            AlertType::ExcessiveWithdrawals => "excessive_withdrawals",
            AlertType::RoundTripTransaction => "round_trip_transaction",
            AlertType::TransactionVelocity => "transaction_velocity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rapid_deposits" => Some(AlertType::RapidDeposits),
            "excessive_withdrawals" => Some(AlertType::ExcessiveWithdrawals),
            "round_trip_transaction" => Some(AlertType::RoundTripTransaction),
            "transaction_velocity" => Some(AlertType::TransactionVelocity),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertType::RapidDeposits => Severity::High,
            AlertType::ExcessiveWithdrawals => Severity::Medium,
            AlertType::RoundTripTransaction => Severity::Critical,
            AlertType::TransactionVelocity => Severity::High,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Investigating,
    Resolved,
    FalsePositive,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Investigating => "investigating",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalsePositive => "false_positive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(AlertStatus::Pending),
            "investigating" => Some(AlertStatus::Investigating),
            "resolved" => Some(AlertStatus::Resolved),
            "false_positive" => Some(AlertStatus::FalsePositive),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::FalsePositive)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// === Alert ===

/// What triggered an alert, one shape per rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AlertDetails {
    RapidDeposits {
        count: usize,
        total_amount: Decimal,
        time_window: String,
    },
    ExcessiveWithdrawals {
        count: usize,
        total_amount: Decimal,
        time_window: String,
    },
    RoundTrip {
        deposit_amount: Decimal,
        withdraw_amount: Decimal,
        time_diff_minutes: i64,
    },
    Velocity {
        count: usize,
        time_window: String,
    },
}

impl AlertDetails {
    pub fn alert_type(&self) -> AlertType {
        match self {
            AlertDetails::RapidDeposits { .. } => AlertType::RapidDeposits,
            AlertDetails::ExcessiveWithdrawals { .. } => AlertType::ExcessiveWithdrawals,
            AlertDetails::RoundTrip { .. } => AlertType::RoundTripTransaction,
            AlertDetails::Velocity { .. } => AlertType::TransactionVelocity,
        }
    }

    /// Short human-readable summary
    pub fn summary(&self) -> String {
        match self {
            AlertDetails::RapidDeposits {
                count,
                total_amount,
                time_window,
            } => format!("{} deposits totalling {} in {}", count, total_amount, time_window),
            AlertDetails::ExcessiveWithdrawals {
                count,
                total_amount,
                time_window,
            } => format!("{} withdrawals totalling {} in {}", count, total_amount, time_window),
            AlertDetails::RoundTrip {
                deposit_amount,
                withdraw_amount,
                time_diff_minutes,
            } => format!(
                "deposit {} then withdrawal {} within {} min",
                deposit_amount, withdraw_amount, time_diff_minutes
            ),
            AlertDetails::Velocity { count, time_window } => {
                format!("{} transactions in {}", count, time_window)
            }
        }
    }
}

/// A recorded fraud alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    pub id: String,
    pub user_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub details: AlertDetails,
    pub triggered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FraudAlert {
    pub fn from_pattern(id: String, user_id: &str, pattern: DetectedPattern, at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            alert_type: pattern.alert_type,
            severity: pattern.severity,
            status: AlertStatus::Pending,
            details: pattern.details,
            triggered_at: at,
            reviewed_by: None,
            reviewed_at: None,
            notes: None,
        }
    }

    /// Apply an admin review. Any status is accepted, so a closed alert can
    /// be reopened by moving it back to `pending`.
    pub fn review(
        &mut self,
        status: AlertStatus,
        notes: Option<String>,
        reviewer_id: &str,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        if notes.is_some() {
            self.notes = notes;
        }
        self.reviewed_by = Some(reviewer_id.to_string());
        self.reviewed_at = Some(at);
    }
}

// === Thresholds ===

fn default_rapid_deposit_count() -> usize {
    5
}

fn default_rapid_deposit_window_minutes() -> i64 {
    60
}

fn default_excessive_withdrawal_count() -> usize {
    10
}

fn default_excessive_withdrawal_window_hours() -> i64 {
    24
}

fn default_round_trip_max_minutes() -> i64 {
    30
}

fn default_velocity_max_transactions() -> usize {
    5
}

fn default_velocity_window_secs() -> i64 {
    60
}

/// Tunable rule thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudThresholds {
    /// Alert at this many deposits or more
    #[serde(default = "default_rapid_deposit_count")]
    pub rapid_deposit_count: usize,
    #[serde(default = "default_rapid_deposit_window_minutes")]
    pub rapid_deposit_window_minutes: i64,
    /// Alert at this many withdrawals or more
    #[serde(default = "default_excessive_withdrawal_count")]
    pub excessive_withdrawal_count: usize,
    #[serde(default = "default_excessive_withdrawal_window_hours")]
    pub excessive_withdrawal_window_hours: i64,
    /// Alert when deposit and withdrawal are strictly closer than this
    #[serde(default = "default_round_trip_max_minutes")]
    pub round_trip_max_minutes: i64,
    /// Alert when strictly more entries than this fall in the window
    #[serde(default = "default_velocity_max_transactions")]
    pub velocity_max_transactions: usize,
    #[serde(default = "default_velocity_window_secs")]
    pub velocity_window_secs: i64,
}

impl Default for FraudThresholds {
    fn default() -> Self {
        Self {
            rapid_deposit_count: default_rapid_deposit_count(),
            rapid_deposit_window_minutes: default_rapid_deposit_window_minutes(),
            excessive_withdrawal_count: default_excessive_withdrawal_count(),
            excessive_withdrawal_window_hours: default_excessive_withdrawal_window_hours(),
            round_trip_max_minutes: default_round_trip_max_minutes(),
            velocity_max_transactions: default_velocity_max_transactions(),
            velocity_window_secs: default_velocity_window_secs(),
        }
    }
}

impl FraudThresholds {
    pub fn deposit_window(&self) -> Duration {
        Duration::minutes(self.rapid_deposit_window_minutes)
    }

    pub fn withdrawal_window(&self) -> Duration {
        Duration::hours(self.excessive_withdrawal_window_hours)
    }

    pub fn velocity_window(&self) -> Duration {
        Duration::seconds(self.velocity_window_secs)
    }

    /// Widest window any rule looks at
    pub fn lookback(&self) -> Duration {
        self.deposit_window()
            .max(self.withdrawal_window())
            .max(self.velocity_window())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.rapid_deposit_count == 0
            || self.excessive_withdrawal_count == 0
            || self.velocity_max_transactions == 0
        {
            return Err(CoreError::ValidationError(
                "fraud count thresholds must be at least 1".to_string(),
            ));
        }
        if self.rapid_deposit_window_minutes <= 0
            || self.excessive_withdrawal_window_hours <= 0
            || self.round_trip_max_minutes <= 0
            || self.velocity_window_secs <= 0
        {
            return Err(CoreError::ValidationError(
                "fraud windows must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// === Evaluation ===

/// A rule hit, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPattern {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub details: AlertDetails,
}

impl DetectedPattern {
    fn new(details: AlertDetails) -> Self {
        let alert_type = details.alert_type();
        Self {
            alert_type,
            severity: alert_type.severity(),
            details,
        }
    }
}

/// Human label for a window, e.g. "1 hour", "24 hours", "1 minute".
pub fn window_label(window: Duration) -> String {
    let secs = window.num_seconds();
    let (value, unit) = if secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

fn within(entry: &LedgerEntry, now: DateTime<Utc>, window: Duration) -> bool {
    entry.created_at >= now - window
}

fn latest<'a>(entries: &[&'a LedgerEntry]) -> Option<&'a LedgerEntry> {
    entries.iter().copied().max_by_key(|e| e.created_at)
}

/// Run every post-event rule over `entries` (one user's recent ledger).
///
/// Entries outside each rule's window are ignored, so callers may pass the
/// whole `lookback()` window.
pub fn evaluate(
    entries: &[LedgerEntry],
    now: DateTime<Utc>,
    thresholds: &FraudThresholds,
) -> Vec<DetectedPattern> {
    let mut hits = Vec::new();

    let deposits: Vec<&LedgerEntry> = entries
        .iter()
        .filter(|e| e.tx_type == TransactionType::Deposit && within(e, now, thresholds.deposit_window()))
        .collect();
    let withdrawals: Vec<&LedgerEntry> = entries
        .iter()
        .filter(|e| {
            e.tx_type == TransactionType::Withdraw && within(e, now, thresholds.withdrawal_window())
        })
        .collect();

    // Rule 1
    if deposits.len() >= thresholds.rapid_deposit_count {
        hits.push(DetectedPattern::new(AlertDetails::RapidDeposits {
            count: deposits.len(),
            total_amount: deposits.iter().map(|e| e.amount).sum(),
            time_window: window_label(thresholds.deposit_window()),
        }));
    }

    // Rule 2
    if withdrawals.len() >= thresholds.excessive_withdrawal_count {
        hits.push(DetectedPattern::new(AlertDetails::ExcessiveWithdrawals {
            count: withdrawals.len(),
            total_amount: withdrawals.iter().map(|e| e.magnitude()).sum(),
            time_window: window_label(thresholds.withdrawal_window()),
        }));
    }

    // Rule 3
    if let (Some(deposit), Some(withdrawal)) = (latest(&deposits), latest(&withdrawals)) {
        if let Some(pattern) = round_trip(deposit, withdrawal, thresholds) {
            hits.push(pattern);
        }
    }

    // Rule 4
    let recent = entries
        .iter()
        .filter(|e| within(e, now, thresholds.velocity_window()))
        .count();
    if recent > thresholds.velocity_max_transactions {
        hits.push(velocity_pattern(recent, thresholds));
    }

    hits
}

/// Round-trip check on one deposit / withdrawal pair.
pub fn round_trip(
    deposit: &LedgerEntry,
    withdrawal: &LedgerEntry,
    thresholds: &FraudThresholds,
) -> Option<DetectedPattern> {
    let diff_secs = (withdrawal.created_at - deposit.created_at).num_seconds().abs();
    if diff_secs >= thresholds.round_trip_max_minutes * 60 {
        return None;
    }
    // nearest minute, halves up
    let minutes = (diff_secs + 30) / 60;
    Some(DetectedPattern::new(AlertDetails::RoundTrip {
        deposit_amount: deposit.amount,
        withdraw_amount: withdrawal.magnitude(),
        time_diff_minutes: minutes,
    }))
}

/// Velocity pre-check for a request about to add one more ledger entry.
///
/// `existing` is the number of entries already in the trailing window.
/// The pending request is counted, so with the default limit of 5 the sixth
/// request inside the window trips.
pub fn check_velocity(existing: usize, thresholds: &FraudThresholds) -> Option<DetectedPattern> {
    let projected = existing + 1;
    if projected > thresholds.velocity_max_transactions {
        Some(velocity_pattern(projected, thresholds))
    } else {
        None
    }
}

fn velocity_pattern(count: usize, thresholds: &FraudThresholds) -> DetectedPattern {
    DetectedPattern::new(AlertDetails::Velocity {
        count,
        time_window: window_label(thresholds.velocity_window()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Builder {
        balance: Decimal,
        entries: Vec<LedgerEntry>,
    }

    impl Builder {
        fn new() -> Self {
            Self {
                balance: Decimal::ZERO,
                entries: Vec::new(),
            }
        }

        fn push(mut self, tx_type: TransactionType, amount: Decimal, at: DateTime<Utc>) -> Self {
            let id = format!("t{}", self.entries.len());
            let entry = LedgerEntry::new(
                id,
                "u-1",
                tx_type,
                amount,
                self.balance,
                self.balance + amount,
                at,
            )
            .unwrap();
            self.balance = entry.balance_after;
            self.entries.push(entry);
            self
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_rapid_deposits_threshold() {
        let t = FraudThresholds::default();
        let mut b = Builder::new();
        for i in 0..4 {
            b = b.push(TransactionType::Deposit, dec!(100), now() - Duration::minutes(50 - i));
        }
        assert!(evaluate(&b.entries, now(), &t).is_empty());

        b = b.push(TransactionType::Deposit, dec!(100), now());
        let hits = evaluate(&b.entries, now(), &t);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::High);
        assert_eq!(
            hits[0].details,
            AlertDetails::RapidDeposits {
                count: 5,
                total_amount: dec!(500),
                time_window: "1 hour".to_string(),
            }
        );
    }

    #[test]
    fn test_old_deposits_ignored() {
        let t = FraudThresholds::default();
        let mut b = Builder::new();
        for i in 0..5 {
            b = b.push(TransactionType::Deposit, dec!(10), now() - Duration::hours(2) + Duration::minutes(i));
        }
        assert!(evaluate(&b.entries, now(), &t).is_empty());
    }

    #[test]
    fn test_excessive_withdrawals() {
        let t = FraudThresholds::default();
        let mut b = Builder::new().push(TransactionType::Deposit, dec!(1000), now() - Duration::hours(23));
        for i in 0..10 {
            b = b.push(TransactionType::Withdraw, dec!(-10), now() - Duration::hours(20) + Duration::hours(i));
        }
        let hits = evaluate(&b.entries, now(), &t);
        let hit = hits
            .iter()
            .find(|h| h.alert_type == AlertType::ExcessiveWithdrawals)
            .unwrap();
        assert_eq!(hit.severity, Severity::Medium);
        assert_eq!(
            hit.details,
            AlertDetails::ExcessiveWithdrawals {
                count: 10,
                total_amount: dec!(100),
                time_window: "24 hours".to_string(),
            }
        );
    }

    #[test]
    fn test_round_trip() {
        let t = FraudThresholds::default();
        let b = Builder::new()
            .push(TransactionType::Deposit, dec!(500), now() - Duration::minutes(10))
            .push(TransactionType::Withdraw, dec!(-500), now());
        let hits = evaluate(&b.entries, now(), &t);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::Critical);
        assert_eq!(
            hits[0].details,
            AlertDetails::RoundTrip {
                deposit_amount: dec!(500),
                withdraw_amount: dec!(500),
                time_diff_minutes: 10,
            }
        );
    }

    #[test]
    fn test_round_trip_uses_latest_pair() {
        let t = FraudThresholds::default();
        // an early deposit close to the withdrawal would match, but the latest
        // deposit is far away from it
        let b = Builder::new()
            .push(TransactionType::Deposit, dec!(100), now() - Duration::minutes(55))
            .push(TransactionType::Withdraw, dec!(-50), now() - Duration::minutes(50))
            .push(TransactionType::Deposit, dec!(100), now());
        let hits = evaluate(&b.entries, now(), &t);
        assert!(hits.iter().all(|h| h.alert_type != AlertType::RoundTripTransaction));
    }

    #[test]
    fn test_round_trip_boundary() {
        let t = FraudThresholds::default();
        let b = Builder::new()
            .push(TransactionType::Deposit, dec!(100), now() - Duration::minutes(30))
            .push(TransactionType::Withdraw, dec!(-100), now());
        assert!(evaluate(&b.entries, now(), &t).is_empty());
    }

    #[test]
    fn test_rules_are_independent() {
        let t = FraudThresholds::default();
        let mut b = Builder::new();
        for i in 0..5 {
            b = b.push(TransactionType::Deposit, dec!(100), now() - Duration::minutes(20 - i));
        }
        b = b.push(TransactionType::Withdraw, dec!(-100), now());
        let types: Vec<AlertType> = evaluate(&b.entries, now(), &t)
            .into_iter()
            .map(|h| h.alert_type)
            .collect();
        assert_eq!(
            types,
            vec![AlertType::RapidDeposits, AlertType::RoundTripTransaction]
        );
    }

    #[test]
    fn test_velocity_post_check() {
        let t = FraudThresholds::default();
        let mut b = Builder::new();
        for i in 0..6 {
            b = b.push(TransactionType::Bonus, dec!(1), now() - Duration::seconds(50 - i));
        }
        let hits = evaluate(&b.entries, now(), &t);
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].details,
            AlertDetails::Velocity {
                count: 6,
                time_window: "1 minute".to_string(),
            }
        );
    }

    #[test]
    fn test_velocity_pre_check() {
        let t = FraudThresholds::default();
        assert!(check_velocity(4, &t).is_none());
        let hit = check_velocity(5, &t).unwrap();
        assert_eq!(hit.alert_type, AlertType::TransactionVelocity);
        assert_eq!(hit.severity, Severity::High);
    }

    #[test]
    fn test_window_label() {
        assert_eq!(window_label(Duration::minutes(60)), "1 hour");
        assert_eq!(window_label(Duration::hours(24)), "24 hours");
        assert_eq!(window_label(Duration::seconds(60)), "1 minute");
        assert_eq!(window_label(Duration::seconds(90)), "90 seconds");
    }

    #[test]
    fn test_alert_review() {
        let pattern = check_velocity(5, &FraudThresholds::default()).unwrap();
        let mut alert = FraudAlert::from_pattern("a-1".to_string(), "u-1", pattern, now());
        assert_eq!(alert.status, AlertStatus::Pending);

        alert.review(AlertStatus::Investigating, Some("checking".to_string()), "admin", now());
        alert.review(AlertStatus::FalsePositive, None, "admin", now());
        assert!(alert.status.is_closed());
        assert_eq!(alert.notes.as_deref(), Some("checking"));

        // reopen
        alert.review(AlertStatus::Pending, Some("new evidence".to_string()), "admin-2", now());
        assert_eq!(alert.status, AlertStatus::Pending);
        assert!(!alert.status.is_closed());
        assert_eq!(alert.notes.as_deref(), Some("new evidence"));
        assert_eq!(alert.reviewed_by.as_deref(), Some("admin-2"));
    }

    #[test]
    fn test_thresholds_defaults() {
        let t: FraudThresholds = serde_json::from_str("{}").unwrap();
        assert_eq!(t, FraudThresholds::default());
        assert!(t.validate().is_ok());
        assert_eq!(t.lookback(), Duration::hours(24));
    }

    #[test]
    fn test_details_json_tag() {
        let d = AlertDetails::Velocity {
            count: 6,
            time_window: "1 minute".to_string(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["rule"], "velocity");
        assert_eq!(json["count"], 6);
    }
}
