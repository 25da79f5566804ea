//! Fraud alert reports for compliance review
//!
//! [`FraudReport`] lists alerts with a weighted risk score.
//! [`UserRiskReport`] groups the same alerts per player.

use chrono::{DateTime, Utc};
use pandaloto_core::{AlertType, FraudAlert, Severity};
use std::collections::{BTreeMap, HashMap};

use crate::exporters::ReportData;

fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Low => 1.0,
        Severity::Medium => 2.0,
        Severity::High => 3.5,
        Severity::Critical => 5.0,
    }
}

const MAX_WEIGHT: f64 = 5.0;

/// Band for a 0-100 score
pub fn classify_score(score: f64) -> Severity {
    match score as u32 {
        0..=25 => Severity::Low,
        26..=50 => Severity::Medium,
        51..=75 => Severity::High,
        _ => Severity::Critical,
    }
}

// ============================================================================
// Fraud Report
// ============================================================================

/// Alert listing with counts and a risk score
#[derive(Debug, Clone)]
pub struct FraudReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub total_alerts: usize,
    pub open_alerts: usize,
    pub rapid_deposits_count: usize,
    pub excessive_withdrawals_count: usize,
    pub round_trip_count: usize,
    pub velocity_count: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    /// 0-100, weighted by severity over open alerts
    pub risk_score: f64,
    alerts: Vec<FraudAlert>,
}

impl FraudReport {
    pub fn generate(title: &str, alerts: &[FraudAlert], generated_at: DateTime<Utc>) -> Self {
        let mut report = Self {
            title: title.to_string(),
            generated_at,
            total_alerts: alerts.len(),
            open_alerts: 0,
            rapid_deposits_count: 0,
            excessive_withdrawals_count: 0,
            round_trip_count: 0,
            velocity_count: 0,
            by_severity: BTreeMap::new(),
            risk_score: 0.0,
            alerts: alerts.to_vec(),
        };

        for alert in alerts {
            if !alert.status.is_closed() {
                report.open_alerts += 1;
            }
            match alert.alert_type {
                AlertType::RapidDeposits => report.rapid_deposits_count += 1,
                AlertType::ExcessiveWithdrawals => report.excessive_withdrawals_count += 1,
                AlertType::RoundTripTransaction => report.round_trip_count += 1,
                AlertType::TransactionVelocity => report.velocity_count += 1,
            }
            *report.by_severity.entry(alert.severity).or_insert(0) += 1;
        }

        // highest severity first, newest first within a severity
        report.alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.triggered_at.cmp(&a.triggered_at))
        });

        report.risk_score = Self::score(alerts);
        report
    }

    fn score(alerts: &[FraudAlert]) -> f64 {
        if alerts.is_empty() {
            return 0.0;
        }
        let weighted: f64 = alerts
            .iter()
            .filter(|a| !a.status.is_closed())
            .map(|a| severity_weight(a.severity))
            .sum();
        (weighted / (alerts.len() as f64 * MAX_WEIGHT) * 100.0).min(100.0)
    }

    pub fn risk_classification(&self) -> Severity {
        classify_score(self.risk_score)
    }

    /// Alerts in report order
    pub fn alerts(&self) -> &[FraudAlert] {
        &self.alerts
    }

    /// Plain-text digest for terminals
    pub fn summary_text(&self) -> String {
        let mut text = format!("=== {} ===\n\n", self.title);
        text.push_str(&format!(
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        text.push_str(&format!(
            "Risk Score: {:.1}/100 ({})\n\n",
            self.risk_score,
            self.risk_classification()
        ));
        text.push_str(&format!("Alerts: {} ({} open)\n", self.total_alerts, self.open_alerts));
        text.push_str(&format!("  - Rapid deposits: {}\n", self.rapid_deposits_count));
        text.push_str(&format!("  - Excessive withdrawals: {}\n", self.excessive_withdrawals_count));
        text.push_str(&format!("  - Round trip: {}\n", self.round_trip_count));
        text.push_str(&format!("  - Velocity: {}\n", self.velocity_count));
        text
    }
}

impl ReportData for FraudReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        ["Alert ID", "Triggered At", "User", "Type", "Severity", "Status", "Details"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.alerts
            .iter()
            .map(|a| {
                vec![
                    a.id.clone(),
                    a.triggered_at.to_rfc3339(),
                    a.user_id.clone(),
                    a.alert_type.to_string(),
                    a.severity.to_string(),
                    a.status.to_string(),
                    a.details.summary(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let mut summary = vec![
            ("Total Alerts".to_string(), self.total_alerts.to_string()),
            ("Open Alerts".to_string(), self.open_alerts.to_string()),
            ("Rapid Deposits".to_string(), self.rapid_deposits_count.to_string()),
            ("Excessive Withdrawals".to_string(), self.excessive_withdrawals_count.to_string()),
            ("Round Trip".to_string(), self.round_trip_count.to_string()),
            ("Velocity".to_string(), self.velocity_count.to_string()),
        ];
        for (severity, count) in self.by_severity.iter().rev() {
            summary.push((format!("Severity {}", severity), count.to_string()));
        }
        summary.push(("Risk Score".to_string(), format!("{:.1}/100", self.risk_score)));
        summary.push(("Risk Level".to_string(), self.risk_classification().to_string()));
        summary.push(("Generated At".to_string(), self.generated_at.to_rfc3339()));
        summary
    }
}

// ============================================================================
// Per-user risk
// ============================================================================

/// Alert totals of one player
#[derive(Debug, Clone)]
pub struct UserRisk {
    pub user_id: String,
    pub alert_count: usize,
    pub open_count: usize,
    pub highest_severity: Severity,
    pub last_triggered_at: DateTime<Utc>,
}

/// Players ranked by their worst open alert
#[derive(Debug, Clone)]
pub struct UserRiskReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub users: Vec<UserRisk>,
}

impl UserRiskReport {
    pub fn generate(title: &str, alerts: &[FraudAlert], generated_at: DateTime<Utc>) -> Self {
        let mut by_user: HashMap<&str, UserRisk> = HashMap::new();
        for alert in alerts {
            let entry = by_user.entry(alert.user_id.as_str()).or_insert_with(|| UserRisk {
                user_id: alert.user_id.clone(),
                alert_count: 0,
                open_count: 0,
                highest_severity: alert.severity,
                last_triggered_at: alert.triggered_at,
            });
            entry.alert_count += 1;
            if !alert.status.is_closed() {
                entry.open_count += 1;
            }
            entry.highest_severity = entry.highest_severity.max(alert.severity);
            entry.last_triggered_at = entry.last_triggered_at.max(alert.triggered_at);
        }

        let mut users: Vec<UserRisk> = by_user.into_values().collect();
        users.sort_by(|a, b| {
            b.highest_severity
                .cmp(&a.highest_severity)
                .then_with(|| b.open_count.cmp(&a.open_count))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Self {
            title: title.to_string(),
            generated_at,
            users,
        }
    }
}

impl ReportData for UserRiskReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        ["User", "Alerts", "Open", "Highest Severity", "Last Alert"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.users
            .iter()
            .map(|u| {
                vec![
                    u.user_id.clone(),
                    u.alert_count.to_string(),
                    u.open_count.to_string(),
                    u.highest_severity.to_string(),
                    u.last_triggered_at.to_rfc3339(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let flagged_open = self.users.iter().filter(|u| u.open_count > 0).count();
        vec![
            ("Users Flagged".to_string(), self.users.len().to_string()),
            ("Users With Open Alerts".to_string(), flagged_open.to_string()),
            ("Generated At".to_string(), self.generated_at.to_rfc3339()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporters::{CsvExporter, MarkdownExporter, ReportExporter};
    use chrono::Duration;
    use pandaloto_core::{AlertDetails, AlertStatus, DetectedPattern};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn alert(id: &str, user: &str, details: AlertDetails, minutes_ago: i64) -> FraudAlert {
        let alert_type = details.alert_type();
        let pattern = DetectedPattern {
            alert_type,
            severity: alert_type.severity(),
            details,
        };
        FraudAlert::from_pattern(id.to_string(), user, pattern, now() - Duration::minutes(minutes_ago))
    }

    fn sample() -> Vec<FraudAlert> {
        let mut resolved = alert(
            "a-3",
            "u-2",
            AlertDetails::Velocity {
                count: 6,
                time_window: "1 minute".into(),
            },
            30,
        );
        resolved.status = AlertStatus::Resolved;

        vec![
            alert(
                "a-1",
                "u-1",
                AlertDetails::RapidDeposits {
                    count: 5,
                    total_amount: dec!(500),
                    time_window: "1 hour".into(),
                },
                20,
            ),
            alert(
                "a-2",
                "u-1",
                AlertDetails::RoundTrip {
                    deposit_amount: dec!(500),
                    withdraw_amount: dec!(500),
                    time_diff_minutes: 10,
                },
                5,
            ),
            resolved,
        ]
    }

    #[test]
    fn test_fraud_report_counts_and_order() {
        let report = FraudReport::generate("Alertas", &sample(), now());

        assert_eq!(report.total_alerts, 3);
        assert_eq!(report.open_alerts, 2);
        assert_eq!(report.rapid_deposits_count, 1);
        assert_eq!(report.round_trip_count, 1);
        assert_eq!(report.velocity_count, 1);
        assert_eq!(report.by_severity.get(&Severity::High), Some(&2));

        // critical round trip first
        assert_eq!(report.alerts()[0].id, "a-2");
        // newer high alert before the older one
        assert_eq!(report.alerts()[1].id, "a-1");
    }

    #[test]
    fn test_risk_score() {
        let report = FraudReport::generate("Alertas", &sample(), now());
        // (3.5 + 5.0) / (3 * 5.0) * 100
        assert!((report.risk_score - 56.666).abs() < 0.01);
        assert_eq!(report.risk_classification(), Severity::High);

        let empty = FraudReport::generate("Vazio", &[], now());
        assert_eq!(empty.risk_score, 0.0);
        assert_eq!(empty.risk_classification(), Severity::Low);
    }

    #[test]
    fn test_fraud_report_export() {
        let report = FraudReport::generate("Alertas", &sample(), now());
        let csv = CsvExporter::new().export(&report);
        assert!(csv.starts_with("Alert ID,Triggered At,User,Type,Severity,Status,Details\n"));
        assert!(csv.contains("round_trip_transaction,critical,pending"));

        let text = report.summary_text();
        assert!(text.contains("Alerts: 3 (2 open)"));
        assert!(text.contains("Risk Score: 56.7/100 (high)"));
    }

    #[test]
    fn test_user_risk_report() {
        let report = UserRiskReport::generate("Risco por usuário", &sample(), now());

        assert_eq!(report.users.len(), 2);
        let first = &report.users[0];
        assert_eq!(first.user_id, "u-1");
        assert_eq!(first.alert_count, 2);
        assert_eq!(first.open_count, 2);
        assert_eq!(first.highest_severity, Severity::Critical);
        assert_eq!(first.last_triggered_at, now() - Duration::minutes(5));

        assert_eq!(report.users[1].open_count, 0);

        let md = MarkdownExporter::new().export(&report);
        assert!(md.contains("- **Users With Open Alerts**: 1"));
    }
}
