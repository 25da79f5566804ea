//! Platform reports - analytics overview, top players, time series and
//! per-user statements

use chrono::{DateTime, Utc};
use pandaloto_core::{format_brl, LedgerEntry, TransactionType};
use pandaloto_persistence::{AnalyticsOverview, TimePeriod, TimeSeriesPoint, TopUser};
use rust_decimal::Decimal;

use crate::exporters::ReportData;

fn pair(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn to_headers(headers: &[&str]) -> Vec<String> {
    headers.iter().map(|h| h.to_string()).collect()
}

// ============================================================================
// Overview
// ============================================================================

/// Dashboard counters as a two-column metric table
#[derive(Debug, Clone)]
pub struct OverviewReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub overview: AnalyticsOverview,
}

impl OverviewReport {
    pub fn new(title: &str, overview: AnalyticsOverview, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            generated_at,
            overview,
        }
    }
}

impl ReportData for OverviewReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        to_headers(&["Section", "Metric", "Value"])
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let o = &self.overview;
        let metrics: Vec<(&str, &str, String)> = vec![
            ("users", "total", o.users.total_users.to_string()),
            ("users", "active", o.users.active_users.to_string()),
            ("users", "kyc_approved", o.users.kyc_approved_users.to_string()),
            ("users", "admins", o.users.admin_users.to_string()),
            ("transactions", "total", o.transactions.total_transactions.to_string()),
            ("transactions", "deposits", o.transactions.total_deposits.to_string()),
            ("transactions", "withdrawals", o.transactions.total_withdrawals.to_string()),
            ("transactions", "deposit_volume", o.transactions.deposit_volume.to_string()),
            ("transactions", "withdrawal_volume", o.transactions.withdrawal_volume.to_string()),
            ("bets", "total", o.bets.total_bets.to_string()),
            ("bets", "won", o.bets.winning_bets.to_string()),
            ("bets", "lost", o.bets.losing_bets.to_string()),
            ("bets", "open", o.bets.open_bets.to_string()),
            ("bets", "wagered", o.bets.total_wagered.to_string()),
            ("bets", "payouts", o.bets.total_payouts.to_string()),
            ("bonuses", "total", o.bonuses.total_bonuses.to_string()),
            ("bonuses", "active", o.bonuses.active_bonuses.to_string()),
            ("bonuses", "promotions", o.bonuses.promotion_templates.to_string()),
            ("bonuses", "value_issued", o.bonuses.bonus_value_issued.to_string()),
            ("fraud_alerts", "total", o.fraud_alerts.total_alerts.to_string()),
            ("fraud_alerts", "pending", o.fraud_alerts.pending_alerts.to_string()),
            ("fraud_alerts", "investigating", o.fraud_alerts.investigating_alerts.to_string()),
            ("fraud_alerts", "resolved", o.fraud_alerts.resolved_alerts.to_string()),
            ("fraud_alerts", "false_positive", o.fraud_alerts.false_positive_alerts.to_string()),
            ("revenue", "ggr", o.revenue.ggr.to_string()),
        ];
        metrics
            .into_iter()
            .map(|(section, metric, value)| vec![section.to_string(), metric.to_string(), value])
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            pair("GGR", format_brl(self.overview.revenue.ggr)),
            pair("Total Wagered", format_brl(self.overview.revenue.total_wagered)),
            pair("Pending Alerts", self.overview.fraud_alerts.pending_alerts),
            pair("Generated At", self.generated_at.to_rfc3339()),
        ]
    }
}

// ============================================================================
// Top users
// ============================================================================

#[derive(Debug, Clone)]
pub struct TopUsersReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub users: Vec<TopUser>,
}

impl TopUsersReport {
    pub fn new(title: &str, users: Vec<TopUser>, generated_at: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            generated_at,
            users,
        }
    }
}

impl ReportData for TopUsersReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        to_headers(&["Rank", "User ID", "Username", "Email", "Wagered", "Deposited", "Bets"])
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.users
            .iter()
            .enumerate()
            .map(|(i, u)| {
                vec![
                    (i + 1).to_string(),
                    u.id.clone(),
                    u.username.clone(),
                    u.email.clone(),
                    u.total_wagered.to_string(),
                    u.total_deposited.to_string(),
                    u.bet_count.to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let wagered: Decimal = self.users.iter().map(|u| u.total_wagered).sum();
        vec![
            pair("Users", self.users.len()),
            pair("Combined Wagered", format_brl(wagered)),
            pair("Generated At", self.generated_at.to_rfc3339()),
        ]
    }
}

// ============================================================================
// Time series
// ============================================================================

#[derive(Debug, Clone)]
pub struct TimeSeriesReport {
    pub title: String,
    pub period: TimePeriod,
    pub generated_at: DateTime<Utc>,
    pub points: Vec<TimeSeriesPoint>,
}

impl TimeSeriesReport {
    pub fn new(
        title: &str,
        period: TimePeriod,
        points: Vec<TimeSeriesPoint>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.to_string(),
            period,
            generated_at,
            points,
        }
    }
}

impl ReportData for TimeSeriesReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        to_headers(&["Period", "Transactions", "Deposits", "Withdrawals"])
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.points
            .iter()
            .map(|p| {
                vec![
                    p.period.clone(),
                    p.count.to_string(),
                    p.deposits.to_string(),
                    p.withdrawals.to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let deposits: Decimal = self.points.iter().map(|p| p.deposits).sum();
        let withdrawals: Decimal = self.points.iter().map(|p| p.withdrawals).sum();
        vec![
            pair("Window", self.period),
            pair("Buckets", self.points.len()),
            pair("Deposits", format_brl(deposits)),
            pair("Withdrawals", format_brl(withdrawals)),
            pair("Generated At", self.generated_at.to_rfc3339()),
        ]
    }
}

// ============================================================================
// Statement
// ============================================================================

/// Ledger statement of one player
#[derive(Debug, Clone)]
pub struct StatementReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<LedgerEntry>,
}

impl StatementReport {
    /// `entries` in any order; the statement lists them oldest first
    pub fn new(title: &str, mut entries: Vec<LedgerEntry>, generated_at: DateTime<Utc>) -> Self {
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Self {
            title: title.to_string(),
            generated_at,
            entries,
        }
    }

    fn total_of(&self, tx_type: TransactionType) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.tx_type == tx_type)
            .map(|e| e.magnitude())
            .sum()
    }

    pub fn closing_balance(&self) -> Option<Decimal> {
        self.entries.last().map(|e| e.balance_after)
    }
}

impl ReportData for StatementReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        to_headers(&["ID", "Date", "Type", "Status", "Amount", "Balance", "Description"])
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|e| {
                vec![
                    e.id.clone(),
                    e.created_at.to_rfc3339(),
                    e.tx_type.to_string(),
                    e.status.to_string(),
                    e.amount.to_string(),
                    e.balance_after.to_string(),
                    e.description.clone(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        vec![
            pair("Entries", self.entries.len()),
            pair("Deposits", format_brl(self.total_of(TransactionType::Deposit))),
            pair("Withdrawals", format_brl(self.total_of(TransactionType::Withdraw))),
            pair("Stakes", format_brl(self.total_of(TransactionType::BetStake))),
            pair("Bonuses", format_brl(self.total_of(TransactionType::Bonus))),
            pair(
                "Closing Balance",
                format_brl(self.closing_balance().unwrap_or(Decimal::ZERO)),
            ),
            pair("Generated At", self.generated_at.to_rfc3339()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporters::{CsvExporter, JsonExporter, MarkdownExporter, ReportExporter};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_overview_report() {
        let mut overview = AnalyticsOverview::default();
        overview.users.total_users = 12;
        overview.revenue.ggr = dec!(1234.5);
        overview.fraud_alerts.pending_alerts = 3;

        let report = OverviewReport::new("Visão geral", overview, now());
        let csv = CsvExporter::new().export(&report);
        assert!(csv.contains("users,total,12\n"));
        assert!(csv.contains("revenue,ggr,1234.5\n"));

        let md = MarkdownExporter::new().export(&report);
        assert!(md.contains("- **GGR**: R$ 1.234,50"));
        assert!(md.contains("- **Pending Alerts**: 3"));
    }

    #[test]
    fn test_top_users_report() {
        let users = vec![
            TopUser {
                id: "u-1".into(),
                username: "maria".into(),
                email: "maria@example.com".into(),
                total_wagered: dec!(900.00),
                total_deposited: dec!(1000.00),
                bet_count: 9,
            },
            TopUser {
                id: "u-2".into(),
                username: "joao".into(),
                email: "joao@example.com".into(),
                total_wagered: dec!(100.00),
                total_deposited: dec!(100.00),
                bet_count: 1,
            },
        ];
        let report = TopUsersReport::new("Top", users, now());

        let rows = report.rows();
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[1][2], "joao");
        assert!(report
            .summary()
            .contains(&("Combined Wagered".to_string(), "R$ 1.000,00".to_string())));
    }

    #[test]
    fn test_time_series_report() {
        let points = vec![TimeSeriesPoint {
            period: "2026-03-01".into(),
            period_start: now(),
            count: 4,
            deposits: dec!(300.00),
            withdrawals: dec!(50.00),
        }];
        let report = TimeSeriesReport::new("Série", TimePeriod::Week, points, now());

        let json: serde_json::Value =
            serde_json::from_str(&JsonExporter::new().export(&report)).unwrap();
        assert_eq!(json["data"][0]["Period"], "2026-03-01");
        assert_eq!(json["data"][0]["Transactions"], "4");
        assert_eq!(json["summary"]["Window"], TimePeriod::Week.as_str());
    }

    #[test]
    fn test_statement_report() {
        let deposit = LedgerEntry::new(
            "t-1".into(),
            "u-1",
            TransactionType::Deposit,
            dec!(200),
            dec!(0),
            dec!(200),
            now() - Duration::minutes(5),
        )
        .unwrap()
        .with_description("Depósito via pix");
        let stake = LedgerEntry::new(
            "t-2".into(),
            "u-1",
            TransactionType::BetStake,
            dec!(-20),
            dec!(200),
            dec!(180),
            now(),
        )
        .unwrap()
        .with_description("Aposta em Loteria");

        let report = StatementReport::new("Extrato", vec![stake, deposit], now());
        assert_eq!(report.entries[0].id, "t-1");
        assert_eq!(report.closing_balance(), Some(dec!(180.00)));

        let summary = report.summary();
        assert!(summary.contains(&("Stakes".to_string(), "R$ 20,00".to_string())));
        assert!(summary.contains(&("Closing Balance".to_string(), "R$ 180,00".to_string())));

        let csv = CsvExporter::new().export(&report);
        assert!(csv.contains("t-2,"));
        assert!(csv.contains(",bet_stake,completed,-20.00,180.00,Aposta em Loteria"));
    }
}
